use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Scheme-ful URLs are taken up to the next delimiter; scheme-less ones need
/// a dotted host ending in an alphabetic label.
static RELAXED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b[a-z][a-z0-9+.\-]*://[^\s<>"'`]+|\b(?:[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d{1,5})?(?:/[^\s<>"'`]*)?"#,
    )
    .expect("relaxed url pattern is valid")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?', '\'', '"'];

/// Finds URL-like substrings in free-form text.
///
/// The result keeps first-seen order and contains every literal match once.
/// Nothing is validated here; matches that will not parse as URLs are
/// returned as well.
pub fn discover_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    url_candidates(text)
        .filter(|candidate| seen.insert(*candidate))
        .map(str::to_owned)
        .collect()
}

/// Every URL-like match in `text`, duplicates included.
pub fn url_candidates(text: &str) -> impl Iterator<Item = &str> {
    RELAXED_URL.find_iter(text).filter_map(move |m| {
        if is_part_of_email(text, m.start(), m.end()) {
            return None;
        }
        let trimmed = trim_trailing(m.as_str());
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

fn is_part_of_email(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before == Some('@') || after == Some('@')
}

/// Drops sentence punctuation and closing brackets that have no opening
/// partner inside the match.
fn trim_trailing(candidate: &str) -> &str {
    let mut current = candidate;
    loop {
        let Some(last) = current.chars().next_back() else {
            return current;
        };
        let unbalanced = match last {
            ')' => current.matches('(').count() < current.matches(')').count(),
            ']' => current.matches('[').count() < current.matches(']').count(),
            '}' => current.matches('{').count() < current.matches('}').count(),
            c => TRAILING_PUNCTUATION.contains(&c),
        };
        if !unbalanced {
            return current;
        }
        current = &current[..current.len() - last.len_utf8()];
    }
}
