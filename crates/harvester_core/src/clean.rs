use url::Url;

use crate::rules::CleanRule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedParam {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedUrl {
    pub url: Url,
    pub removed: Vec<RemovedParam>,
}

/// Strips the query parameters `rule` selects from a copy of `url`.
///
/// Returns `None` when the rule's gate is closed or when no parameter was
/// removed; the input URL is never modified. When every parameter is removed
/// the query (and its `?`) disappears entirely.
pub fn clean_url(url: &Url, rule: &dyn CleanRule) -> Option<CleanedUrl> {
    if !rule.should_attempt_clean(url) {
        return None;
    }

    let mut kept = Vec::new();
    let mut removed: Vec<RemovedParam> = Vec::new();
    for (name, value) in url.query_pairs() {
        // Repeated parameter names share one decision.
        if removed.iter().any(|p| p.name == name) {
            continue;
        }
        match rule.should_remove_param(&name) {
            Some(reason) => removed.push(RemovedParam {
                name: name.into_owned(),
                reason,
            }),
            None => kept.push((name.into_owned(), value.into_owned())),
        }
    }

    if removed.is_empty() {
        return None;
    }

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(CleanedUrl {
        url: cleaned,
        removed,
    })
}
