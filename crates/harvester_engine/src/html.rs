use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// `<optional digits> ; url=<target>`, as found in a refresh directive's
/// `content` attribute.
static META_REFRESH_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d*)\s*;\s*(?i:url)=(.*)$").expect("meta refresh pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMetadata {
    pub title: Option<String>,
    pub meta_tags: BTreeMap<String, String>,
    pub refresh_target: Option<String>,
}

/// Scans the document head for `<title>` and `<meta>` elements.
///
/// - every meta with a `property` or `name` attribute is recorded under that
///   attribute's value, taking its `content` attribute; later duplicates win
/// - the first `http-equiv="refresh"` meta whose content carries a URL
///   becomes the refresh target
pub fn parse_head(html: &str) -> HeadMetadata {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("head title").ok();
    let meta_sel = Selector::parse("head meta").ok();

    let title = title_sel
        .as_ref()
        .and_then(|sel| doc.select(sel).next())
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut metadata = HeadMetadata {
        title,
        ..Default::default()
    };
    let Some(meta_sel) = meta_sel else {
        return metadata;
    };

    for meta in doc.select(&meta_sel) {
        let element = meta.value();
        let content = element.attr("content");

        let is_refresh = element
            .attr("http-equiv")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"));
        if is_refresh && metadata.refresh_target.is_none() {
            metadata.refresh_target = content.and_then(parse_meta_refresh);
        }

        if let Some(value) = content {
            for key in [element.attr("property"), element.attr("name")]
                .into_iter()
                .flatten()
            {
                metadata.meta_tags.insert(key.to_string(), value.to_string());
            }
        }
    }
    metadata
}

/// Returns the URL text of a refresh directive such as `0;url=https://a.b/`,
/// verbatim after the `url=` token.
pub fn parse_meta_refresh(content: &str) -> Option<String> {
    META_REFRESH_CONTENT
        .captures(content.trim())
        .and_then(|caps| caps.get(2))
        .map(|target| target.as_str().to_string())
}
