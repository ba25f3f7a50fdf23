use harvester_core::{discover_urls, url_candidates};
use pretty_assertions::assert_eq;

#[test]
fn empty_text_yields_nothing() {
    assert!(discover_urls("").is_empty());
    assert!(discover_urls("no links in here, just words.").is_empty());
}

#[test]
fn urls_keep_first_seen_order_without_duplicates() {
    let text = "see https://b.example.com/x and https://a.example.com then https://b.example.com/x again";
    assert_eq!(
        discover_urls(text),
        vec![
            "https://b.example.com/x".to_string(),
            "https://a.example.com".to_string(),
        ]
    );
    assert_eq!(url_candidates(text).count(), 3);
}

#[test]
fn malformed_scheme_urls_are_still_discovered() {
    let text = "Test an invalidly formatted URL https://t in a mock tweet";
    assert_eq!(discover_urls(text), vec!["https://t".to_string()]);
}

#[test]
fn scheme_less_hosts_are_discovered() {
    let text = "read netspective.com/solutions today";
    assert_eq!(discover_urls(text), vec!["netspective.com/solutions".to_string()]);
}

#[test]
fn query_strings_survive_and_trailing_punctuation_does_not() {
    let text = "Go to https://www.example.com/?utm_source=x&id=4, then stop.";
    assert_eq!(
        discover_urls(text),
        vec!["https://www.example.com/?utm_source=x&id=4".to_string()]
    );
}

#[test]
fn email_addresses_are_not_urls() {
    assert!(discover_urls("mail someone@example.com or first.last@example.org").is_empty());
}

#[test]
fn dedupe_is_by_exact_literal_text() {
    let text = "http://bit.ly/abc HTTP://bit.ly/abc http://bit.ly/abc";
    assert_eq!(
        discover_urls(text),
        vec!["http://bit.ly/abc".to_string(), "HTTP://bit.ly/abc".to_string()]
    );
}
