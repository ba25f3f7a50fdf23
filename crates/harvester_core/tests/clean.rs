use harvester_core::{clean_url, HarvestRules, NeverClean, PatternCleanRule, Url};
use pretty_assertions::assert_eq;

fn url(text: &str) -> Url {
    Url::parse(text).unwrap()
}

#[test]
fn removing_every_param_drops_the_query() {
    let rules = HarvestRules::defaults();
    let resolved = url("https://www.netspective.com/?utm_source=test.go&utm_medium=go.TestSuite&utm_campaign=harvester");
    let cleaned = clean_url(&resolved, rules.clean.as_ref()).expect("utm params removed");

    assert_eq!(cleaned.url.as_str(), "https://www.netspective.com/");
    assert_eq!(cleaned.url.query(), None);
    let mut names: Vec<_> = cleaned.removed.iter().map(|p| p.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["utm_campaign", "utm_medium", "utm_source"]);
    assert!(cleaned
        .removed
        .iter()
        .all(|p| p.reason == "Matched cleaner rule `^utm_`"));
}

#[test]
fn other_params_are_kept() {
    let rules = HarvestRules::defaults();
    let resolved = url("https://example.com/article?id=42&utm_source=feed&page=2");
    let cleaned = clean_url(&resolved, rules.clean.as_ref()).unwrap();
    assert_eq!(cleaned.url.as_str(), "https://example.com/article?id=42&page=2");
    // The input is left untouched.
    assert_eq!(resolved.as_str(), "https://example.com/article?id=42&utm_source=feed&page=2");
}

#[test]
fn nothing_to_remove_is_a_no_op() {
    let rules = HarvestRules::defaults();
    assert!(clean_url(&url("https://example.com/a?id=1"), rules.clean.as_ref()).is_none());
    assert!(clean_url(&url("https://example.com/a"), rules.clean.as_ref()).is_none());
}

#[test]
fn closed_gate_skips_cleaning() {
    assert!(clean_url(&url("https://example.com/?utm_source=x"), &NeverClean).is_none());
}

#[test]
fn cleaning_is_idempotent() {
    let rule = PatternCleanRule::new(&["^utm_", "^fbclid$"]).unwrap();
    let first = clean_url(&url("https://example.com/p?fbclid=abc&q=rust&utm_medium=x"), &rule)
        .expect("first pass removes params");
    assert_eq!(first.removed.len(), 2);
    assert!(clean_url(&first.url, &rule).is_none());
}

#[test]
fn repeated_param_names_are_reported_once() {
    let rules = HarvestRules::defaults();
    let cleaned = clean_url(
        &url("https://example.com/?utm_source=a&utm_source=b&x=1"),
        rules.clean.as_ref(),
    )
    .unwrap();
    assert_eq!(cleaned.removed.len(), 1);
    assert_eq!(cleaned.url.as_str(), "https://example.com/?x=1");
}
