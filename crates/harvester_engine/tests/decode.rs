use harvester_engine::{decode_html, parse_head, parse_media_type};
use pretty_assertions::assert_eq;

#[test]
fn declared_charset_is_used() {
    let bytes = b"<title>Caf\xe9</title>";
    let decoded = decode_html(bytes, Some("ISO-8859-1"));
    assert_eq!(decoded.html, "<title>Café</title>");
    assert_eq!(decoded.encoding_label, "windows-1252");
    assert!(!decoded.had_errors);
}

#[test]
fn bom_wins_over_declared_charset() {
    let bytes = b"\xef\xbb\xbf<p>hi</p>";
    let decoded = decode_html(bytes, Some("windows-1252"));
    assert_eq!(decoded.html, "<p>hi</p>");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn unknown_label_falls_back_to_detection() {
    let decoded = decode_html("<p>plain ascii</p>".as_bytes(), Some("x-made-up"));
    assert_eq!(decoded.html, "<p>plain ascii</p>");
}

#[test]
fn malformed_bytes_are_replaced_and_flagged() {
    let decoded = decode_html(b"<p>\xff\xfe broken</p>", Some("utf-8"));
    assert!(decoded.had_errors);
    assert_eq!(decoded.encoding_label, "UTF-8");
    assert_eq!(decoded.html, "<p>\u{fffd}\u{fffd} broken</p>");
}

#[test]
fn media_type_is_normalized() {
    let (essence, params) = parse_media_type("Text/HTML; Charset=ISO-8859-1").unwrap();
    assert_eq!(essence, "text/html");
    assert_eq!(params.get("charset").map(String::as_str), Some("ISO-8859-1"));
    assert!(parse_media_type("not a media type").is_err());
}

#[test]
fn first_refresh_directive_wins() {
    let head = parse_head(
        r#"<html><head>
        <meta http-equiv="refresh" content="5;url=https://first.example/">
        <meta http-equiv="refresh" content="0;url=https://second.example/">
        </head></html>"#,
    );
    assert_eq!(head.refresh_target.as_deref(), Some("https://first.example/"));
}

#[test]
fn refresh_without_url_is_not_a_redirect() {
    let head = parse_head(r#"<html><head><meta http-equiv="refresh" content="30"></head></html>"#);
    assert_eq!(head.refresh_target, None);
}

#[test]
fn meta_outside_head_is_not_recorded() {
    let head = parse_head(
        r#"<html><head><title>T</title></head><body><meta name="x" content="y"></body></html>"#,
    );
    assert_eq!(head.title.as_deref(), Some("T"));
    assert!(head.meta_tags.is_empty());
}
