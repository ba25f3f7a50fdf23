use std::time::Duration;

use harvester_engine::{FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

#[tokio::test]
async fn fetcher_returns_status_content_type_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/doc", server.uri());

    let response = fetcher.get(&url).await.expect("fetch ok");
    assert_eq!(response.status, 200);
    assert_eq!(response.final_url.as_str(), url);
    assert_eq!(response.redirect_count, 0);
    assert_eq!(response.content_type.as_deref(), Some("text/html; charset=utf-8"));

    let body = response.read_to_end(1024).await.expect("body");
    assert_eq!(body, b"<html>ok</html>");
}

#[tokio::test]
async fn fetcher_follows_redirect_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(redirect_to("/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(redirect_to("/final"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let response = fetcher
        .get(&format!("{}/a", server.uri()))
        .await
        .expect("fetch ok");

    assert_eq!(response.status, 200);
    assert_eq!(response.final_url.as_str(), format!("{}/final", server.uri()));
    assert_eq!(response.redirect_count, 2);
}

#[tokio::test]
async fn fetcher_reports_non_success_status_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let response = fetcher
        .get(&format!("{}/missing", server.uri()))
        .await
        .expect("transport succeeded");
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn fetcher_stops_at_redirect_limit() {
    let server = MockServer::start().await;
    for (from, to) in [("/r1", "/r2"), ("/r2", "/r3"), ("/r3", "/r4"), ("/r4", "/r5")] {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(redirect_to(to))
            .mount(&server)
            .await;
    }

    let settings = FetchSettings {
        redirect_limit: 2,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .get(&format!("{}/r1", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .get(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn scheme_less_text_is_an_invalid_url_by_default() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher.get("example.com/page").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn default_scheme_is_prefixed_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        default_scheme: Some("http".to_string()),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let without_scheme = format!("{}/page", server.uri().trim_start_matches("http://"));
    let response = fetcher.get(&without_scheme).await.expect("fetch ok");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn reading_body_fails_past_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let response = fetcher
        .get(&format!("{}/large", server.uri()))
        .await
        .expect("fetch ok");
    let err = response.read_to_end(16).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}
