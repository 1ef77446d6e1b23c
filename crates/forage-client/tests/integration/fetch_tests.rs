//! End-to-end fetch tests against a wiremock HTTP server.
//!
//! Mock expectations double as attempt-count assertions: wiremock verifies
//! the number of received requests when the server is dropped.

use std::time::Duration;

use forage_client::{HttpFetcher, fetch_with_client};
use forage_core::RecordSchema;
use forage_core::fetch::{FailureKind, FetchOutcome, FetchRequest};
use forage_core::validate::{RawRecord, ValidationPipeline};
use wiremock::matchers::{header_exists, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .try_init();
}

#[tokio::test]
async fn success_on_first_attempt() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let outcome = fetcher
        .fetch(&FetchRequest::new(format!("{}/ok", server.uri())))
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            content: "<html>hello</html>".into(),
            status: 200,
        }
    );
}

#[tokio::test]
async fn client_error_makes_exactly_one_request() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let request = FetchRequest::new(format!("{}/missing", server.uri()))
        .max_attempts(3)
        .backoff_factor(0.0);
    let outcome = fetcher.fetch(&request).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            kind: FailureKind::ClientError(404),
            attempts: 1,
        }
    );
}

#[tokio::test]
async fn server_error_retried_to_budget() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let request = FetchRequest::new(format!("{}/flaky", server.uri()))
        .max_attempts(3)
        .backoff_factor(0.0);
    let outcome = fetcher.fetch(&request).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            kind: FailureKind::ServerError(503),
            attempts: 3,
        }
    );
}

#[tokio::test]
async fn recovers_after_transient_server_errors() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(200).set_body_string("back up"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let request = FetchRequest::new(format!("{}/recovering", server.uri()))
        .max_attempts(3)
        .backoff_factor(0.0);
    let outcome = fetcher.fetch(&request).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            content: "back up".into(),
            status: 200,
        }
    );
}

#[tokio::test]
async fn timeout_retried_then_surfaced() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let request = FetchRequest::new(format!("{}/slow", server.uri()))
        .max_attempts(2)
        .timeout(Duration::from_millis(100))
        .backoff_factor(0.0);
    let outcome = fetcher.fetch(&request).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            kind: FailureKind::Timeout,
            attempts: 2,
        }
    );
}

#[tokio::test]
async fn redirects_are_followed() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let outcome = fetcher
        .fetch(&FetchRequest::new(format!("{}/old", server.uri())))
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            content: "moved here".into(),
            status: 200,
        }
    );
}

#[tokio::test]
async fn fetch_text_collapses_failure_to_none() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    assert_eq!(fetcher.fetch_text(&format!("{}/gone", server.uri())).await, None);
}

#[tokio::test]
async fn connection_failure_yields_failure_not_panic() {
    init_tracing();
    // Nothing listens on this port; reserved then released by the mock server.
    // A bare (non-pooled) server is required: pooled servers keep listening
    // after drop and would answer with a 404 instead of refusing to connect.
    let server = MockServer::builder().start().await;
    let url = format!("{}/unreachable", server.uri());
    drop(server);

    let fetcher = HttpFetcher::new().unwrap();
    let request = FetchRequest::new(url).max_attempts(2).backoff_factor(0.0);
    let outcome = fetcher.fetch(&request).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            kind: FailureKind::ConnectionFailed,
            attempts: 2,
        }
    );
}

#[tokio::test]
async fn session_fetch_reuses_client_and_succeeds() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page a"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page b"))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(5);
    let a = fetch_with_client(&client, &format!("{}/a", server.uri()), 3, timeout).await;
    let b = fetch_with_client(&client, &format!("{}/b", server.uri()), 3, timeout).await;

    assert_eq!(a.as_deref(), Some("page a"));
    assert_eq!(b.as_deref(), Some("page b"));
}

#[tokio::test]
async fn session_fetch_sends_descriptive_headers() {
    init_tracing();
    let server = MockServer::start().await;
    // Matches only when the descriptive set is present, so a bare client
    // without them would get wiremock's default 404 and fail the fetch.
    Mock::given(method("GET"))
        .and(path("/h"))
        .and(header_exists("user-agent"))
        .and(headers("accept-language", vec!["en-US", "en;q=0.5"]))
        .and(headers(
            "accept",
            vec![
                "text/html",
                "application/xhtml+xml",
                "application/xml;q=0.9",
                "*/*;q=0.8",
            ],
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetch_with_client(
        &reqwest::Client::new(),
        &format!("{}/h", server.uri()),
        1,
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(result.as_deref(), Some("ok"));
}

#[tokio::test]
async fn session_fetch_retries_even_client_errors() {
    init_tracing();
    let server = MockServer::start().await;
    // The session path does not classify statuses, so a 404 burns the whole
    // attempt budget instead of aborting after one request.
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let result = fetch_with_client(
        &client,
        &format!("{}/missing", server.uri()),
        2,
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(result, None);
}

#[tokio::test]
async fn fetched_records_flow_into_the_pipeline() {
    init_tracing();
    let server = MockServer::start().await;
    let body = serde_json::json!([
        {"url": "https://shop.test/1", "name": "Widget", "price": 9.99, "currency": "usd"},
        {"url": "https://shop.test/2", "name": "Gadget", "price": -1},
    ])
    .to_string();
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new().unwrap();
    let content = fetcher
        .fetch_text(&format!("{}/products", server.uri()))
        .await
        .expect("fetch should succeed");

    let records: Vec<RawRecord> = serde_json::from_str(&content).unwrap();
    let mut pipeline = ValidationPipeline::new(RecordSchema::product());
    let accepted = pipeline.validate_batch(records);

    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].fields["currency"], serde_json::json!("USD"));
    let report = pipeline.report();
    assert_eq!(report.valid_count, 1);
    assert_eq!(report.invalid_count, 1);
    assert_eq!(report.errors[0].violations[0].field, "price");
}
