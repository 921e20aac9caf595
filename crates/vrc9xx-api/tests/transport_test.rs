#![allow(clippy::unwrap_used)]
// Integration tests for `Transport` using wiremock.

use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vrc9xx_api::{ApiRequest, Error, RetryPolicy, Transport, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> TransportConfig {
    TransportConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_retries: 3,
            backoff_step: Duration::from_millis(10),
        },
    }
}

async fn setup() -> (MockServer, Transport) {
    let server = MockServer::start().await;
    let transport = Transport::new(&config(&server)).unwrap();
    (server, transport)
}

// ── Classification ──────────────────────────────────────────────────

#[tokio::test]
async fn test_success_decodes_body() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": { "facilitiesList": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport.execute(&ApiRequest::facilities()).await.unwrap();
    assert_eq!(body["body"]["facilitiesList"], json!([]));
}

#[tokio::test]
async fn test_empty_body_decodes_to_null() {
    let (server, transport) = setup().await;

    Mock::given(method("PUT"))
        .and(path(
            "/facilities/ABC123/systemcontrol/v1/zones/Z1/heating/configuration/setpoint_temperature",
        ))
        .and(body_json(json!({ "setpoint_temperature": 20.0 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport
        .execute(&ApiRequest::set_zone_setpoint("ABC123", "Z1", 20.0))
        .await
        .unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(401).set_body_string("login required"))
        .expect(1)
        .mount(&server)
        .await;

    let result = transport.execute(&ApiRequest::facilities()).await;
    let err = result.unwrap_err();
    assert!(err.is_auth_expired(), "expected SessionExpired, got: {err:?}");
}

#[tokio::test]
async fn test_not_found_is_terminal() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities/NOPE/systemcontrol/v1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such facility"))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport
        .execute(&ApiRequest::full_system("NOPE"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    match err {
        Error::NotFound { status_text, body } => {
            assert_eq!(status_text, "Not Found");
            assert_eq!(body, "no such facility");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_is_terminal() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities/ABC123/livereport/v1"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport
        .execute(&ApiRequest::live_report("ABC123"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_then_succeeds() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport.execute(&ApiRequest::facilities()).await.unwrap();
    assert_eq!(body, json!({ "body": {} }));
}

#[tokio::test]
async fn test_too_many_retries_after_four_attempts() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(4)
        .mount(&server)
        .await;

    let err = transport
        .execute(&ApiRequest::facilities())
        .await
        .unwrap_err();
    match err {
        Error::TooManyRetries {
            description,
            attempts,
            last,
        } => {
            assert_eq!(description, "Get facilities");
            assert_eq!(attempts, 4);
            assert_eq!(last.status(), Some(500));
        }
        other => panic!("expected TooManyRetries, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let (server, transport) = setup().await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/facilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": {} })))
        .expect(1)
        .mount(&server)
        .await;

    transport.execute(&ApiRequest::facilities()).await.unwrap();
}

#[tokio::test]
async fn test_connection_failure_is_retried() {
    let config = TransportConfig {
        base_url: Url::parse("http://127.0.0.1:9/mobile/api/v4").unwrap(),
        timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            max_retries: 3,
            backoff_step: Duration::from_millis(10),
        },
    };
    let transport = Transport::new(&config).unwrap();

    let err = transport.execute(&ApiRequest::facilities()).await.unwrap_err();
    match err {
        Error::TooManyRetries { attempts, last, .. } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*last, Error::Transport(_)));
        }
        other => panic!("expected TooManyRetries, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_request_build_failure_is_not_retried() {
    let config = TransportConfig {
        base_url: Url::parse("ftp://127.0.0.1/mobile/api/v4").unwrap(),
        timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            max_retries: 3,
            backoff_step: Duration::from_secs(2),
        },
    };
    let transport = Transport::new(&config).unwrap();

    let started = std::time::Instant::now();
    let err = transport.execute(&ApiRequest::facilities()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
    assert!(!err.is_transient());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_backoff_is_linear() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(1), Duration::from_secs(2));
    assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for(3), Duration::from_secs(6));
}

#[test]
fn test_url_keeps_base_path() {
    let config = TransportConfig::default();
    let transport = Transport::new(&config).unwrap();
    assert_eq!(
        transport.url("/facilities").unwrap().as_str(),
        "https://smart.vaillant.com/mobile/api/v4/facilities"
    );
}
