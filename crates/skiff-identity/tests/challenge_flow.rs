//! Integration tests for the HTTP identity client, using wiremock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skiff_identity::{
    CodeSource, HttpIdentityService, IdentityError, ensure_identity,
};

struct CountingCode {
    calls: AtomicUsize,
}

impl CountingCode {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl CodeSource for CountingCode {
    fn next_code(&self) -> Result<String, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("424242".to_string())
    }
}

async fn mount_basics(server: &MockServer, has_credential: bool) {
    Mock::given(method("POST"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/credential"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"present": has_credential})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/name"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "agent@example.org"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn bootstrap_is_a_noop_with_existing_credential() {
    let server = MockServer::start().await;
    mount_basics(&server, true).await;

    // No /challenge mock mounted: reaching it would 404 and fail the test
    let service = HttpIdentityService::new(server.uri());
    let codes = CountingCode::new();
    ensure_identity(&service, "agent@example.org", &codes)
        .await
        .unwrap();
    assert_eq!(codes.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn challenge_submits_code_and_completes() {
    let server = MockServer::start().await;
    mount_basics(&server, false).await;

    Mock::given(method("POST"))
        .and(path("/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    // First poll asks for a code, second reports success
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "need-code"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "valid"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let service =
        HttpIdentityService::new(server.uri()).with_poll_interval(Duration::from_millis(10));
    let codes = CountingCode::new();
    ensure_identity(&service, "agent@example.org", &codes)
        .await
        .unwrap();
    assert_eq!(codes.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrong_code_retries_until_accepted() {
    let server = MockServer::start().await;
    mount_basics(&server, false).await;

    Mock::given(method("POST"))
        .and(path("/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    // need-code, wrong-code, need-code, valid
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "need-code"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "wrong-code"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "need-code"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "valid"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let service =
        HttpIdentityService::new(server.uri()).with_poll_interval(Duration::from_millis(10));
    let codes = CountingCode::new();
    ensure_identity(&service, "agent@example.org", &codes)
        .await
        .unwrap();
    assert_eq!(codes.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn terminal_refusal_aborts_bootstrap() {
    let server = MockServer::start().await;
    mount_basics(&server, false).await;

    Mock::given(method("POST"))
        .and(path("/challenge"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "account disabled"})),
        )
        .mount(&server)
        .await;

    let service = HttpIdentityService::new(server.uri());
    let codes = CountingCode::new();
    let err = ensure_identity(&service, "agent@example.org", &codes)
        .await
        .unwrap_err();

    match err {
        IdentityError::Terminal(message) => assert_eq!(message, "account disabled"),
        other => panic!("expected terminal error, got {:?}", other),
    }
}
