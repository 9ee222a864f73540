//! Integration tests for the dispatch core over real HTTP
//!
//! These tests run the `ureq` transport against a mock server:
//! - Delivering the payload and capturing a JSON response
//! - Non-2xx responses
//! - Following redirects, re-sending the body on 307 and 308
//! - Response bodies that cannot be read
//! - Refused connections and timeouts

mod common;

use std::time::Duration;

use hookpost::dispatch::{ResponseBody, TransportErrorKind};
use hookpost::{DispatchConfig, DispatchError, DispatchOutcome};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{INVOICE_PAYLOAD, closed_port, dispatch_invoice};

fn config(endpoint: String) -> DispatchConfig {
    DispatchConfig {
        timeout: Duration::from_secs(5),
        ..DispatchConfig::for_endpoint(endpoint)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_posts_json_and_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/x"))
        .and(header("content-type", "application/json"))
        .and(body_string(INVOICE_PAYLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let (result, records) = dispatch_invoice(config(format!("{}/hooks/x", server.uri()))).await;
    let outcome = result.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.http_status(), 200);
    assert_eq!(
        outcome.body(),
        Some(&ResponseBody::Json(serde_json::json!({"ok": true})))
    );

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request, INVOICE_PAYLOAD);
    assert_eq!(records[0].result, "HTTP Code: 200\n{\"ok\":true}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_2xx_is_an_outcome_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("missing field"))
        .mount(&server)
        .await;

    let (result, records) = dispatch_invoice(config(format!("{}/hook", server.uri()))).await;
    let outcome = result.unwrap();

    assert!(matches!(outcome, DispatchOutcome::UnexpectedStatus { status: 422, .. }));
    assert_eq!(outcome.body(), Some(&ResponseBody::Text("missing field".to_string())));
    assert_eq!(records[0].http_code(), Some(422));
}

async fn mount_redirect(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(status).insert_header("Location", format!("{}/final", server.uri())))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_see_other_redirect_continues_as_get() {
    let server = MockServer::start().await;
    mount_redirect(&server, 303).await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .expect(1)
        .mount(&server)
        .await;

    let (result, records) = dispatch_invoice(config(format!("{}/start", server.uri()))).await;

    assert_eq!(result.unwrap().http_status(), 200);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].result, "HTTP Code: 200\ndone");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_temporary_and_permanent_redirects_resend_payload() {
    for status in [307, 308] {
        let server = MockServer::start().await;
        mount_redirect(&server, status).await;
        Mock::given(method("POST"))
            .and(path("/final"))
            .and(header("content-type", "application/json"))
            .and(body_string(INVOICE_PAYLOAD))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"moved":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let (result, records) = dispatch_invoice(config(format!("{}/start", server.uri()))).await;
        let outcome = result.unwrap();

        assert!(outcome.is_success(), "HTTP {} was not followed: {:?}", status, outcome);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "HTTP Code: 200\n{\"moved\":true}");
        server.verify().await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirect_loop_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let (result, records) = dispatch_invoice(config(format!("{}/loop", server.uri()))).await;
    let outcome = result.unwrap();

    assert_eq!(outcome.http_status(), 0);
    assert_eq!(outcome.transport_error().map(|e| e.kind), Some(TransportErrorKind::Redirect));
    assert_eq!(records.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreadable_body_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(11 * 1024 * 1024)))
        .mount(&server)
        .await;

    let (result, records) = dispatch_invoice(config(format!("{}/big", server.uri()))).await;
    let outcome = result.unwrap();

    assert_eq!(outcome.http_status(), 200);
    assert!(!outcome.is_success());
    assert!(outcome.transport_error().is_some());

    assert_eq!(records.len(), 1);
    assert!(records[0].result.starts_with("HTTP Code: 200\n"));
    assert_ne!(records[0].result, "HTTP Code: 200\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_refused_is_recorded() {
    let endpoint = format!("http://127.0.0.1:{}/hook", closed_port());

    let (result, records) = dispatch_invoice(config(endpoint.clone())).await;
    let outcome = result.unwrap();

    assert!(matches!(outcome, DispatchOutcome::TransportFailed { .. }));
    assert_eq!(outcome.http_status(), 0);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint, endpoint);
    assert!(records[0].result.starts_with("HTTP Code: 0\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_bounds_the_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let dispatch = DispatchConfig {
        timeout: Duration::from_secs(1),
        ..DispatchConfig::for_endpoint(format!("{}/slow", server.uri()))
    };

    let started = std::time::Instant::now();
    let (result, records) = dispatch_invoice(dispatch).await;
    let outcome = result.unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(outcome.transport_error().map(|e| e.kind), Some(TransportErrorKind::Timeout));
    assert_eq!(records.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_endpoint_never_touches_network() {
    let (result, records) = dispatch_invoice(DispatchConfig::default()).await;

    assert_eq!(result, Err(DispatchError::ConfigurationError));
    assert!(records.is_empty());
}
