//! Authorization integration tests.
//!
//! Tests verify:
//! - Missing or wrong bearer tokens are rejected with 401
//! - The body is never inspected for unauthorized callers
//! - The transport is never called

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::test_utils::{
    body_json, json_request, router_with, sendmail_request, RecordingTransport, TEST_SECRET,
};

#[tokio::test]
async fn test_wrong_token_rejected() {
    let transport = RecordingTransport::new();
    let request = json_request("wrong", json!({ "subject": "Hi", "body": "Hello" }));

    let response = router_with(&transport).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_missing_header_rejected() {
    let transport = RecordingTransport::new();
    let request = sendmail_request(None, r#"{"subject":"Hi","body":"Hello"}"#);

    let response = router_with(&transport).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_non_bearer_schemes_rejected() {
    for value in [
        TEST_SECRET.to_string(),
        format!("bearer {TEST_SECRET}"),
        format!("Basic {TEST_SECRET}"),
        format!("Bearer  {TEST_SECRET}"),
        format!("Bearer {TEST_SECRET} "),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/sendmail")
            .header("authorization", value.as_str())
            .body(Body::from(r#"{"subject":"Hi","body":"Hello"}"#))
            .unwrap();

        let response = router_with(&RecordingTransport::new())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value:?}");
    }
}

#[tokio::test]
async fn test_malformed_body_with_wrong_token_is_unauthorized() {
    let request = sendmail_request(Some("wrong"), "{definitely not json");

    let response = router_with(&RecordingTransport::new())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
