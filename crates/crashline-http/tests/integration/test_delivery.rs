//! Integration tests for HttpTransport::deliver
//!
//! Verifies the posted JSON and how HTTP outcomes map to transport errors.

use std::time::Duration;

use crashline_core::{
    domain::{Frame, Level, Report},
    ports::{ITransport, TransportError},
};
use crashline_http::{payload::NOTIFIER_VERSION, HttpTransport};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn error_report() -> Report {
    Report::error(Level::Error, "Something is broken!", "{508e076d}")
        .with_frames(vec![Frame::new("app::handler", "src/handler.rs", 42)])
}

#[tokio::test]
async fn test_error_report_is_posted_as_item() {
    let server = MockServer::start().await;
    let report = error_report();

    Mock::given(method("POST"))
        .and(path(common::ITEM_PATH))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "access_token": "test-access-token",
            "data": {
                "environment": "test",
                "title": "Something is broken!",
                "level": "error",
                "uuid": report.id().to_string(),
                "platform": "linux",
                "language": "rust",
                "code_version": "deadbeef",
                "fingerprint": "{508e076d}",
                "server": { "host": "test-host" },
                "notifier": { "name": "crashline", "version": NOTIFIER_VERSION },
                "body": {
                    "trace": {
                        "frames": [
                            { "filename": "src/handler.rs", "method": "app::handler", "lineno": 42 }
                        ],
                        "exception": { "class": "{508e076d}", "message": "Something is broken!" }
                    }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::with_endpoint(common::item_url(&server), common::test_settings());

    transport.deliver(&report).await.expect("deliver failed");
}

#[tokio::test]
async fn test_message_report_is_posted() {
    let (server, transport) = common::setup_accepting_endpoint().await;

    transport
        .deliver(&Report::message(Level::Info, "cache rebuilt"))
        .await
        .expect("deliver failed");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().expect("json body");
    assert_eq!(body["data"]["body"]["message"]["body"], "cache rebuilt");
    assert_eq!(body["data"]["level"], "info");
    assert!(body["data"].get("fingerprint").is_none());
}

#[tokio::test]
async fn test_server_error_is_rejection() {
    let (_server, transport) = common::setup_failing_endpoint(500, "internal error").await;

    let err = transport.deliver(&error_report()).await.unwrap_err();

    assert_eq!(
        err,
        TransportError::Rejected {
            status: 500,
            body: "internal error".into()
        }
    );
    assert_eq!(err.reason(), "rejected");
}

#[tokio::test]
async fn test_rejection_body_is_truncated() {
    let long_body = "x".repeat(2000);
    let (_server, transport) = common::setup_failing_endpoint(422, &long_body).await;

    let err = transport.deliver(&error_report()).await.unwrap_err();

    match err {
        TransportError::Rejected { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body.len(), 512);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let (_server, transport) =
        common::setup_slow_endpoint(Duration::from_secs(5), Duration::from_millis(200)).await;

    let err = transport.deliver(&error_report()).await.unwrap_err();

    assert_eq!(err, TransportError::Timeout);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Nothing listens on port 1; the connection is refused.
    let transport = HttpTransport::with_endpoint(
        "http://127.0.0.1:1/api/1/item/",
        common::test_settings(),
    );

    let err = transport.deliver(&error_report()).await.unwrap_err();

    assert_eq!(err.reason(), "network");
}
