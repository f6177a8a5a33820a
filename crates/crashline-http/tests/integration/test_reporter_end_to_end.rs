//! End-to-end: Reporter -> Dispatcher -> HttpTransport -> mock endpoint

use std::sync::{Arc, Mutex};

use crashline_core::{config::ConfigBuilder, domain::Level, ports::RequestInfo};
use crashline_http::HttpTransport;
use crashline_reporter::{DeliveryFailure, Reporter};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_reports_reach_endpoint_after_flush() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::ITEM_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let config = ConfigBuilder::new()
        .endpoint(common::item_url(&server))
        .access_token("test-access-token")
        .environment("test")
        .build();
    let transport = Arc::new(HttpTransport::from_config(&config).expect("transport"));
    let reporter = Reporter::new(&config, transport).expect("reporter");

    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    reporter.report_error(Level::Critical, &err, None).unwrap();
    reporter
        .report_message(Level::Info, "cache rebuilt", None)
        .unwrap();
    reporter
        .report_message_with_trace(Level::Debug, "checkpoint", 0, None)
        .unwrap();

    reporter.flush_async().await;

    assert_eq!(reporter.metrics().delivered_total(), 3);
    server.verify().await;
}

#[tokio::test]
async fn test_request_context_and_scrubbing_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::ITEM_PATH))
        .and(body_partial_json(serde_json::json!({
            "data": {
                "fingerprint": "{1cd9046f}",
                "request": {
                    "url": "http://foo.com/somewhere?param1=true&password=hunter2",
                    "method": "GET",
                    "query_string": "param1=true&password=hunter2",
                    "user_ip": "1.1.1.1:123",
                    "GET": { "param1": "true", "password": "------" }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConfigBuilder::new()
        .endpoint(common::item_url(&server))
        .build();
    let transport = Arc::new(HttpTransport::from_config(&config).expect("transport"));
    let reporter = Reporter::new(&config, transport).expect("reporter");

    let request = RequestInfo::new("GET", "http://foo.com/somewhere?param1=true&password=hunter2")
        .with_remote_addr("1.1.1.1:123");
    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    reporter
        .report_error(Level::Error, &err, Some(&request))
        .unwrap();

    reporter.flush_async().await;

    assert_eq!(reporter.metrics().delivered(Level::Error), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_rejections_reach_failure_callback() {
    let (_server, transport) = common::setup_failing_endpoint(503, "unavailable").await;
    let failures: Arc<Mutex<Vec<DeliveryFailure>>> = Arc::default();

    let reporter = {
        let failures = Arc::clone(&failures);
        Reporter::new(&Default::default(), Arc::new(transport))
            .expect("reporter")
            .with_failure_callback(move |failure| failures.lock().unwrap().push(failure.clone()))
    };

    reporter
        .report_message(Level::Warning, "queue backlog", None)
        .unwrap();
    reporter.flush_async().await;

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].title, "queue backlog");
    assert_eq!(failures[0].error.reason(), "rejected");
    assert_eq!(reporter.metrics().failures("rejected"), 1);
}
