//! Report contents as seen by the transport: traces, grouping, context

use std::sync::Arc;

use crashline_core::{
    domain::{Level, ReportKind, ReportedError, TypedError},
    ports::RequestInfo,
};
use crashline_reporter::{Fingerprinter, NoopCapturer, Reporter};

use crate::common;

#[derive(Debug, thiserror::Error)]
#[error("payment declined for order {0}")]
struct PaymentDeclined(u32);

impl TypedError for PaymentDeclined {}

#[derive(Debug, thiserror::Error)]
#[error("checkout failed")]
struct CheckoutFailed {
    #[source]
    source: PaymentDeclined,
}

impl TypedError for CheckoutFailed {}

#[inline(never)]
fn report_from_helper(reporter: &Reporter, skip: usize) {
    let err = std::io::Error::new(std::io::ErrorKind::Other, "helper failure");
    reporter
        .report_error_with_skip(Level::Error, &err, skip, None)
        .unwrap();
}

#[test]
fn test_error_trace_starts_at_caller() {
    let (reporter, transport) = common::recording_reporter();

    report_from_helper(&reporter, 0);
    report_from_helper(&reporter, 1);
    reporter.flush();

    let reports = transport.reports();
    assert_eq!(reports.len(), 2);

    let direct = reports[0].frames();
    assert!(
        direct[0].function.contains("report_from_helper"),
        "unexpected innermost frame: {}",
        direct[0]
    );
    assert!(direct
        .iter()
        .all(|f| !f.function.contains("crashline_reporter::")));

    let skipped = reports[1].frames();
    assert!(
        skipped[0].function.contains("test_error_trace_starts_at_caller"),
        "unexpected innermost frame: {}",
        skipped[0]
    );
    assert_eq!(direct.len(), skipped.len() + 1);
}

#[test]
fn test_skip_beyond_stack_depth_gives_empty_trace() {
    let (reporter, transport) = common::recording_reporter();
    let err = std::io::Error::new(std::io::ErrorKind::Other, "deep");

    reporter
        .report_error_with_skip(Level::Error, &err, 100_000, None)
        .unwrap();
    reporter.flush();

    let reports = transport.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].frames().is_empty());
    assert_eq!(reports[0].title(), "deep");
}

#[test]
fn test_messages_are_trace_free_unless_requested() {
    let (reporter, transport) = common::recording_reporter();

    reporter
        .report_message(Level::Info, "cache rebuilt", None)
        .unwrap();
    reporter
        .report_message_with_trace(Level::Debug, "checkpoint", 0, None)
        .unwrap();
    reporter.flush();

    let reports = transport.reports();
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0].kind(), ReportKind::Message);
    assert_eq!(reports[0].level(), Level::Info);
    assert!(reports[0].fingerprint().is_none());
    assert!(reports[0].frames().is_empty());

    assert_eq!(reports[1].title(), "checkpoint");
    assert!(reports[1].fingerprint().is_none());
    assert!(reports[1].frames()[0]
        .function
        .contains("test_messages_are_trace_free_unless_requested"));
}

#[test]
fn test_grouping_by_message_and_by_type() {
    let (reporter, transport) = common::recording_reporter();

    let io = std::io::Error::new(std::io::ErrorKind::Other, "Something is broken!");
    let any = anyhow::anyhow!("Something is broken!");
    reporter.report_error(Level::Error, &io, None).unwrap();
    reporter.report_error(Level::Error, &any, None).unwrap();
    reporter
        .report_error(Level::Critical, &PaymentDeclined(1), None)
        .unwrap();
    reporter
        .report_error(Level::Critical, &PaymentDeclined(2), None)
        .unwrap();
    reporter
        .report_error(Level::Warning, ReportedError::builtin(&PaymentDeclined(3)), None)
        .unwrap();
    reporter.flush();

    let fingerprints: Vec<String> = transport
        .reports()
        .iter()
        .map(|r| r.fingerprint().unwrap_or_default().to_string())
        .collect();

    assert_eq!(fingerprints[0], "{508e076d}");
    assert_eq!(fingerprints[0], fingerprints[1]);
    assert!(fingerprints[2].ends_with("PaymentDeclined"));
    assert!(!fingerprints[2].starts_with('{'));
    assert_eq!(fingerprints[2], fingerprints[3]);
    assert!(Fingerprinter::is_hashed(&fingerprints[4]));
    assert_ne!(fingerprints[4], fingerprints[0]);
}

#[test]
fn test_error_chain_is_recorded() {
    let (reporter, transport) = common::recording_reporter();
    let err = CheckoutFailed {
        source: PaymentDeclined(7),
    };

    reporter.report_error(Level::Error, &err, None).unwrap();
    reporter.flush();

    let reports = transport.reports();
    assert_eq!(reports[0].title(), "checkout failed");
    assert_eq!(
        reports[0].error_chain(),
        ["payment declined for order 7".to_string()]
    );
    assert!(reports[0]
        .fingerprint()
        .is_some_and(|f| f.ends_with("CheckoutFailed")));
}

#[test]
fn test_request_context_is_scrubbed() {
    let (reporter, transport) = common::recording_reporter();
    let request = RequestInfo::new(
        "GET",
        "http://foo.com/somewhere?param1=true&Password=hunter2&tag=a&tag=b",
    )
    .with_remote_addr("1.1.1.1:123");
    let err = std::io::Error::new(std::io::ErrorKind::Other, "bad request");

    reporter
        .report_error(Level::Error, &err, Some(&request))
        .unwrap();
    reporter.flush();

    let reports = transport.reports();
    let context = reports[0].context().expect("request context");
    let json = serde_json::to_value(context).unwrap();

    assert_eq!(
        json["url"],
        "http://foo.com/somewhere?param1=true&Password=hunter2&tag=a&tag=b"
    );
    assert_eq!(json["method"], "GET");
    assert_eq!(json["user_ip"], "1.1.1.1:123");
    assert_eq!(json["GET"]["param1"], "true");
    assert_eq!(json["GET"]["Password"], "------");
    assert_eq!(json["GET"]["tag"], serde_json::json!(["a", "b"]));
}

#[test]
fn test_noop_capturer_disables_traces() {
    let transport = Arc::new(common::RecordingTransport::default());
    let reporter = common::reporter_with(&Default::default(), transport.clone())
        .with_capturer(Arc::new(NoopCapturer));
    let err = std::io::Error::new(std::io::ErrorKind::Other, "no trace");

    reporter.report_error(Level::Error, &err, None).unwrap();
    reporter.flush();

    assert!(transport.reports()[0].frames().is_empty());
}
