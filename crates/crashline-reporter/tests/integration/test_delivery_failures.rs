//! Delivery failures stay on the side channel

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crashline_core::domain::Level;
use crashline_reporter::DeliveryFailure;

use crate::common::{self, SelectiveTransport};

#[test]
fn test_failure_invokes_callback_and_later_reports_deliver() {
    let transport = Arc::new(SelectiveTransport::default());
    let failures: Arc<Mutex<Vec<DeliveryFailure>>> = Arc::default();
    let reporter = {
        let failures = Arc::clone(&failures);
        common::reporter_with(&Default::default(), transport.clone()).with_failure_callback(
            move |failure| failures.lock().unwrap().push(failure.clone()),
        )
    };

    let err = std::io::Error::new(std::io::ErrorKind::Other, "fail: upstream down");
    reporter.report_error(Level::Critical, &err, None).unwrap();
    reporter.flush();

    for n in 0..5 {
        reporter
            .report_message(Level::Info, format!("recovered {n}"), None)
            .unwrap();
    }
    reporter.flush();

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].level, Level::Critical);
    assert_eq!(failures[0].title, "fail: upstream down");
    assert_eq!(failures[0].error.reason(), "rejected");

    assert_eq!(transport.accepted(), 5);
    assert_eq!(reporter.metrics().failures("rejected"), 1);
    assert_eq!(reporter.metrics().delivered(Level::Info), 5);
}

#[test]
fn test_failures_without_callback_are_counted() {
    let transport = Arc::new(SelectiveTransport::default());
    let reporter = common::reporter_with(&Default::default(), transport.clone());

    for n in 0..3 {
        reporter
            .report_message(Level::Error, format!("fail {n}"), None)
            .unwrap();
    }
    reporter.flush();

    assert_eq!(transport.accepted(), 0);
    assert_eq!(reporter.metrics().failures("rejected"), 3);
    let exposition = reporter.metrics().encode().unwrap();
    assert!(exposition.contains("crashline_delivery_failures_total{reason=\"rejected\"} 3"));
}

#[test]
fn test_callback_sees_every_failure_before_flush_returns() {
    let transport = Arc::new(SelectiveTransport::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let reporter = {
        let calls = Arc::clone(&calls);
        common::reporter_with(&Default::default(), transport.clone()).with_failure_callback(
            move |_failure| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    for n in 0..20 {
        let text = if n % 2 == 0 {
            format!("fail {n}")
        } else {
            format!("ok {n}")
        };
        reporter.report_message(Level::Warning, text, None).unwrap();
    }
    reporter.flush();

    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert_eq!(transport.accepted(), 10);
}
