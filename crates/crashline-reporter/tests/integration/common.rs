//! Shared test helpers for reporter integration tests
//!
//! Fake transports recording what the dispatcher hands them, plus helpers
//! building a `Reporter` around them.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use crashline_core::{
    config::{Config, ConfigBuilder},
    domain::Report,
    ports::{ITransport, TransportError},
};
use crashline_reporter::Reporter;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let directive = Config::default().logging.filter_directive();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(env_filter)
        .try_init();
}

/// Counts deliveries.
#[derive(Default)]
pub struct CountingTransport {
    delivered: AtomicUsize,
}

impl CountingTransport {
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ITransport for CountingTransport {
    async fn deliver(&self, _report: &Report) -> Result<(), TransportError> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps a copy of every delivered report, in delivery order.
#[derive(Default)]
pub struct RecordingTransport {
    reports: Mutex<Vec<Report>>,
}

impl RecordingTransport {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ITransport for RecordingTransport {
    async fn deliver(&self, report: &Report) -> Result<(), TransportError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Rejects reports whose title starts with `fail`, accepts the rest.
#[derive(Default)]
pub struct SelectiveTransport {
    accepted: AtomicUsize,
}

impl SelectiveTransport {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ITransport for SelectiveTransport {
    async fn deliver(&self, report: &Report) -> Result<(), TransportError> {
        if report.title().starts_with("fail") {
            return Err(TransportError::Rejected {
                status: 422,
                body: "unprocessable".into(),
            });
        }
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Holds every delivery until permits are released.
pub struct GatedTransport {
    pub gate: Semaphore,
    delivered: AtomicUsize,
}

impl GatedTransport {
    pub fn closed() -> Self {
        Self {
            gate: Semaphore::new(0),
            delivered: AtomicUsize::new(0),
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ITransport for GatedTransport {
    async fn deliver(&self, _report: &Report) -> Result<(), TransportError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        permit.forget();
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds a reporter around `transport` with the given config.
pub fn reporter_with(config: &Config, transport: Arc<dyn ITransport>) -> Reporter {
    init_tracing();
    Reporter::new(config, transport).expect("reporter")
}

/// Reporter delivering one report at a time to a recording transport, so
/// the recorded order is the submission order.
pub fn recording_reporter() -> (Reporter, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let config = ConfigBuilder::new().delivery_max_concurrent(1).build();
    (reporter_with(&config, transport.clone()), transport)
}
