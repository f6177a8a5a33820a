//! The public reporting facade
//!
//! A [`Reporter`] owns a [`ReportBuilder`], a [`Dispatcher`] and a metrics
//! registry. Reporting calls build the report on the caller's thread and
//! queue it without waiting for delivery; `flush` is the synchronization
//! point. A `Reporter` is `Send + Sync` and is meant to be shared through an
//! `Arc`.

use std::{sync::Arc, time::Duration};

use crashline_core::{
    config::{Config, ValidationError},
    domain::{ConstructionError, Level, ReportedError},
    ports::{IRequest, IStackCapturer, ITransport},
};
use thiserror::Error;
use tracing::debug;

use crate::{
    builder::{ReportBuilder, ReportDraft},
    dispatcher::{DeliveryFailure, DispatchError, Dispatcher, DispatcherState, FlushStatus},
    metrics::ReporterMetrics,
};

/// Errors returned by [`Reporter`] construction and reporting calls
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The configuration did not pass validation
    #[error("Invalid configuration: {}", join_validation_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// The metrics registry could not be created
    #[error("Failed to create metrics registry: {0}")]
    Metrics(String),

    /// The report request was malformed
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// The report could not be queued
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

fn join_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error and message reporter
pub struct Reporter {
    builder: ReportBuilder,
    dispatcher: Dispatcher,
    metrics: ReporterMetrics,
    flush_timeout: Option<Duration>,
}

impl Reporter {
    /// Creates a reporter and starts its delivery worker
    ///
    /// # Arguments
    /// * `config` - Validated before use; only read during construction
    /// * `transport` - Receives every built report exactly once
    ///
    /// # Errors
    /// - [`ReporterError::InvalidConfig`] if validation fails
    /// - [`ReporterError::Dispatch`] if the worker cannot be started
    pub fn new(config: &Config, transport: Arc<dyn ITransport>) -> Result<Self, ReporterError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ReporterError::InvalidConfig(errors));
        }

        let metrics =
            ReporterMetrics::new().map_err(|e| ReporterError::Metrics(e.to_string()))?;
        let dispatcher = Dispatcher::spawn(&config.delivery, transport, metrics.clone())?;

        debug!(
            environment = %config.reporter.environment,
            max_frames = config.trace.max_frames,
            "Reporter created"
        );

        Ok(Self {
            builder: ReportBuilder::from_config(config),
            dispatcher,
            metrics,
            flush_timeout: config.delivery.flush_timeout(),
        })
    }

    /// Replaces the stack capturer (e.g. with a `NoopCapturer`)
    pub fn with_capturer(mut self, capturer: Arc<dyn IStackCapturer>) -> Self {
        self.builder = self.builder.with_capturer(capturer);
        self
    }

    /// Installs a callback invoked on the worker for every failed delivery
    ///
    /// # Deadlocks
    /// The callback runs on the delivery worker while its report still
    /// counts as pending. Calling [`Reporter::flush`] (or any flush variant)
    /// from inside it waits on that report and never returns; the same
    /// applies to `shutdown`. Keep the callback short and non-blocking: log,
    /// count, or hand the failure to another thread.
    pub fn with_failure_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&DeliveryFailure) + Send + Sync + 'static,
    {
        self.dispatcher.set_failure_callback(Arc::new(callback));
        self
    }

    /// Reports an error with a trace starting at the caller
    ///
    /// Typed errors (see `TypedError`) are grouped by type, everything else
    /// by a hash of the message.
    pub fn report_error<'a>(
        &self,
        level: Level,
        error: impl Into<ReportedError<'a>>,
        request: Option<&'a dyn IRequest>,
    ) -> Result<(), ReporterError> {
        self.report_error_with_skip(level, error, 0, request)
    }

    /// Reports an error, omitting `extra_skip_frames` innermost caller frames
    /// from the trace
    ///
    /// Wrapper functions use this to hide themselves.
    pub fn report_error_with_skip<'a>(
        &self,
        level: Level,
        error: impl Into<ReportedError<'a>>,
        extra_skip_frames: usize,
        request: Option<&'a dyn IRequest>,
    ) -> Result<(), ReporterError> {
        self.submit(
            ReportDraft::new(level)
                .error(error)
                .skip_frames(extra_skip_frames)
                .maybe_request(request),
        )
    }

    /// Reports a free-text message, without a trace
    pub fn report_message(
        &self,
        level: Level,
        text: impl Into<String>,
        request: Option<&dyn IRequest>,
    ) -> Result<(), ReporterError> {
        self.submit(
            ReportDraft::new(level)
                .message(text)
                .maybe_request(request),
        )
    }

    /// Reports a free-text message with a trace starting at the caller
    pub fn report_message_with_trace(
        &self,
        level: Level,
        text: impl Into<String>,
        extra_skip_frames: usize,
        request: Option<&dyn IRequest>,
    ) -> Result<(), ReporterError> {
        self.submit(
            ReportDraft::new(level)
                .message(text)
                .with_trace()
                .skip_frames(extra_skip_frames)
                .maybe_request(request),
        )
    }

    fn submit(&self, draft: ReportDraft<'_>) -> Result<(), ReporterError> {
        let report = self.builder.build(draft)?;
        debug!(
            report_id = %report.id(),
            level = %report.level(),
            fingerprint = report.fingerprint().unwrap_or_default(),
            frames = report.frames().len(),
            "Report built"
        );
        self.dispatcher.enqueue(report)?;
        Ok(())
    }

    /// Blocks until every report submitted so far has been delivered or
    /// has failed
    ///
    /// Do not call from async code; use [`Reporter::flush_async`].
    pub fn flush(&self) {
        self.dispatcher.flush();
    }

    /// Like [`Reporter::flush`], giving up after `timeout`
    pub fn flush_timeout(&self, timeout: Duration) -> FlushStatus {
        self.dispatcher.flush_timeout(timeout)
    }

    /// Flushes with `delivery.flush_timeout_secs` if configured, otherwise
    /// without a deadline
    pub fn flush_configured(&self) -> FlushStatus {
        match self.flush_timeout {
            Some(timeout) => self.flush_timeout(timeout),
            None => {
                self.flush();
                FlushStatus::Drained
            }
        }
    }

    /// Async counterpart of [`Reporter::flush`]
    pub async fn flush_async(&self) {
        self.dispatcher.flush_async().await;
    }

    /// Number of reports queued or being delivered
    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    /// Current dispatcher state
    pub fn state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Delivery metrics of this reporter
    pub fn metrics(&self) -> &ReporterMetrics {
        &self.metrics
    }

    /// Stops accepting reports, delivers what is queued and joins the worker
    pub fn shutdown(self) {
        self.dispatcher.shutdown();
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("builder", &self.builder)
            .field("dispatcher", &self.dispatcher)
            .field("flush_timeout", &self.flush_timeout)
            .finish_non_exhaustive()
    }
}
