//! Crashline Reporter - Report construction and asynchronous dispatch
//!
//! Provides:
//! - `Fingerprinter`: Stable grouping keys for errors
//! - `BacktraceCapturer` / `NoopCapturer`: Stack capture behind `IStackCapturer`
//! - `ContextSanitizer`: Scrubbing and flattening of request context
//! - `ReportBuilder`: Composes the above into an immutable `Report`
//! - `Dispatcher`: Bounded queue, background delivery worker and flush
//! - `ReporterMetrics`: Prometheus counters for delivery outcomes
//! - `Reporter`: The public reporting facade
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use crashline_core::{config::Config, domain::Level, ports::ITransport};
//! use crashline_reporter::Reporter;
//!
//! # fn example(transport: Arc<dyn ITransport>) -> anyhow::Result<()> {
//! let reporter = Reporter::new(&Config::default(), transport)?;
//!
//! let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
//! reporter.report_error(Level::Error, &err, None)?;
//! reporter.report_message(Level::Info, "cache rebuilt", None)?;
//!
//! // Block until everything queued so far has been handed to the transport.
//! reporter.flush();
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Delivery outcomes are emitted as `tracing` events. The host owns the
//! subscriber and uses the `logging` config section to filter them:
//!
//! ```rust,no_run
//! use crashline_core::config::Config;
//! use tracing_subscriber::EnvFilter;
//!
//! # fn example(config: &Config) {
//! let env_filter = EnvFilter::try_from_default_env()
//!     .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_directive()));
//! tracing_subscriber::fmt().with_env_filter(env_filter).init();
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod dispatcher;
pub mod fingerprint;
pub mod metrics;
pub mod sanitizer;
pub mod stack;

pub use builder::{ReportBuilder, ReportDraft};
pub use client::{Reporter, ReporterError};
pub use dispatcher::{
    DeliveryFailure, DispatchError, Dispatcher, DispatcherState, FailureCallback, FlushStatus,
};
pub use fingerprint::Fingerprinter;
pub use metrics::ReporterMetrics;
pub use sanitizer::ContextSanitizer;
pub use stack::{BacktraceCapturer, NoopCapturer};
