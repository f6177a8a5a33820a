//! Transport port (driven/secondary port)
//!
//! The transport hands a built [`Report`] to the remote aggregation endpoint.
//! Framing, authentication and any socket-level retry policy belong to the
//! implementation.
//!
//! ## Design Notes
//!
//! - Exactly one `deliver` call is made per report. Anything other than
//!   `Ok(())` is a delivery failure; the dispatcher records it and moves on.
//!   A panic inside `deliver` is caught and reported as
//!   [`TransportError::Panicked`].
//! - Implementations must be `Send + Sync`: the dispatcher may run several
//!   deliveries concurrently against the same transport.

use thiserror::Error;

use crate::domain::Report;

/// Errors a transport can report for a single delivery attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never completed (DNS, connect, TLS, I/O)
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status
    #[error("Rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// The report could not be encoded into the wire format
    #[error("Encode error: {0}")]
    Encode(String),

    /// The attempt exceeded the configured timeout
    #[error("Delivery timed out")]
    Timeout,

    /// The transport panicked during the attempt
    #[error("Transport panicked: {0}")]
    Panicked(String),
}

impl TransportError {
    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::Rejected { .. } => "rejected",
            TransportError::Encode(_) => "encode",
            TransportError::Timeout => "timeout",
            TransportError::Panicked(_) => "panic",
        }
    }
}

/// Port trait for report delivery
#[async_trait::async_trait]
pub trait ITransport: Send + Sync {
    /// Delivers one report
    ///
    /// # Arguments
    /// * `report` - The report to send; serialized by the implementation
    async fn deliver(&self, report: &Report) -> Result<(), TransportError>;
}
