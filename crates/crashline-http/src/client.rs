//! HTTP transport
//!
//! Delivers each report as one JSON `POST` to the configured item endpoint.
//! A 2xx answer is success; anything else is a rejection carrying the
//! status and the start of the response body. There are no retries: the
//! dispatcher makes exactly one attempt per report.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use crashline_core::config::Config;
//! use crashline_http::HttpTransport;
//! use crashline_reporter::Reporter;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let reporter = Reporter::new(&config, transport)?;
//! # let _ = reporter;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use crashline_core::{
    config::Config,
    domain::Report,
    ports::{ITransport, TransportError},
};
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, warn};

use crate::payload::{self, PayloadSettings};

/// Longest response body kept in a rejection, in characters
pub const MAX_REJECTION_BODY_CHARS: usize = 512;

/// `ITransport` backed by `reqwest`
pub struct HttpTransport {
    /// The underlying HTTP client
    client: Client,
    /// Item endpoint URL
    endpoint: String,
    /// Values written into every payload
    settings: PayloadSettings,
}

impl HttpTransport {
    /// Creates a transport from the reporter and delivery sections of the
    /// config
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.delivery.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(
            client,
            config.reporter.endpoint.clone(),
            PayloadSettings::from_config(&config.reporter),
        ))
    }

    /// Creates a transport posting to a custom endpoint (useful for testing)
    ///
    /// # Arguments
    /// * `endpoint` - Full item endpoint URL
    /// * `settings` - Values written into every payload
    pub fn with_endpoint(endpoint: impl Into<String>, settings: PayloadSettings) -> Self {
        Self::with_client(Client::new(), endpoint.into(), settings)
    }

    /// Like [`HttpTransport::with_endpoint`], with a per-request timeout
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoint_and_timeout(
        endpoint: impl Into<String>,
        settings: PayloadSettings,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, endpoint.into(), settings))
    }

    fn with_client(client: Client, endpoint: String, settings: PayloadSettings) -> Self {
        if settings.access_token.is_none() {
            warn!(
                %endpoint,
                "No access token configured; items will be sent without one"
            );
        }
        Self {
            client,
            endpoint,
            settings,
        }
    }

    /// Returns the item endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the payload settings
    pub fn settings(&self) -> &PayloadSettings {
        &self.settings
    }
}

#[async_trait]
impl ITransport for HttpTransport {
    async fn deliver(&self, report: &Report) -> Result<(), TransportError> {
        let body = serde_json::to_vec(&payload::encode(report, &self.settings))
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(report_id = %report.id(), status = status.as_u16(), "Item accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            body: truncate_chars(&body, MAX_REJECTION_BODY_CHARS),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("environment", &self.settings.environment)
            .field("has_access_token", &self.settings.access_token.is_some())
            .finish_non_exhaustive()
    }
}

fn map_request_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(error.to_string())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
