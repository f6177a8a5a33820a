//! Crashline HTTP - Delivery of reports to an item-ingestion HTTP API
//!
//! Provides:
//! - `HttpTransport`: `ITransport` implementation backed by `reqwest`
//! - `payload`: Encoding of a `Report` into the JSON item payload
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use crashline_core::config::Config;
//! use crashline_http::HttpTransport;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load_or_default(&Config::default_path()).with_env_overrides();
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! # let _ = transport;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod payload;

pub use client::HttpTransport;
pub use payload::PayloadSettings;
