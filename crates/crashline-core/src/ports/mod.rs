//! Port definitions
//!
//! This module defines the traits that form the boundaries of the report
//! pipeline. The reporter depends on them; implementations live in adapter
//! crates or in the host application.
//!
//! ## Ports Overview
//!
//! - [`ITransport`] - Delivers a built report to the aggregation endpoint
//! - [`IRequest`] - Read-only view of an inbound request used as report context
//! - [`IStackCapturer`] - Captures the current call stack

pub mod request;
pub mod stack_capturer;
pub mod transport;

pub use request::{IRequest, RequestInfo};
pub use stack_capturer::IStackCapturer;
pub use transport::{ITransport, TransportError};
