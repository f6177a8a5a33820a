//! Domain types
//!
//! This module contains the value types that flow through the report pipeline:
//! - Severity levels
//! - Stack frames and the immutable `Report`
//! - Sanitized context values
//! - The closed `ReportedError` variant used to pick a fingerprint strategy
//! - Domain-specific error types

pub mod context;
pub mod errors;
pub mod level;
pub mod report;
pub mod reported_error;

// Re-export commonly used types
pub use context::{ContextValue, SanitizedContext, REDACTION_MARKER};
pub use errors::{ConstructionError, DomainError};
pub use level::Level;
pub use report::{Frame, Report, ReportKind};
pub use reported_error::{ReportedError, TypedError};
