//! Domain error types
//!
//! Validation failures on domain values and malformed report construction
//! requests. Both are surfaced synchronously to the caller.

use thiserror::Error;

/// Errors that can occur when parsing or validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown severity level name
    #[error("Invalid level: {0}")]
    InvalidLevel(String),
}

/// Errors raised while building a report from caller input
///
/// A report has exactly one subject: an error value or a free-text message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Neither an error nor a message was supplied
    #[error("Report has no subject: supply an error or a message")]
    MissingSubject,

    /// Both an error and a message were supplied
    #[error("Report has two subjects: supply an error or a message, not both")]
    ConflictingSubject,
}
