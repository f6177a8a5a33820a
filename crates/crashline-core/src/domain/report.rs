//! Report and stack frame types
//!
//! A [`Report`] is one occurrence of an error or message, fully formed for
//! delivery. It is immutable once built: fields are private and only the
//! consuming `with_*` constructors used during construction can set them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::SanitizedContext;
use super::level::Level;

/// Placeholder used when a frame's symbol information is unavailable
pub const UNKNOWN_SYMBOL: &str = "???";

/// One entry of a captured call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Demangled function path
    pub function: String,
    /// Source file path as recorded in debug info
    pub file: String,
    /// Line number, `0` when unknown
    pub line: u32,
}

impl Frame {
    /// Creates a frame
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// A frame whose symbol could not be resolved
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_SYMBOL, UNKNOWN_SYMBOL, 0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// What a report was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Built from an error value
    Error,
    /// Built from a free-text message
    Message,
}

/// A single reported occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    id: Uuid,
    kind: ReportKind,
    level: Level,
    title: String,
    fingerprint: Option<String>,
    frames: Vec<Frame>,
    error_chain: Vec<String>,
    context: Option<SanitizedContext>,
    timestamp: DateTime<Utc>,
}

impl Report {
    /// Creates an error report
    ///
    /// # Arguments
    /// * `level` - Severity
    /// * `title` - Display text of the error
    /// * `fingerprint` - Grouping key computed for the error
    pub fn error(level: Level, title: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ReportKind::Error,
            level,
            title: title.into(),
            fingerprint: Some(fingerprint.into()),
            frames: Vec::new(),
            error_chain: Vec::new(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a message report (no fingerprint, no frames)
    pub fn message(level: Level, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ReportKind::Message,
            level,
            title: text.into(),
            fingerprint: None,
            frames: Vec::new(),
            error_chain: Vec::new(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches captured frames (innermost first)
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// Attaches the display text of the error's sources, outermost first
    pub fn with_error_chain(mut self, chain: Vec<String>) -> Self {
        self.error_chain = chain;
        self
    }

    /// Attaches sanitized context
    pub fn with_context(mut self, context: SanitizedContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Overrides the capture instant
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn error_chain(&self) -> &[String] {
        &self.error_chain
    }

    pub fn context(&self) -> Option<&SanitizedContext> {
        self.context.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
