//! Report construction
//!
//! [`ReportBuilder`] turns a [`ReportDraft`] (what the caller asked to
//! report) into an immutable [`Report`]. Construction runs on the caller's
//! thread and performs no I/O: fingerprinting, stack capture and context
//! sanitization are all in-memory.

use std::sync::Arc;

use crashline_core::{
    config::Config,
    domain::{ConstructionError, Level, Report, ReportedError},
    ports::{IRequest, IStackCapturer},
};

use crate::{fingerprint::Fingerprinter, sanitizer::ContextSanitizer, stack::BacktraceCapturer};

/// Caller input for a single report
///
/// Exactly one subject (an error or a message) must be set before the
/// draft is built.
#[derive(Clone)]
pub struct ReportDraft<'a> {
    level: Level,
    error: Option<ReportedError<'a>>,
    message: Option<String>,
    skip_frames: usize,
    with_trace: bool,
    request: Option<&'a dyn IRequest>,
}

impl<'a> ReportDraft<'a> {
    /// Starts a draft at the given severity
    pub fn new(level: Level) -> Self {
        Self {
            level,
            error: None,
            message: None,
            skip_frames: 0,
            with_trace: false,
            request: None,
        }
    }

    /// Sets an error as the subject
    pub fn error(mut self, error: impl Into<ReportedError<'a>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets a free-text message as the subject
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    /// Omits `n` more innermost frames from the captured trace
    pub fn skip_frames(mut self, n: usize) -> Self {
        self.skip_frames = n;
        self
    }

    /// Captures a trace for a message report as well
    pub fn with_trace(mut self) -> Self {
        self.with_trace = true;
        self
    }

    /// Attaches the request being served
    pub fn request(mut self, request: &'a dyn IRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Attaches the request being served, if any
    pub fn maybe_request(mut self, request: Option<&'a dyn IRequest>) -> Self {
        self.request = request;
        self
    }

    /// Severity of the draft
    pub fn level(&self) -> Level {
        self.level
    }
}

impl std::fmt::Debug for ReportDraft<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDraft")
            .field("level", &self.level)
            .field("error", &self.error)
            .field("message", &self.message)
            .field("skip_frames", &self.skip_frames)
            .field("with_trace", &self.with_trace)
            .field("request", &self.request.map(|r| (r.method(), r.url())))
            .finish()
    }
}

/// Builds reports from drafts
pub struct ReportBuilder {
    capturer: Arc<dyn IStackCapturer>,
    sanitizer: ContextSanitizer,
    default_skip: usize,
}

impl ReportBuilder {
    /// Creates a builder from its parts
    pub fn new(capturer: Arc<dyn IStackCapturer>, sanitizer: ContextSanitizer) -> Self {
        Self {
            capturer,
            sanitizer,
            default_skip: 0,
        }
    }

    /// Creates a builder with a [`BacktraceCapturer`] and the configured
    /// scrub list and trace limits
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(BacktraceCapturer::new(config.trace.max_frames)),
            ContextSanitizer::from_config(&config.scrubbing),
        )
        .with_default_skip(config.trace.default_skip)
    }

    /// Frames always skipped in addition to a draft's own skip depth
    pub fn with_default_skip(mut self, n: usize) -> Self {
        self.default_skip = n;
        self
    }

    /// Replaces the stack capturer
    pub fn with_capturer(mut self, capturer: Arc<dyn IStackCapturer>) -> Self {
        self.capturer = capturer;
        self
    }

    /// The sanitizer used for request context
    pub fn sanitizer(&self) -> &ContextSanitizer {
        &self.sanitizer
    }

    /// Builds a report
    ///
    /// # Errors
    /// - [`ConstructionError::MissingSubject`] if neither an error nor a
    ///   message was set
    /// - [`ConstructionError::ConflictingSubject`] if both were set
    #[inline(never)]
    pub fn build(&self, draft: ReportDraft<'_>) -> Result<Report, ConstructionError> {
        let skip = self.default_skip.saturating_add(draft.skip_frames);

        let report = match (draft.error, draft.message) {
            (None, None) => return Err(ConstructionError::MissingSubject),
            (Some(_), Some(_)) => return Err(ConstructionError::ConflictingSubject),
            (Some(error), None) => {
                let fingerprint = Fingerprinter::classify(&error);
                let display = error.as_error().to_string();
                let title = if display.trim().is_empty() {
                    fingerprint.clone()
                } else {
                    display
                };
                Report::error(draft.level, title, fingerprint)
                    .with_error_chain(error.source_chain())
                    .with_frames(self.capturer.capture(skip))
            }
            (None, Some(text)) => {
                let report = Report::message(draft.level, text);
                if draft.with_trace {
                    report.with_frames(self.capturer.capture(skip))
                } else {
                    report
                }
            }
        };

        Ok(match draft.request {
            Some(request) => report.with_context(self.sanitizer.request_context(request)),
            None => report,
        })
    }
}

impl std::fmt::Debug for ReportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportBuilder")
            .field("sanitizer", &self.sanitizer)
            .field("default_skip", &self.default_skip)
            .finish_non_exhaustive()
    }
}
