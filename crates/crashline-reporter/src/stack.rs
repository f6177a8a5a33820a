//! Stack capture
//!
//! [`BacktraceCapturer`] walks the current call stack with the `backtrace`
//! crate. Frames belonging to the unwinder and to the reporter itself are
//! stripped first, so with `skip_frames = 0` the trace starts at the code
//! that called into the reporter. [`NoopCapturer`] is the substitute for
//! targets without unwinding support.

use std::borrow::Cow;

use crashline_core::{
    domain::{report::UNKNOWN_SYMBOL, Frame},
    ports::IStackCapturer,
};

/// Default number of frames kept per trace
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// Extra frames walked beyond what is kept, to cover the stripped
/// unwinder and reporter frames
const INTERNAL_HEADROOM: usize = 32;

/// Symbol fragments identifying frames that are never reported
const DEFAULT_INTERNAL_MARKERS: &[&str] = &["backtrace::", "crashline_reporter::"];

/// Stack capturer backed by the `backtrace` crate
#[derive(Debug, Clone)]
pub struct BacktraceCapturer {
    max_frames: usize,
    internal_markers: Vec<Cow<'static, str>>,
}

impl BacktraceCapturer {
    /// Creates a capturer keeping at most `max_frames` frames
    pub fn new(max_frames: usize) -> Self {
        Self {
            max_frames,
            internal_markers: DEFAULT_INTERNAL_MARKERS
                .iter()
                .map(|m| Cow::Borrowed(*m))
                .collect(),
        }
    }

    /// Replaces the symbol fragments used to recognise internal frames.
    ///
    /// Leading frames whose function name contains any marker are
    /// stripped before `skip_frames` is applied.
    pub fn with_internal_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        self.internal_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum number of frames returned
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    fn is_internal(&self, frame: &Frame) -> bool {
        self.internal_markers
            .iter()
            .any(|marker| frame.function.contains(marker.as_ref()))
    }

    /// Index of the first frame after the leading internal region.
    ///
    /// Unresolved frames ahead of the first internal frame belong to the
    /// unwinder as well. If no internal frame is found at all (stripped
    /// binaries), nothing is removed.
    fn first_caller_frame(&self, frames: &[Frame]) -> usize {
        let mut seen_internal = false;
        for (index, frame) in frames.iter().enumerate() {
            if self.is_internal(frame) {
                seen_internal = true;
            } else if seen_internal {
                return index;
            }
        }
        if seen_internal {
            frames.len()
        } else {
            0
        }
    }
}

impl Default for BacktraceCapturer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAMES)
    }
}

impl IStackCapturer for BacktraceCapturer {
    #[inline(never)]
    fn capture(&self, skip_frames: usize) -> Vec<Frame> {
        let limit = self
            .max_frames
            .saturating_add(skip_frames)
            .saturating_add(INTERNAL_HEADROOM);
        let mut frames: Vec<Frame> = Vec::new();

        backtrace::trace(|frame| {
            let mut resolved = false;
            backtrace::resolve_frame(frame, |symbol| {
                resolved = true;
                let function = symbol
                    .name()
                    .map(|name| format!("{name:#}"))
                    .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());
                let file = symbol
                    .filename()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());
                frames.push(Frame::new(function, file, symbol.lineno().unwrap_or(0)));
            });
            if !resolved {
                frames.push(Frame::unknown());
            }
            frames.len() < limit
        });

        let start = self.first_caller_frame(&frames);
        frames
            .into_iter()
            .skip(start.saturating_add(skip_frames))
            .take(self.max_frames)
            .collect()
    }
}

/// Capturer that never records frames
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCapturer;

impl IStackCapturer for NoopCapturer {
    fn capture(&self, _skip_frames: usize) -> Vec<Frame> {
        Vec::new()
    }
}
