//! Stack capture port
//!
//! Stack introspection sits behind this trait so that targets without
//! unwinding support (or tests) can substitute a no-op capturer without
//! touching report construction.

use crate::domain::Frame;

/// Port trait for call stack capture
pub trait IStackCapturer: Send + Sync {
    /// Captures the current call stack
    ///
    /// Frames belonging to the capturer itself are never returned. Index 0
    /// of the result is the innermost remaining frame.
    ///
    /// # Arguments
    /// * `skip_frames` - Number of additional innermost frames to omit, so
    ///   wrapper functions can hide themselves from the trace
    ///
    /// # Returns
    /// The remaining frames, or an empty vector when the stack is shallower
    /// than `skip_frames`.
    fn capture(&self, skip_frames: usize) -> Vec<Frame>;
}
