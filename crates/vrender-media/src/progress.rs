//! Render progress reporting.

use serde::{Deserialize, Serialize};

/// A progress update from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderProgress {
    /// Completed fraction in `[0, 1]`
    pub fraction: f64,
    /// Whole percent, rounded down
    pub percent: u8,
    /// Set only on the 100% event
    pub is_final: bool,
}

impl RenderProgress {
    /// Build from a raw fraction, clamping into `[0, 1]`.
    pub fn from_fraction(fraction: f64) -> Self {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let percent = (fraction * 100.0).floor() as u8;
        Self {
            fraction,
            percent,
            is_final: percent >= 100,
        }
    }

    /// Build from a `done / total` frame count.
    pub fn from_frames(done: u64, total: u64) -> Self {
        if total == 0 {
            return Self::default();
        }
        Self::from_fraction(done as f64 / total as f64)
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync + 'static>;

/// Filters raw updates down to a strictly increasing percentage.
///
/// Renderers report several phases (frames rendered, frames encoded) that
/// can move the raw fraction backwards; consumers only ever see the
/// percentage grow, and see the final event exactly once.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_percent: Option<u8>,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the update if it should be forwarded.
    pub fn observe(&mut self, progress: RenderProgress) -> Option<RenderProgress> {
        if self.finished {
            return None;
        }
        if self.last_percent.is_some_and(|last| progress.percent <= last) {
            return None;
        }
        self.last_percent = Some(progress.percent);
        self.finished = progress.is_final;
        Some(progress)
    }

    /// Emit the closing 100% event if the renderer never reported it.
    pub fn finish(&mut self) -> Option<RenderProgress> {
        self.observe(RenderProgress::from_fraction(1.0))
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }
}
