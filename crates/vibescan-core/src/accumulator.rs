//! Temporal expression accumulator.
//!
//! Sums each visible face's expression vector over a fixed window of frames.
//! Faces are attributed by position only, so any change in the number of
//! faces throws the partial window away and starts over.

use crate::types::{Detection, ExpressionVector};

/// Frames averaged before a score is produced.
pub const DEFAULT_WINDOW_FRAMES: usize = 30;

/// Outcome of feeding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationStatus {
    /// Window still open; `frames` samples collected so far.
    Accumulating { frames: usize },
    /// Window closed. Read [`Accumulator::take_averages`] now.
    Complete,
}

/// Per-face running sums over one window.
#[derive(Debug, Clone)]
pub struct Accumulator {
    window: usize,
    slots: Vec<ExpressionVector>,
    frames: usize,
}

impl Accumulator {
    /// Create an accumulator closing after `window` frames (at least one).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            slots: Vec::new(),
            frames: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Frames collected in the current window.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of faces being tracked in the current window.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Add one frame's detections.
    pub fn accumulate(&mut self, detections: &[Detection]) -> AccumulationStatus {
        if self.frames >= self.window {
            // A closed window that was never read is stale.
            self.clear();
        }

        if self.slots.len() != detections.len() {
            if self.frames > 0 {
                tracing::debug!(
                    previous = self.slots.len(),
                    current = detections.len(),
                    discarded_frames = self.frames,
                    "face count changed; restarting window"
                );
            }
            self.slots = vec![ExpressionVector::default(); detections.len()];
            self.frames = 0;
        }

        for (slot, det) in self.slots.iter_mut().zip(detections) {
            *slot += det.expressions;
        }
        self.frames += 1;

        if self.frames >= self.window {
            AccumulationStatus::Complete
        } else {
            AccumulationStatus::Accumulating { frames: self.frames }
        }
    }

    /// Per-slot time averages. Clears the accumulator.
    ///
    /// Returns an empty list if no frame has been accumulated.
    pub fn take_averages(&mut self) -> Vec<ExpressionVector> {
        let frames = self.frames;
        let slots = std::mem::take(&mut self.slots);
        self.frames = 0;

        if frames == 0 {
            return Vec::new();
        }
        slots.into_iter().map(|sum| sum / frames as f64).collect()
    }

    /// Discard all partial sums.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.frames = 0;
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_FRAMES)
    }
}
