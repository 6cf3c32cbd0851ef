//! Timeline selection engine.
//!
//! A selection is always empty, a single frame, or a contiguous run of
//! the *current* timeline sequence. It is recomputed wholesale on every
//! action, never patched: two anchor clicks define an inclusive
//! `[min, max]` frame-number interval (click order is irrelevant), a
//! third click restarts, and a scene click jumps straight to a range
//! regardless of prior state.

use serde::Serialize;

use crate::project::{Scene, TimelineFrame};

/// Inclusive frame interval with its endpoint timestamps, as sent to
/// the clip-creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRange {
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
}

/// The user's current contiguous frame selection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Selection {
    selected: Vec<TimelineFrame>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a click on a single timeline frame.
    ///
    /// `frames` is the current timeline sequence (ordered by frame
    /// number); `clicked` must refer to a frame number within it.
    pub fn click_frame(&mut self, frames: &[TimelineFrame], clicked: &TimelineFrame) {
        match self.selected.len() {
            // empty -> single
            0 => self.selected = vec![clicked.clone()],
            // single -> range: anchors resolve by frame number, not click order
            1 => {
                let anchor = self.selected[0].frame_number;
                let lo = anchor.min(clicked.frame_number);
                let hi = anchor.max(clicked.frame_number);
                self.selected = filter_range(frames, lo, hi);
            }
            // range -> restart as a fresh single selection
            _ => self.selected = vec![clicked.clone()],
        }
    }

    /// Select every frame within a detected scene's boundaries.
    ///
    /// Independent of prior state; any frame-anchor state is discarded.
    pub fn click_scene(&mut self, frames: &[TimelineFrame], scene: &Scene) {
        self.selected = filter_range(frames, scene.start_frame, scene.end_frame);
    }

    /// Return to the empty state.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop selected frames that are no longer part of the current
    /// sequence. Called after the timeline is replaced wholesale.
    pub fn retain_frames(&mut self, frames: &[TimelineFrame]) {
        self.selected
            .retain(|s| frames.iter().any(|f| f.frame_number == s.frame_number));
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn frames(&self) -> &[TimelineFrame] {
        &self.selected
    }

    /// Lowest-numbered selected frame.
    pub fn first(&self) -> Option<&TimelineFrame> {
        self.selected.first()
    }

    /// Highest-numbered selected frame.
    pub fn last(&self) -> Option<&TimelineFrame> {
        self.selected.last()
    }

    /// `(lowest, highest)` selected frame numbers.
    pub fn endpoints(&self) -> Option<(u32, u32)> {
        Some((self.first()?.frame_number, self.last()?.frame_number))
    }

    /// Selected duration in seconds. Non-negative because timestamps
    /// are monotonic non-decreasing with frame number.
    pub fn duration(&self) -> Option<f64> {
        Some(self.last()?.timestamp - self.first()?.timestamp)
    }

    /// The selection as a clip request range.
    pub fn frame_range(&self) -> Option<FrameRange> {
        let first = self.first()?;
        let last = self.last()?;
        Some(FrameRange {
            start_frame: first.frame_number,
            end_frame: last.frame_number,
            start_time: first.timestamp,
            end_time: last.timestamp,
        })
    }
}

/// All frames of `frames` whose number lies in `[lo, hi]`, in sequence
/// order. Source order re-sorts the result implicitly.
fn filter_range(frames: &[TimelineFrame], lo: u32, hi: u32) -> Vec<TimelineFrame> {
    frames
        .iter()
        .filter(|f| f.frame_number >= lo && f.frame_number <= hi)
        .cloned()
        .collect()
}
