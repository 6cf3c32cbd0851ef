//! Conversion sub-tracker.
//!
//! Tracks in-flight artifact conversions keyed by `(artifact, format)`
//! so the UI can render per-format progress and the engine can refuse
//! a duplicate submission while one is already running. Conversions of
//! the same artifact to different formats are independent.

use std::collections::HashMap;

use remosh_core::job::ConvertFormat;

/// One in-flight conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveConversion {
    /// Backend job id progress arrives under.
    pub job_id: String,
    /// Last reported completion fraction.
    pub progress: f64,
}

/// In-flight conversions for the open project.
#[derive(Debug, Default)]
pub struct ConversionTracker {
    active: HashMap<(String, ConvertFormat), ActiveConversion>,
}

impl ConversionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a conversion. Returns `false` without replacing
    /// anything when the same artifact/format pair is already running.
    pub fn begin(
        &mut self,
        artifact_id: impl Into<String>,
        format: ConvertFormat,
        job_id: impl Into<String>,
    ) -> bool {
        let key = (artifact_id.into(), format);
        if self.active.contains_key(&key) {
            return false;
        }
        self.active.insert(
            key,
            ActiveConversion {
                job_id: job_id.into(),
                progress: 0.0,
            },
        );
        true
    }

    /// Record progress; a no-op for untracked pairs.
    pub fn update_progress(&mut self, artifact_id: &str, format: ConvertFormat, progress: f64) {
        if let Some(conv) = self.active.get_mut(&(artifact_id.to_string(), format)) {
            conv.progress = progress.clamp(0.0, 1.0);
        }
    }

    /// Stop tracking a conversion, returning its final state.
    pub fn finish(&mut self, artifact_id: &str, format: ConvertFormat) -> Option<ActiveConversion> {
        self.active.remove(&(artifact_id.to_string(), format))
    }

    pub fn is_active(&self, artifact_id: &str, format: ConvertFormat) -> bool {
        self.active.contains_key(&(artifact_id.to_string(), format))
    }

    pub fn get(&self, artifact_id: &str, format: ConvertFormat) -> Option<&ActiveConversion> {
        self.active.get(&(artifact_id.to_string(), format))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Drop everything. Called when the project is switched.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}
