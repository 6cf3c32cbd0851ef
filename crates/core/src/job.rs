//! Backend job types tracked by the registry.
//!
//! A [`Job`] is a unit of asynchronous backend work (a mosh render or a
//! format conversion) identified by an opaque id. Status strings on the
//! wire map onto the closed [`JobStatus`] enum; anything outside the
//! four known states is rejected at the deserialization boundary.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Lifecycle state of a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change state again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Output container format for artifact conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    Mp4,
    Webm,
}

impl ConvertFormat {
    /// File extension without the dot, as used in backend filenames.
    pub fn extension(self) -> &'static str {
        match self {
            ConvertFormat::Mp4 => "mp4",
            ConvertFormat::Webm => "webm",
        }
    }

    /// Parse a format token (`"mp4"` / `"webm"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mp4" => Some(ConvertFormat::Mp4),
            "webm" => Some(ConvertFormat::Webm),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConvertFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Links a conversion job back to the artifact it converts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTarget {
    /// Id of the mosh artifact being converted.
    pub artifact_id: String,
    /// Requested output format.
    pub format: ConvertFormat,
}

/// Effect parameters attached to a mosh generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoshParams {
    pub intensity: f64,
    #[serde(default)]
    pub iframe_removal: bool,
    #[serde(default)]
    pub pframe_duplication: bool,
    #[serde(default)]
    pub duplication_count: u32,
}

impl Default for MoshParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            iframe_removal: false,
            pframe_duplication: false,
            duplication_count: 0,
        }
    }
}

/// A tracked backend job, session-scoped and in-memory only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Completion fraction in `[0.0, 1.0]`.
    pub progress: f64,
    /// Output file path, reported by batch recovery updates.
    pub output_path: Option<String>,
    /// Present when this job converts an existing artifact instead of
    /// producing a new one.
    pub conversion: Option<ConversionTarget>,
}

impl Job {
    /// A freshly registered generation job: queued, zero progress.
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0.0,
            output_path: None,
            conversion: None,
        }
    }

    /// A freshly registered conversion job tied to a parent artifact.
    pub fn new_conversion(
        id: impl Into<JobId>,
        artifact_id: impl Into<String>,
        format: ConvertFormat,
    ) -> Self {
        Self {
            conversion: Some(ConversionTarget {
                artifact_id: artifact_id.into(),
                format,
            }),
            ..Self::new(id)
        }
    }

    pub fn is_conversion(&self) -> bool {
        self.conversion.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_snake_case() {
        let s: JobStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(s, JobStatus::Processing);
        assert_eq!(serde_json::to_string(&JobStatus::Queued).unwrap(), "\"queued\"");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let r: Result<JobStatus, _> = serde_json::from_str("\"paused\"");
        assert!(r.is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn convert_format_tokens() {
        assert_eq!(ConvertFormat::parse("mp4"), Some(ConvertFormat::Mp4));
        assert_eq!(ConvertFormat::parse("webm"), Some(ConvertFormat::Webm));
        assert_eq!(ConvertFormat::parse("avi"), None);
        assert_eq!(ConvertFormat::Webm.extension(), "webm");
    }

    #[test]
    fn new_job_is_queued_at_zero() {
        let job = Job::new("single_1");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(!job.is_conversion());
    }

    #[test]
    fn conversion_job_carries_target() {
        let job = Job::new_conversion("convert_x_mp4_1", "single_9", ConvertFormat::Mp4);
        let target = job.conversion.as_ref().unwrap();
        assert_eq!(target.artifact_id, "single_9");
        assert_eq!(target.format, ConvertFormat::Mp4);
        assert!(job.is_conversion());
    }
}
