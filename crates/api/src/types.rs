//! Request and response bodies for the backend HTTP API.
//!
//! Responses arrive wrapped in small JSON envelopes (`{"project": ...}`,
//! `{"frames": [...], "timeline_dir": ...}`); the envelope structs live
//! here so the client methods can return the useful payload directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use remosh_core::history::Session;
use remosh_core::job::{ConvertFormat, JobStatus, MoshParams};
use remosh_core::project::{Clip, Project, Scene, TimelineFrame, VideoInfo};
use remosh_core::selection::FrameRange;

// ---- requests ----

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// Body for `POST /api/projects/{id}/mosh`.
#[derive(Debug, Clone, Serialize)]
pub struct MoshRequest {
    /// Path of the AVI to mosh (original, converted, or a clip).
    pub input_path: String,
    /// Effect name (e.g. `"datamosh"`, `"glitch"`).
    pub effect: String,
    /// Effect strength; ignored for batch submissions, which use the
    /// backend's per-effect presets.
    pub intensity: f64,
    /// When true the backend queues one job per preset.
    pub batch: bool,
}

/// Body for `POST /api/projects/{id}/timeline`.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineRequest {
    /// Sample every N frames. The backend falls back to 30 when zero.
    pub interval: u32,
    /// Sample key frames instead of a fixed interval.
    pub keyframes_only: bool,
}

/// Body for `POST /api/projects/{id}/scenes`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectScenesRequest {
    pub input_path: String,
    pub threshold: f64,
    /// Use the multi-pass detector instead of threshold cuts.
    pub advanced: bool,
}

/// Body for `POST /api/projects/{id}/clip`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateClipRequest {
    pub frame_range: FrameRange,
    /// Defaults to `clip_{start}_{end}.avi` on the backend when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
}

/// Body for `POST /api/projects/{id}/convert-mosh/{filename}`.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertMoshRequest {
    pub format: ConvertFormat,
}

// ---- responses ----

#[derive(Debug, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectEnvelope {
    pub project: Project,
}

/// Full project state returned by `GET /api/projects/{id}`.
#[derive(Debug, Deserialize)]
pub struct ProjectDetail {
    pub project: Project,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
    pub info: VideoInfo,
    pub project: Project,
}

#[derive(Debug, Deserialize)]
pub struct ConvertResponse {
    pub output_path: String,
    pub project: Project,
}

/// Response to a mosh submission. Single submissions carry `mosh_id`,
/// batch submissions `mosh_ids`; both carry the new session id.
#[derive(Debug, Deserialize)]
pub struct MoshResponse {
    pub session_id: String,
    #[serde(default)]
    pub mosh_id: Option<String>,
    #[serde(default)]
    pub mosh_ids: Option<Vec<String>>,
}

impl MoshResponse {
    /// All job ids minted by the submission, regardless of shape.
    pub fn job_ids(&self) -> Vec<String> {
        match (&self.mosh_id, &self.mosh_ids) {
            (Some(id), _) => vec![id.clone()],
            (None, Some(ids)) => ids.clone(),
            (None, None) => Vec::new(),
        }
    }
}

/// One entry of `GET /api/projects/{id}/moshes`: the backend's
/// authoritative record of a generation job, carrying the parameters
/// it actually ran with (batch variations each get their own).
#[derive(Debug, Clone, Deserialize)]
pub struct MoshJob {
    pub id: String,
    #[serde(default)]
    pub input_path: Option<String>,
    pub effect: String,
    #[serde(default)]
    pub params: MoshParams,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub converted_files: BTreeMap<ConvertFormat, bool>,
}

#[derive(Debug, Deserialize)]
pub struct MoshListResponse {
    pub moshes: Vec<MoshJob>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineResponse {
    pub frames: Vec<TimelineFrame>,
    pub timeline_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ScenesResponse {
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClipResponse {
    pub output_path: String,
    pub clip_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertMoshResponse {
    pub output_file: String,
    pub output_path: String,
    pub format: ConvertFormat,
    /// Id under which conversion progress is pushed over the channel.
    pub conversion_id: String,
}

/// Response to `GET .../converted-files/{sessionId}/{moshId}`.
#[derive(Debug, Deserialize)]
pub struct ConvertedFilesResponse {
    pub mosh_id: String,
    pub session_id: String,
    /// Availability per format; always carries both known formats.
    pub converted_files: BTreeMap<ConvertFormat, bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteClipResponse {
    pub deleted_clip_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMoshResponse {
    pub session_id: String,
    pub mosh_id: String,
    #[serde(default)]
    pub deleted_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MigrateResponse {
    pub message: String,
    #[serde(default)]
    pub migrated_projects: Vec<String>,
}
