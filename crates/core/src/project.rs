//! Project, media, timeline, and clip models.
//!
//! These mirror the JSON bodies exchanged with the backend. All of them
//! are rebuilt wholesale from a full project pull; nothing here is
//! cached across project switches.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A backend project: one source video plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub original_file: Option<String>,
    #[serde(default)]
    pub converted_file: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Path usable as mosh input: the normalized conversion if present,
    /// else the original when it is already in the moshable container.
    pub fn moshable_path(&self) -> Option<&str> {
        if let Some(converted) = self.converted_file.as_deref() {
            return Some(converted);
        }
        self.original_file
            .as_deref()
            .filter(|p| p.to_lowercase().ends_with(".avi"))
    }
}

/// Media info reported by the backend after an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub bitrate: u64,
}

/// One sampled timeline position with its thumbnail.
///
/// Frame numbers are unique within a timeline and timestamps are
/// monotonic non-decreasing with frame number. The full sequence is
/// replaced wholesale whenever a new timeline is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineFrame {
    pub frame_number: u32,
    pub timestamp: f64,
    pub thumbnail_path: String,
}

/// A detected scene, referenced (never owned) by the selection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
    /// Classification label (e.g. `"action"`, `"static"`).
    #[serde(rename = "type")]
    pub kind: String,
}

/// An extracted clip owned by the current project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Server-assigned identifier. Clips recovered from disk scans may
    /// lack one; those cannot be deleted through the remote path.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub file_path: String,
    pub start_frame: u32,
    pub end_frame: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub created_at: Timestamp,
}
