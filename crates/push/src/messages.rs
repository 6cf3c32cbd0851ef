//! Push message types and parser.
//!
//! The backend sends JSON messages over WebSocket with the shape
//! `{"type": "<kind>", "data": ...}`. This module deserializes them
//! into a strongly-typed [`PushMessage`] enum.

use serde::Deserialize;

use remosh_core::job::JobStatus;

/// All known push message types.
///
/// Deserialized via the internally-tagged `"type"` field with
/// associated `"data"` content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushMessage {
    /// Progress for a single tracked job.
    #[serde(rename = "single-update")]
    SingleUpdate(JobUpdate),

    /// Full state of every job the backend knows about. Sent after
    /// batch submissions and used to recover missed single updates.
    #[serde(rename = "batch-update")]
    BatchUpdate(Vec<BatchEntry>),
}

/// Payload for `single-update` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct JobUpdate {
    pub job_id: String,
    pub status: JobStatus,
    /// Completion fraction in `[0.0, 1.0]` (clamped by the registry).
    pub progress: f64,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// One job in a `batch-update` message.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub id: String,
    pub status: JobStatus,
    pub progress: f64,
    #[serde(default)]
    pub output_path: Option<String>,
}

/// Parse a push WebSocket text frame into a typed enum.
///
/// Returns `Err` for malformed JSON, unknown `type` values, or status
/// strings outside the known lifecycle. Callers should log and skip.
pub fn parse_message(text: &str) -> Result<PushMessage, serde_json::Error> {
    serde_json::from_str(text)
}
