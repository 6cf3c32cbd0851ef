//! Mosh history: sessions and the artifacts they produced.
//!
//! A session groups the artifacts of one generation action over one
//! source (the full video or a clip). History is ordered most recent
//! first and rebuilt from the backend on project load; between pulls it
//! is maintained incrementally as jobs complete.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::job::{ConvertFormat, MoshParams};
use crate::naming;
use crate::types::Timestamp;

/// A completed mosh output file plus its conversion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoshArtifact {
    /// Server-assigned id. Unreliable for historical entries; the id
    /// encoded in [`file_path`](Self::file_path) is authoritative when
    /// it parses.
    #[serde(default)]
    pub id: Option<String>,
    /// Effect name (e.g. `"classic"`, `"bloom"`).
    pub effect: String,
    #[serde(default)]
    pub params: MoshParams,
    pub file_path: String,
    pub created_at: Timestamp,
    /// Known conversion availability per format. Absent entries mean
    /// "never checked", `false` means checked and missing.
    #[serde(default)]
    pub converted_files: BTreeMap<ConvertFormat, bool>,
}

impl MoshArtifact {
    /// The id history is keyed by: the id parsed from the storage
    /// filename when it parses, else the stored id field. Stored ids
    /// on entries reconstructed from disk scans can be wrong, so the
    /// filename wins.
    pub fn effective_id(&self) -> Option<&str> {
        naming::artifact_id_from_filename(&self.file_path).or(self.id.as_deref())
    }

    pub fn is_converted_to(&self, format: ConvertFormat) -> bool {
        self.converted_files.get(&format).copied().unwrap_or(false)
    }
}

/// What a session moshed: the whole source video or an extracted clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionSource {
    FullVideo,
    Clip {
        name: String,
        start_frame: u32,
        end_frame: u32,
    },
}

impl SessionSource {
    /// Display label: `"Full Video"` or `"{name} (frames {s}-{e})"`.
    pub fn label(&self) -> String {
        match self {
            SessionSource::FullVideo => "Full Video".to_string(),
            SessionSource::Clip {
                name,
                start_frame,
                end_frame,
            } => format!("{name} (frames {start_frame}-{end_frame})"),
        }
    }

    /// Parse a label produced by [`label`](Self::label).
    pub fn parse_label(label: &str) -> Option<Self> {
        if label == "Full Video" {
            return Some(SessionSource::FullVideo);
        }
        let rest = label.strip_suffix(')')?;
        let (name, frames) = rest.rsplit_once(" (frames ")?;
        let (start, end) = frames.split_once('-')?;
        Some(SessionSource::Clip {
            name: name.to_string(),
            start_frame: start.parse().ok()?,
            end_frame: end.parse().ok()?,
        })
    }
}

/// One generation action's worth of artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned id (`session_{unix}`); sessions reconstructed
    /// from disk scans may lack one.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: Timestamp,
    pub source: SessionSource,
    #[serde(default)]
    pub moshes: Vec<MoshArtifact>,
}

impl Session {
    pub fn new(id: impl Into<String>, created_at: Timestamp, source: SessionSource) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            created_at,
            source,
            moshes: Vec::new(),
        }
    }

    /// The id history is keyed by: the server id when present, else
    /// `session_{unix}` derived from the creation timestamp. Pure, so
    /// scanned sessions resolve to the same id on every load.
    pub fn effective_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => naming::session_id_from_timestamp(self.created_at.timestamp()),
        }
    }

    fn holds_artifact(&self, artifact: &MoshArtifact) -> bool {
        match artifact.effective_id() {
            Some(id) => self
                .moshes
                .iter()
                .any(|m| m.effective_id() == Some(id)),
            None => self.moshes.iter().any(|m| m.file_path == artifact.file_path),
        }
    }
}

/// Project mosh history, most recent session first.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoshHistory {
    sessions: Vec<Session>,
}

impl MoshHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole history from a backend pull, newest first.
    pub fn replace(&mut self, mut sessions: Vec<Session>) {
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.sessions = sessions;
    }

    /// Record a newly completed artifact under its session.
    ///
    /// All completions of one generation action share a session id, so
    /// the first completion creates the session and later ones join it.
    /// An artifact already present (same effective id) is not recorded
    /// twice.
    pub fn record_artifact(
        &mut self,
        session_id: &str,
        created_at: Timestamp,
        source: SessionSource,
        artifact: MoshArtifact,
    ) {
        if let Some(session) = self.session_mut(session_id) {
            if !session.holds_artifact(&artifact) {
                session.moshes.push(artifact);
            }
            return;
        }
        let mut session = Session::new(session_id, created_at, source);
        session.moshes.push(artifact);
        self.sessions.insert(0, session);
    }

    /// Mark whether a converted file exists for an artifact.
    pub fn set_converted(&mut self, artifact_id: &str, format: ConvertFormat, exists: bool) {
        if let Some(artifact) = self.artifact_mut(artifact_id) {
            artifact.converted_files.insert(format, exists);
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn find_artifact(&self, artifact_id: &str) -> Option<&MoshArtifact> {
        self.sessions
            .iter()
            .flat_map(|s| s.moshes.iter())
            .find(|m| m.effective_id() == Some(artifact_id))
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id.as_deref() == Some(session_id))
    }

    fn artifact_mut(&mut self, artifact_id: &str) -> Option<&mut MoshArtifact> {
        self.sessions
            .iter_mut()
            .flat_map(|s| s.moshes.iter_mut())
            .find(|m| m.effective_id() == Some(artifact_id))
    }
}
