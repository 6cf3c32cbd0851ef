//! User-facing operations on the engine.
//!
//! Every action validates against the workspace first, performs the
//! backend call, then updates the workspace and notifies subscribers.
//! Precondition failures (no project, empty selection, duplicate
//! conversion) are caught before any request leaves the process.

use chrono::Utc;

use remosh_api::types::{
    CreateClipRequest, DetectScenesRequest, MoshRequest, TimelineRequest, UploadResponse,
};
use remosh_api::ApiError;
use remosh_core::job::{ConvertFormat, MoshParams};
use remosh_core::project::{Project, Scene};

use crate::driver::Engine;
use crate::events::UiEvent;
use crate::workspace::ActiveSession;

/// Why an action could not be performed.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The action needs an open project.
    #[error("No project is open")]
    NoProject,

    /// The project has no uploaded video yet.
    #[error("Project has no video")]
    NoVideo,

    /// Moshing needs an AVI input; the original is unconverted.
    #[error("Project has no moshable video (convert it first)")]
    NoMoshableVideo,

    /// The timeline selection is empty.
    #[error("Nothing is selected on the timeline")]
    EmptySelection,

    /// The resource was recovered from disk and lacks a server id, so
    /// it cannot be addressed remotely.
    #[error("\"{0}\" has no server-assigned id")]
    MissingRemoteId(String),

    /// The referenced artifact is not in the history.
    #[error("Unknown artifact {0}")]
    UnknownArtifact(String),

    /// The same artifact/format conversion is already running.
    #[error("A {format} conversion of {artifact_id} is already running")]
    ConversionInFlight {
        artifact_id: String,
        format: ConvertFormat,
    },

    /// The referenced clip is not part of the open project.
    #[error("Unknown clip {0}")]
    UnknownClip(String),

    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Engine {
    // ---- projects ----

    /// `list_projects` passthrough; does not touch the workspace.
    pub async fn list_projects(&self) -> Result<Vec<Project>, ActionError> {
        Ok(self.api.list_projects().await?)
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, ActionError> {
        Ok(self.api.create_project(name).await?)
    }

    /// Open a project: full pull, then replace all workspace state.
    pub async fn open_project(
        self: &std::sync::Arc<Self>,
        project_id: &str,
    ) -> Result<(), ActionError> {
        let detail = self.api.get_project(project_id).await?;
        {
            let mut ws = self.state.lock().await;
            ws.open(detail);
        }
        self.invalidate_settle();
        self.publish(UiEvent::ProjectChanged);
        self.publish(UiEvent::HistoryChanged);
        Ok(())
    }

    /// Ask the backend to rescan the project directory, then reload.
    pub async fn scan_project(self: &std::sync::Arc<Self>) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        self.api.scan_project(&project_id).await?;
        self.reload_project().await;
        Ok(())
    }

    /// Fold legacy pre-project uploads into projects.
    pub async fn migrate_legacy(&self) -> Result<Vec<String>, ActionError> {
        let resp = self.api.migrate_legacy().await?;
        Ok(resp.migrated_projects)
    }

    // ---- media ----

    pub async fn upload_video(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ActionError> {
        let project_id = self.require_project().await?;
        let resp = self.api.upload_video(&project_id, file_name, bytes).await?;
        {
            let mut ws = self.state.lock().await;
            ws.project = Some(resp.project.clone());
            ws.video_info = Some(resp.info.clone());
        }
        self.publish(UiEvent::ProjectChanged);
        Ok(resp)
    }

    /// Convert the original into the moshable AVI container.
    pub async fn convert_video(&self) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        let resp = self.api.convert_video(&project_id).await?;
        {
            let mut ws = self.state.lock().await;
            ws.project = Some(resp.project);
        }
        self.publish(UiEvent::ProjectChanged);
        Ok(())
    }

    // ---- timeline / scenes / clips ----

    pub async fn generate_timeline(
        &self,
        interval: u32,
        keyframes_only: bool,
    ) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        let resp = self
            .api
            .generate_timeline(
                &project_id,
                &TimelineRequest {
                    interval,
                    keyframes_only,
                },
            )
            .await?;
        {
            let mut ws = self.state.lock().await;
            ws.set_timeline(resp.frames);
        }
        self.publish(UiEvent::ProjectChanged);
        Ok(())
    }

    pub async fn detect_scenes(
        &self,
        threshold: f64,
        advanced: bool,
    ) -> Result<Vec<Scene>, ActionError> {
        let (project_id, input_path) = {
            let ws = self.state.lock().await;
            let project = ws.project.as_ref().ok_or(ActionError::NoProject)?;
            let input = project
                .original_file
                .clone()
                .or_else(|| project.converted_file.clone())
                .ok_or(ActionError::NoVideo)?;
            (project.id.clone(), input)
        };

        let scenes = self
            .api
            .detect_scenes(
                &project_id,
                &DetectScenesRequest {
                    input_path,
                    threshold,
                    advanced,
                },
            )
            .await?;
        {
            let mut ws = self.state.lock().await;
            ws.set_scenes(scenes.clone());
        }
        self.publish(UiEvent::ProjectChanged);
        Ok(scenes)
    }

    /// Extract the selected frame range as a clip.
    pub async fn create_clip_from_selection(
        self: &std::sync::Arc<Self>,
        output_name: Option<String>,
    ) -> Result<String, ActionError> {
        let (project_id, frame_range) = {
            let ws = self.state.lock().await;
            let project = ws.project.as_ref().ok_or(ActionError::NoProject)?;
            if project.original_file.is_none() {
                return Err(ActionError::NoVideo);
            }
            let range = ws.selection.frame_range().ok_or(ActionError::EmptySelection)?;
            (project.id.clone(), range)
        };

        let resp = self
            .api
            .create_clip(
                &project_id,
                &CreateClipRequest {
                    frame_range,
                    output_name,
                },
            )
            .await?;

        // Clip metadata is minted server-side; reload to pick it up.
        self.reload_project().await;
        Ok(resp.clip_name)
    }

    pub async fn delete_clip(self: &std::sync::Arc<Self>, clip_id: &str) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        {
            let ws = self.state.lock().await;
            let clip = ws
                .clips
                .iter()
                .find(|c| c.id.as_deref() == Some(clip_id) || c.name == clip_id)
                .ok_or_else(|| ActionError::UnknownClip(clip_id.to_string()))?;
            if clip.id.is_none() {
                return Err(ActionError::MissingRemoteId(clip.name.clone()));
            }
        }

        self.api.delete_clip(&project_id, clip_id).await?;
        self.reload_project().await;
        Ok(())
    }

    // ---- moshing ----

    /// Submit a generation action over the project video or a clip.
    ///
    /// Clears the registry (job sets are not cumulative), registers
    /// the minted ids as queued, and remembers the session so that
    /// completions can be attributed to it. Returns the job ids.
    pub async fn generate_mosh(
        self: &std::sync::Arc<Self>,
        effect: &str,
        intensity: f64,
        batch: bool,
        clip_id: Option<&str>,
    ) -> Result<Vec<String>, ActionError> {
        let (project_id, input_path, source) = {
            let ws = self.state.lock().await;
            let project = ws.project.as_ref().ok_or(ActionError::NoProject)?;

            match clip_id {
                Some(id) => {
                    let clip = ws
                        .clips
                        .iter()
                        .find(|c| c.id.as_deref() == Some(id) || c.name == id)
                        .ok_or_else(|| ActionError::UnknownClip(id.to_string()))?;
                    (
                        project.id.clone(),
                        clip.file_path.clone(),
                        ws.source_for_clip(Some(clip)),
                    )
                }
                None => {
                    let input = project
                        .moshable_path()
                        .ok_or(ActionError::NoMoshableVideo)?
                        .to_string();
                    (project.id.clone(), input, ws.source_for_clip(None))
                }
            }
        };

        let resp = self
            .api
            .generate_mosh(
                &project_id,
                &MoshRequest {
                    input_path,
                    effect: effect.to_string(),
                    intensity,
                    batch,
                },
            )
            .await?;

        let job_ids = resp.job_ids();
        {
            let mut ws = self.state.lock().await;
            ws.registry.clear_all();
            for id in &job_ids {
                ws.registry.register(id.clone());
            }
            ws.active_session = Some(ActiveSession {
                id: resp.session_id.clone(),
                source,
                effect: effect.to_string(),
                params: MoshParams {
                    intensity,
                    ..MoshParams::default()
                },
                started_at: Utc::now(),
            });
        }
        self.invalidate_settle();
        self.publish(UiEvent::JobsChanged);

        tracing::info!(
            session_id = %resp.session_id,
            jobs = job_ids.len(),
            effect,
            batch,
            "Mosh submitted",
        );
        Ok(job_ids)
    }

    /// Convert a finished artifact to a playable format.
    ///
    /// Progress arrives over the push channel under the returned
    /// conversion job id; the HTTP call itself blocks until the
    /// backend finishes, so availability is rechecked on return as
    /// well in case the channel is down.
    pub async fn convert_artifact(
        self: &std::sync::Arc<Self>,
        artifact_id: &str,
        format: ConvertFormat,
    ) -> Result<String, ActionError> {
        let (project_id, filename) = {
            let ws = self.state.lock().await;
            let project = ws.project.as_ref().ok_or(ActionError::NoProject)?;
            if ws.conversions.is_active(artifact_id, format) {
                return Err(ActionError::ConversionInFlight {
                    artifact_id: artifact_id.to_string(),
                    format,
                });
            }
            let artifact = ws
                .history
                .find_artifact(artifact_id)
                .ok_or_else(|| ActionError::UnknownArtifact(artifact_id.to_string()))?;
            let filename = artifact
                .file_path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&artifact.file_path)
                .to_string();
            (project.id.clone(), filename)
        };

        // Track eagerly so concurrent clicks are rejected while the
        // request is in flight.
        let placeholder = format!("pending_{artifact_id}_{format}");
        {
            let mut ws = self.state.lock().await;
            ws.conversions.begin(artifact_id, format, &placeholder);
        }

        let result = self.api.convert_mosh(&project_id, &filename, format).await;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                let mut ws = self.state.lock().await;
                ws.conversions.finish(artifact_id, format);
                return Err(e.into());
            }
        };

        {
            let mut ws = self.state.lock().await;
            ws.registry
                .register_conversion(resp.conversion_id.clone(), artifact_id, format);
            if let Some(conv) = ws.conversions.get(artifact_id, format) {
                if conv.job_id == placeholder {
                    ws.conversions.finish(artifact_id, format);
                    ws.conversions.begin(artifact_id, format, resp.conversion_id.clone());
                }
            }
        }
        self.publish(UiEvent::JobsChanged);

        // The synchronous response means the conversion is done even
        // if the push channel missed it.
        self.recheck_converted(artifact_id.to_string(), format, true).await;
        Ok(resp.conversion_id)
    }

    /// Delete one artifact and its derived files.
    pub async fn delete_artifact(
        self: &std::sync::Arc<Self>,
        artifact_id: &str,
    ) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        let session_id = {
            let ws = self.state.lock().await;
            ws.session_of_artifact(artifact_id)
                .map(str::to_string)
                .ok_or_else(|| ActionError::UnknownArtifact(artifact_id.to_string()))?
        };

        self.api
            .delete_mosh(&project_id, &session_id, artifact_id)
            .await?;
        // History is never pruned locally; the reload re-reads session
        // metadata so the workspace cannot drift from the backend.
        self.reload_project().await;
        Ok(())
    }

    /// Delete a whole session and everything in it.
    pub async fn delete_session(
        self: &std::sync::Arc<Self>,
        session_id: &str,
    ) -> Result<(), ActionError> {
        let project_id = self.require_project().await?;
        self.api.delete_session(&project_id, session_id).await?;
        {
            let mut ws = self.state.lock().await;
            if ws
                .active_session
                .as_ref()
                .is_some_and(|s| s.id == session_id)
            {
                ws.active_session = None;
            }
        }
        self.reload_project().await;
        Ok(())
    }

    // ---- helpers ----

    async fn require_project(&self) -> Result<String, ActionError> {
        let ws = self.state.lock().await;
        ws.project_id()
            .map(str::to_string)
            .ok_or(ActionError::NoProject)
    }
}
