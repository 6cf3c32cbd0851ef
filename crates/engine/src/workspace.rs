//! Owned state for the open project.
//!
//! One [`ProjectWorkspace`] holds everything the UI renders: project
//! metadata, timeline, scenes, clips, mosh history, the frame
//! selection, the job registry, and the conversion tracker. The driver
//! is the only mutator; views read snapshots and redraw on events.

use chrono::Utc;

use remosh_api::types::{MoshJob, ProjectDetail};
use remosh_core::history::{MoshArtifact, MoshHistory, SessionSource};
use remosh_core::job::{JobStatus, MoshParams};
use remosh_core::naming;
use remosh_core::project::{Clip, Project, Scene, TimelineFrame, VideoInfo};
use remosh_core::registry::JobRegistry;
use remosh_core::selection::Selection;
use remosh_core::types::Timestamp;

use crate::conversions::ConversionTracker;

/// The generation action whose jobs are currently tracked.
///
/// Set when a mosh is submitted and kept until the next submission or
/// project switch, so late completions still land in the right
/// session.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Session id minted by the backend for the submission.
    pub id: String,
    pub source: SessionSource,
    pub effect: String,
    pub params: MoshParams,
    pub started_at: Timestamp,
}

/// All client-side state for the open project.
#[derive(Debug, Default)]
pub struct ProjectWorkspace {
    pub project: Option<Project>,
    pub video_info: Option<VideoInfo>,
    pub timeline: Vec<TimelineFrame>,
    pub scenes: Vec<Scene>,
    pub clips: Vec<Clip>,
    pub history: MoshHistory,
    pub selection: Selection,
    pub registry: JobRegistry,
    pub conversions: ConversionTracker,
    pub active_session: Option<ActiveSession>,
}

impl ProjectWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all state from a full backend pull. Session-scoped
    /// trackers (registry, conversions, selection, active session) are
    /// reset; they never survive a project switch.
    pub fn open(&mut self, detail: ProjectDetail) {
        self.project = Some(detail.project);
        self.clips = detail.clips;
        self.scenes = detail.scenes;
        self.history.replace(detail.sessions);
        self.video_info = None;
        self.timeline.clear();
        self.selection.clear();
        self.registry.clear_all();
        self.conversions.clear();
        self.active_session = None;
    }

    /// Refresh project-level collections without touching the
    /// session-scoped trackers. Used when history changes server-side
    /// while jobs are still being tracked.
    pub fn refresh(&mut self, detail: ProjectDetail) {
        self.project = Some(detail.project);
        self.clips = detail.clips;
        self.scenes = detail.scenes;
        self.history.replace(detail.sessions);
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.id.as_str())
    }

    /// Replace the timeline wholesale; selected frames that no longer
    /// exist are dropped from the selection.
    pub fn set_timeline(&mut self, frames: Vec<TimelineFrame>) {
        self.timeline = frames;
        self.selection.retain_frames(&self.timeline);
    }

    pub fn set_scenes(&mut self, scenes: Vec<Scene>) {
        self.scenes = scenes;
    }

    /// Fold the backend's job listing into the history.
    ///
    /// Only completed entries whose id is registered for the current
    /// generation action are recorded; everything else in the listing
    /// (older runs, other clients' jobs) is ignored. Each entry
    /// carries its own effect and parameters, so batch variations keep
    /// the values they actually ran with.
    ///
    /// Returns the ids of newly recorded artifacts, or `None` when no
    /// generation action is active to attribute them to (a full reload
    /// picks them up from session metadata instead).
    pub fn record_completed_pull(&mut self, jobs: &[MoshJob]) -> Option<Vec<String>> {
        let session = self.active_session.clone()?;

        let mut recorded = Vec::new();
        for job in jobs {
            if job.status != JobStatus::Completed || !self.registry.contains(&job.id) {
                continue;
            }
            if self.history.find_artifact(&job.id).is_some() {
                continue;
            }
            self.history.record_artifact(
                &session.id,
                session.started_at,
                session.source.clone(),
                MoshArtifact {
                    id: Some(job.id.clone()),
                    effect: job.effect.clone(),
                    params: job.params.clone(),
                    file_path: naming::artifact_filename(&job.id),
                    created_at: Utc::now(),
                    converted_files: job.converted_files.clone(),
                },
            );
            recorded.push(job.id.clone());
        }
        Some(recorded)
    }

    /// Find the session an artifact belongs to.
    pub fn session_of_artifact(&self, artifact_id: &str) -> Option<&str> {
        self.history
            .sessions()
            .iter()
            .find(|s| {
                s.moshes
                    .iter()
                    .any(|m| m.effective_id() == Some(artifact_id))
            })
            .and_then(|s| s.id.as_deref())
    }

    /// The source a new generation action would mosh, for labeling its
    /// session: a clip when one is the input, else the full video.
    pub fn source_for_clip(&self, clip: Option<&Clip>) -> SessionSource {
        match clip {
            Some(clip) => SessionSource::Clip {
                name: clip.name.clone(),
                start_frame: clip.start_frame,
                end_frame: clip.end_frame,
            },
            None => SessionSource::FullVideo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use remosh_core::job::JobStatus;

    fn detail(project_id: &str) -> ProjectDetail {
        serde_json::from_value(serde_json::json!({
            "project": {
                "id": project_id,
                "name": "demo",
                "original_file": "original_demo.mp4",
                "created_at": "2025-06-04T12:00:00Z",
                "updated_at": "2025-06-04T12:00:00Z"
            },
            "clips": [],
            "sessions": [],
            "scenes": []
        }))
        .unwrap()
    }

    fn active_session(id: &str) -> ActiveSession {
        ActiveSession {
            id: id.to_string(),
            source: SessionSource::FullVideo,
            effect: "datamosh".into(),
            params: MoshParams::default(),
            started_at: Utc.timestamp_opt(1_749_018_199, 0).unwrap(),
        }
    }

    fn pulled(id: &str, status: JobStatus, intensity: f64) -> MoshJob {
        MoshJob {
            id: id.to_string(),
            input_path: Some("in.avi".into()),
            effect: "datamosh".into(),
            params: MoshParams {
                intensity,
                ..MoshParams::default()
            },
            status,
            progress: if status == JobStatus::Completed { 1.0 } else { 0.5 },
            error: None,
            converted_files: Default::default(),
        }
    }

    #[test]
    fn open_resets_session_scoped_state() {
        let mut ws = ProjectWorkspace::new();
        ws.registry.register("single_1");
        ws.conversions
            .begin("a", remosh_core::job::ConvertFormat::Mp4, "convert_x");
        ws.active_session = Some(active_session("session_1"));

        ws.open(detail("p2"));
        assert!(ws.registry.is_empty());
        assert_eq!(ws.conversions.active_count(), 0);
        assert!(ws.active_session.is_none());
        assert_eq!(ws.project_id(), Some("p2"));
    }

    #[test]
    fn timeline_replacement_prunes_selection() {
        let mut ws = ProjectWorkspace::new();
        let frames: Vec<TimelineFrame> = (1..=10)
            .map(|i| TimelineFrame {
                frame_number: i,
                timestamp: i as f64,
                thumbnail_path: format!("frame_{i}.jpg"),
            })
            .collect();
        ws.set_timeline(frames.clone());
        ws.selection.click_frame(&ws.timeline.clone(), &frames[7]);
        assert_eq!(ws.selection.len(), 1);

        ws.set_timeline(frames[..5].to_vec()); // frame 8 disappears
        assert!(ws.selection.is_empty());
    }

    #[test]
    fn pulled_completions_join_the_active_session() {
        let mut ws = ProjectWorkspace::new();
        ws.active_session = Some(active_session("session_1"));
        ws.registry.register("batch_0");
        ws.registry.register("batch_1");

        let first = ws.record_completed_pull(&[pulled("batch_0", JobStatus::Completed, 0.3)]);
        let second = ws.record_completed_pull(&[
            pulled("batch_0", JobStatus::Completed, 0.3),
            pulled("batch_1", JobStatus::Completed, 0.9),
        ]);
        assert_eq!(first, Some(vec!["batch_0".to_string()]));
        assert_eq!(second, Some(vec!["batch_1".to_string()]));
        assert_eq!(ws.history.sessions().len(), 1);
        assert_eq!(ws.history.sessions()[0].moshes.len(), 2);
        assert_eq!(ws.session_of_artifact("batch_1"), Some("session_1"));
    }

    #[test]
    fn pull_without_active_session_is_skipped() {
        let mut ws = ProjectWorkspace::new();
        ws.registry.register("single_1");
        let recorded = ws.record_completed_pull(&[pulled("single_1", JobStatus::Completed, 0.7)]);
        assert_eq!(recorded, None);
        assert!(ws.history.is_empty());
    }

    #[test]
    fn pull_is_filtered_to_registered_completed_jobs() {
        let mut ws = ProjectWorkspace::new();
        ws.active_session = Some(active_session("session_1"));
        ws.registry.register("batch_0");

        let recorded = ws.record_completed_pull(&[
            pulled("batch_0", JobStatus::Completed, 0.3),
            // Still running.
            pulled("batch_1", JobStatus::Processing, 0.9),
            // Completed but from an older run; not in the registry.
            pulled("single_1700000000", JobStatus::Completed, 0.5),
        ]);
        assert_eq!(recorded, Some(vec!["batch_0".to_string()]));

        // The recorded artifact keeps the parameters it ran with.
        let artifact = ws.history.find_artifact("batch_0").unwrap();
        assert_eq!(artifact.params.intensity, 0.3);
        assert_eq!(artifact.file_path, "moshed_batch_0.avi");
    }

    #[test]
    fn partial_batch_completion_records_only_the_finished_artifact() {
        use crate::reconcile::{reconcile, Effect};
        use remosh_push::messages::{JobUpdate, PushMessage};

        let mut ws = ProjectWorkspace::new();
        ws.open(detail("p1"));
        ws.active_session = Some(active_session("session_1"));
        ws.registry.register("batch_0");
        ws.registry.register("batch_1");

        let effects = reconcile(
            &mut ws.registry,
            &PushMessage::SingleUpdate(JobUpdate {
                job_id: "batch_0".into(),
                status: JobStatus::Completed,
                progress: 1.0,
                output_path: Some("moshed_batch_0.avi".into()),
            }),
        );
        assert!(effects.contains(&Effect::PullArtifacts));

        // The listing the pull would return at this point.
        ws.record_completed_pull(&[
            pulled("batch_0", JobStatus::Completed, 0.3),
            pulled("batch_1", JobStatus::Processing, 0.9),
        ]);

        let sessions = ws.history.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id.as_deref(), Some("session_1"));
        let ids: Vec<_> = sessions[0].moshes.iter().map(|m| m.effective_id()).collect();
        assert_eq!(ids, vec![Some("batch_0")]);
        assert!(!ws.registry.all_generation_terminal());
    }

    #[test]
    fn registry_and_workspace_compose_for_a_full_run() {
        let mut ws = ProjectWorkspace::new();
        ws.open(detail("p1"));
        ws.active_session = Some(active_session("session_1"));
        ws.registry.register("single_1");
        ws.registry
            .apply_update("single_1", JobStatus::Completed, 1.0, None);
        assert!(ws.registry.all_generation_terminal());

        let recorded = ws.record_completed_pull(&[pulled("single_1", JobStatus::Completed, 0.7)]);
        assert_eq!(recorded, Some(vec!["single_1".to_string()]));
        assert!(!ws.history.is_empty());
    }
}
