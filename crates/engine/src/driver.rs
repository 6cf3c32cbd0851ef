//! Engine driver: owns the workspace and executes effects.
//!
//! The driver consumes [`ChannelEvent`]s from the push channel task,
//! folds messages into the registry via the pure reconciliation step,
//! and executes the returned effects: history bookkeeping, backend
//! pulls, and UI notifications. It is the single mutator of the
//! [`ProjectWorkspace`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use remosh_api::BackendClient;
use remosh_core::job::ConvertFormat;
use remosh_push::channel::ChannelEvent;
use remosh_push::messages::PushMessage;

use crate::events::{EventBus, UiEvent};
use crate::reconcile::{reconcile, Effect};
use crate::workspace::ProjectWorkspace;

/// How long to wait after the last job turns terminal before declaring
/// the batch finished. A recovery batch right behind the final single
/// update must not produce two announcements.
const BATCH_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Deferred work that needs the lock released or an API round trip.
enum Followup {
    ScheduleSettle,
    PullArtifacts,
    RecheckConverted {
        artifact_id: String,
        format: ConvertFormat,
        succeeded: bool,
    },
}

/// Shared engine handle. Cheap to clone into UI tasks via `Arc`.
pub struct Engine {
    pub(crate) api: Arc<BackendClient>,
    pub(crate) state: Mutex<ProjectWorkspace>,
    events: EventBus,
    cancel: CancellationToken,
    /// Bumped on every settle request; a timer only fires if it is
    /// still the latest one.
    settle_epoch: AtomicU64,
}

impl Engine {
    pub fn new(api: BackendClient, events: EventBus, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            api: Arc::new(api),
            state: Mutex::new(ProjectWorkspace::new()),
            events,
            cancel,
            settle_epoch: AtomicU64::new(0),
        })
    }

    /// Subscribe to engine notifications.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: UiEvent) {
        self.events.publish(event);
    }

    /// Read the workspace under the lock.
    pub async fn with_state<R>(&self, f: impl FnOnce(&ProjectWorkspace) -> R) -> R {
        let ws = self.state.lock().await;
        f(&ws)
    }

    /// Consume push channel events until cancelled or the channel
    /// closes.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<ChannelEvent>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Engine loop cancelled");
                    return;
                }
                event = rx.recv() => match event {
                    Some(ChannelEvent::Connected) => self.handle_connected().await,
                    Some(ChannelEvent::Disconnected) => {
                        self.events.publish(UiEvent::ConnectionChanged { connected: false });
                    }
                    Some(ChannelEvent::Message(msg)) => self.handle_message(msg).await,
                    None => {
                        tracing::info!("Push channel closed, stopping engine loop");
                        return;
                    }
                }
            }
        }
    }

    /// A (re)connection recovers whatever was missed: reload the open
    /// project so history and clips match the backend again. Job-level
    /// recovery rides on the batch update the backend pushes next.
    async fn handle_connected(self: &Arc<Self>) {
        self.events.publish(UiEvent::ConnectionChanged { connected: true });
        self.reload_project().await;
    }

    pub(crate) async fn handle_message(self: &Arc<Self>, msg: PushMessage) {
        let mut followups = Vec::new();
        {
            let mut ws = self.state.lock().await;
            let effects = reconcile(&mut ws.registry, &msg);
            for effect in effects {
                match effect {
                    Effect::RefreshJobs => {
                        self.events.publish(UiEvent::JobsChanged);
                    }
                    Effect::PullArtifacts => followups.push(Followup::PullArtifacts),
                    Effect::BatchFinished => followups.push(Followup::ScheduleSettle),
                    Effect::ConversionProgress {
                        artifact_id,
                        format,
                        progress,
                    } => {
                        ws.conversions.update_progress(&artifact_id, format, progress);
                        self.events.publish(UiEvent::ConversionProgress {
                            artifact_id,
                            format,
                            progress,
                        });
                    }
                    Effect::ConversionFinished {
                        artifact_id,
                        format,
                        succeeded,
                    } => {
                        ws.conversions.finish(&artifact_id, format);
                        followups.push(Followup::RecheckConverted {
                            artifact_id,
                            format,
                            succeeded,
                        });
                    }
                }
            }
        }

        for followup in followups {
            match followup {
                Followup::ScheduleSettle => self.schedule_settle_check(),
                Followup::PullArtifacts => self.pull_artifacts().await,
                Followup::RecheckConverted {
                    artifact_id,
                    format,
                    succeeded,
                } => self.recheck_converted(artifact_id, format, succeeded).await,
            }
        }
    }

    /// Announce [`UiEvent::BatchFinished`] once the registry has been
    /// stably terminal for the settle delay. Later settle requests and
    /// new submissions supersede pending timers.
    pub(crate) fn schedule_settle_check(self: &Arc<Self>) {
        let epoch = self.settle_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let engine = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                _ = engine.cancel.cancelled() => return,
                _ = tokio::time::sleep(BATCH_SETTLE_DELAY) => {}
            }
            if engine.settle_epoch.load(Ordering::SeqCst) != epoch {
                return; // superseded
            }
            let still_done = {
                let ws = engine.state.lock().await;
                ws.registry.all_generation_terminal()
            };
            if still_done {
                tracing::info!("Generation batch finished");
                engine.events.publish(UiEvent::BatchFinished);
            }
        });
    }

    /// Invalidate any pending settle timer. Called when a new
    /// generation action starts.
    pub(crate) fn invalidate_settle(&self) {
        self.settle_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Pull the backend's job listing and record completed entries.
    ///
    /// The listing, not the pushed payload, is the artifact authority;
    /// entries are filtered to the registry so older runs in the same
    /// listing are ignored.
    pub(crate) async fn pull_artifacts(self: &Arc<Self>) {
        let project_id = {
            let ws = self.state.lock().await;
            match ws.project_id() {
                Some(id) => id.to_string(),
                None => return,
            }
        };

        match self.api.list_moshes(&project_id).await {
            Ok(jobs) => {
                let recorded = {
                    let mut ws = self.state.lock().await;
                    ws.record_completed_pull(&jobs)
                };
                match recorded {
                    Some(ids) if !ids.is_empty() => {
                        tracing::info!(count = ids.len(), "Artifacts recorded from job listing");
                        self.events.publish(UiEvent::HistoryChanged);
                    }
                    Some(_) => {}
                    // No active session to attribute artifacts to; the
                    // backend's session metadata has them, so reload.
                    None => self.reload_project().await,
                }
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "Job listing pull failed");
            }
        }
    }

    /// Pull the open project's full state and refresh the workspace.
    pub(crate) async fn reload_project(self: &Arc<Self>) {
        let project_id = {
            let ws = self.state.lock().await;
            match ws.project_id() {
                Some(id) => id.to_string(),
                None => return,
            }
        };

        match self.api.get_project(&project_id).await {
            Ok(detail) => {
                if self.apply_project_pull(&project_id, detail).await {
                    self.events.publish(UiEvent::ProjectChanged);
                    self.events.publish(UiEvent::HistoryChanged);
                }
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "Project reload failed");
            }
        }
    }

    /// Apply a pulled project detail, unless the workspace has moved to
    /// a different project while the request was in flight. Late
    /// responses for a closed project are discarded.
    pub(crate) async fn apply_project_pull(
        &self,
        requested_id: &str,
        detail: remosh_api::types::ProjectDetail,
    ) -> bool {
        let mut ws = self.state.lock().await;
        if ws.project_id() != Some(requested_id) {
            tracing::debug!(requested_id, "Discarding stale project pull");
            return false;
        }
        ws.refresh(detail);
        true
    }

    /// Ask the backend which converted files actually exist for an
    /// artifact, then surface the result. Filesystem truth beats the
    /// pushed completion status.
    pub(crate) async fn recheck_converted(
        self: &Arc<Self>,
        artifact_id: String,
        format: ConvertFormat,
        succeeded: bool,
    ) {
        let located = {
            let ws = self.state.lock().await;
            ws.project_id().map(str::to_string).zip(
                ws.session_of_artifact(&artifact_id)
                    .map(str::to_string),
            )
        };

        if let Some((project_id, session_id)) = located {
            match self
                .api
                .converted_files(&project_id, &session_id, &artifact_id)
                .await
            {
                Ok(resp) => {
                    let mut ws = self.state.lock().await;
                    for (fmt, exists) in resp.converted_files {
                        ws.history.set_converted(&artifact_id, fmt, exists);
                    }
                    self.events.publish(UiEvent::HistoryChanged);
                }
                Err(e) => {
                    tracing::warn!(
                        %artifact_id,
                        error = %e,
                        "Converted-files recheck failed",
                    );
                }
            }
        }

        self.events.publish(UiEvent::ConversionFinished {
            artifact_id,
            format,
            succeeded,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use remosh_core::job::JobStatus;
    use remosh_push::messages::JobUpdate;

    fn test_engine() -> Arc<Engine> {
        Engine::new(
            BackendClient::new("http://localhost:9".into()),
            EventBus::new(),
            CancellationToken::new(),
        )
    }

    fn update(job_id: &str, status: JobStatus, progress: f64) -> PushMessage {
        PushMessage::SingleUpdate(JobUpdate {
            job_id: job_id.to_string(),
            status,
            progress,
            output_path: None,
        })
    }

    async fn drain_until_batch_finished(
        rx: &mut tokio::sync::broadcast::Receiver<UiEvent>,
    ) -> bool {
        while let Ok(event) = rx.try_recv() {
            if matches!(event, UiEvent::BatchFinished) {
                return true;
            }
        }
        false
    }

    #[tokio::test]
    async fn progress_message_publishes_jobs_changed() {
        let engine = test_engine();
        let mut rx = engine.subscribe();
        {
            let mut ws = engine.state.lock().await;
            ws.registry.register("single_1");
        }

        engine
            .handle_message(update("single_1", JobStatus::Processing, 0.5))
            .await;
        assert_matches!(rx.recv().await, Ok(UiEvent::JobsChanged));
    }

    #[tokio::test]
    async fn unknown_job_produces_no_events() {
        let engine = test_engine();
        let mut rx = engine.subscribe();

        engine
            .handle_message(update("ghost", JobStatus::Processing, 0.5))
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_finished_fires_after_settle_delay() {
        let engine = test_engine();
        let mut rx = engine.subscribe();
        {
            let mut ws = engine.state.lock().await;
            ws.registry.register("single_1");
        }

        engine
            .handle_message(update("single_1", JobStatus::Completed, 1.0))
            .await;

        // Nothing yet: the settle timer is still pending.
        assert!(!drain_until_batch_finished(&mut rx).await);

        tokio::time::sleep(BATCH_SETTLE_DELAY * 2).await;
        assert!(drain_until_batch_finished(&mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn new_submission_supersedes_pending_settle() {
        let engine = test_engine();
        let mut rx = engine.subscribe();
        {
            let mut ws = engine.state.lock().await;
            ws.registry.register("single_1");
        }

        engine
            .handle_message(update("single_1", JobStatus::Completed, 1.0))
            .await;

        // A fresh generation action resets the registry and bumps the
        // settle epoch before the timer fires.
        {
            let mut ws = engine.state.lock().await;
            ws.registry.clear_all();
            ws.registry.register("single_2");
        }
        engine.invalidate_settle();

        tokio::time::sleep(BATCH_SETTLE_DELAY * 2).await;
        assert!(!drain_until_batch_finished(&mut rx).await);
    }

    fn detail(project_id: &str) -> remosh_api::types::ProjectDetail {
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

    #[tokio::test]
    async fn stale_project_pull_is_discarded() {
        let engine = test_engine();
        {
            let mut ws = engine.state.lock().await;
            ws.open(detail("p2"));
        }

        // A reload requested for p1 lands after the switch to p2.
        assert!(!engine.apply_project_pull("p1", detail("p1")).await);
        assert_eq!(
            engine.with_state(|ws| ws.project_id().map(str::to_string)).await,
            Some("p2".to_string())
        );

        assert!(engine.apply_project_pull("p2", detail("p2")).await);
    }

    #[tokio::test]
    async fn project_pull_needs_an_open_project() {
        let engine = test_engine();
        assert!(!engine.apply_project_pull("p1", detail("p1")).await);
    }

    #[tokio::test]
    async fn conversion_progress_updates_the_tracker() {
        let engine = test_engine();
        {
            let mut ws = engine.state.lock().await;
            ws.registry
                .register_conversion("convert_x_mp4_9", "single_1", ConvertFormat::Mp4);
            ws.conversions
                .begin("single_1", ConvertFormat::Mp4, "convert_x_mp4_9");
        }

        engine
            .handle_message(update("convert_x_mp4_9", JobStatus::Processing, 0.7))
            .await;

        let progress = engine
            .with_state(|ws| ws.conversions.get("single_1", ConvertFormat::Mp4).map(|c| c.progress))
            .await;
        assert_eq!(progress, Some(0.7));
    }
}
