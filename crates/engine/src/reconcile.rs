//! Pure reconciliation of push messages into the job registry.
//!
//! [`reconcile`] applies one message to the registry and returns the
//! effects the driver must execute (pulls, rechecks, notifications).
//! It performs no I/O, so every ordering and edge case is testable
//! without a backend: feeding the same messages in any interleaving
//! converges on the same registry state.

use remosh_core::job::{ConvertFormat, JobStatus};
use remosh_core::naming;
use remosh_core::registry::JobRegistry;
use remosh_push::messages::PushMessage;

/// Side effects requested by a reconciliation step, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Registry contents changed; refresh any progress display.
    RefreshJobs,

    /// At least one generation job just completed. Pushed payloads are
    /// lossy hints, so the driver pulls the backend's job listing and
    /// records the completed entries that belong to the registry.
    PullArtifacts,

    /// Every generation job is now terminal. Advisory: the driver
    /// waits a settle delay and re-checks before announcing, since a
    /// recovery batch may still be in flight.
    BatchFinished,

    /// Progress for a tracked conversion job.
    ConversionProgress {
        artifact_id: String,
        format: ConvertFormat,
        progress: f64,
    },

    /// A conversion reached a terminal state; recheck which converted
    /// files actually exist before surfacing availability.
    ConversionFinished {
        artifact_id: String,
        format: ConvertFormat,
        succeeded: bool,
    },
}

/// Fold one push message into the registry.
pub fn reconcile(registry: &mut JobRegistry, msg: &PushMessage) -> Vec<Effect> {
    match msg {
        PushMessage::SingleUpdate(update) => reconcile_single(
            registry,
            &update.job_id,
            update.status,
            update.progress,
            update.output_path.clone(),
        ),
        PushMessage::BatchUpdate(entries) => {
            if entries.is_empty() {
                return Vec::new();
            }

            let mut newly_completed = false;
            for entry in entries {
                let prev = registry.get(&entry.id).map(|j| j.status);
                registry.upsert(&entry.id, entry.status, entry.progress, entry.output_path.clone());
                newly_completed |=
                    entry.status == JobStatus::Completed && prev != Some(JobStatus::Completed);
            }

            let mut effects = vec![Effect::RefreshJobs];
            if newly_completed {
                effects.push(Effect::PullArtifacts);
            }
            if registry.all_generation_terminal() {
                effects.push(Effect::BatchFinished);
            }
            effects
        }
    }
}

fn reconcile_single(
    registry: &mut JobRegistry,
    job_id: &str,
    status: JobStatus,
    progress: f64,
    output_path: Option<String>,
) -> Vec<Effect> {
    // Conversion jobs are registered with their target attached; their
    // updates drive the conversion sub-tracker rather than batch logic.
    if let Some(target) = registry.get(job_id).and_then(|j| j.conversion.clone()) {
        registry.apply_update(job_id, status, progress, output_path);

        let mut effects = vec![
            Effect::RefreshJobs,
            Effect::ConversionProgress {
                artifact_id: target.artifact_id.clone(),
                format: target.format,
                progress: progress.clamp(0.0, 1.0),
            },
        ];
        if status.is_terminal() {
            effects.push(Effect::ConversionFinished {
                artifact_id: target.artifact_id,
                format: target.format,
                succeeded: status == JobStatus::Completed,
            });
        }
        return effects;
    }

    let prev = registry.get(job_id).map(|j| j.status);
    if !registry.apply_update(job_id, status, progress, output_path) {
        // A conversion update can arrive before the synchronous convert
        // request returns the id to register. The id itself names the
        // parent artifact and format, so route it without registering.
        if let Some((filename, format)) = naming::parse_conversion_job_id(job_id) {
            if let Some(artifact_id) = naming::artifact_id_from_filename(filename) {
                let mut effects = vec![Effect::ConversionProgress {
                    artifact_id: artifact_id.to_string(),
                    format,
                    progress: progress.clamp(0.0, 1.0),
                }];
                if status.is_terminal() {
                    effects.push(Effect::ConversionFinished {
                        artifact_id: artifact_id.to_string(),
                        format,
                        succeeded: status == JobStatus::Completed,
                    });
                }
                return effects;
            }
        }
        // Stale or foreign id. Single updates never grow the table;
        // recovery happens through batch updates.
        tracing::debug!(job_id, "Ignoring update for unknown job");
        return Vec::new();
    }

    let mut effects = vec![Effect::RefreshJobs];
    if status == JobStatus::Completed && prev != Some(JobStatus::Completed) {
        effects.push(Effect::PullArtifacts);
    }
    if registry.all_generation_terminal() {
        effects.push(Effect::BatchFinished);
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use remosh_push::messages::{BatchEntry, JobUpdate};

    fn single(job_id: &str, status: JobStatus, progress: f64) -> PushMessage {
        PushMessage::SingleUpdate(JobUpdate {
            job_id: job_id.to_string(),
            status,
            progress,
            output_path: None,
        })
    }

    fn batch(entries: Vec<(&str, JobStatus, f64, Option<&str>)>) -> PushMessage {
        PushMessage::BatchUpdate(
            entries
                .into_iter()
                .map(|(id, status, progress, path)| BatchEntry {
                    id: id.to_string(),
                    status,
                    progress,
                    output_path: path.map(String::from),
                })
                .collect(),
        )
    }

    // -- single updates ------------------------------------------------------

    #[test]
    fn progress_update_refreshes_jobs() {
        let mut reg = JobRegistry::new();
        reg.register("single_1");

        let effects = reconcile(&mut reg, &single("single_1", JobStatus::Processing, 0.4));
        assert_eq!(effects, vec![Effect::RefreshJobs]);
        assert_eq!(reg.get("single_1").unwrap().progress, 0.4);
    }

    #[test]
    fn unknown_job_id_is_ignored_without_effects() {
        let mut reg = JobRegistry::new();
        reg.register("single_1");

        let effects = reconcile(&mut reg, &single("ghost", JobStatus::Completed, 1.0));
        assert!(effects.is_empty());
        assert_eq!(reg.len(), 1);
        assert!(!reg.contains("ghost"));
    }

    #[test]
    fn completion_triggers_artifact_pull_and_finishes_batch() {
        let mut reg = JobRegistry::new();
        reg.register("single_1");

        let effects = reconcile(&mut reg, &single("single_1", JobStatus::Completed, 1.0));
        assert_eq!(
            effects,
            vec![
                Effect::RefreshJobs,
                Effect::PullArtifacts,
                Effect::BatchFinished,
            ]
        );
    }

    #[test]
    fn repeated_completion_does_not_pull_twice() {
        let mut reg = JobRegistry::new();
        reg.register("single_1");
        reconcile(&mut reg, &single("single_1", JobStatus::Completed, 1.0));

        let effects = reconcile(&mut reg, &single("single_1", JobStatus::Completed, 1.0));
        assert!(!effects.contains(&Effect::PullArtifacts));
    }

    #[test]
    fn batch_not_finished_while_jobs_remain() {
        let mut reg = JobRegistry::new();
        reg.register("batch_0");
        reg.register("batch_1");

        let effects = reconcile(&mut reg, &single("batch_0", JobStatus::Completed, 1.0));
        assert!(effects.contains(&Effect::PullArtifacts));
        assert!(!effects.contains(&Effect::BatchFinished));

        let effects = reconcile(&mut reg, &single("batch_1", JobStatus::Failed, 0.0));
        assert!(effects.contains(&Effect::BatchFinished));
    }

    // -- batch updates -------------------------------------------------------

    #[test]
    fn batch_update_inserts_unknown_jobs() {
        let mut reg = JobRegistry::new();
        reg.register("batch_0");

        let effects = reconcile(
            &mut reg,
            &batch(vec![
                ("batch_0", JobStatus::Processing, 0.6, None),
                ("batch_1", JobStatus::Queued, 0.0, None),
            ]),
        );
        assert_eq!(effects, vec![Effect::RefreshJobs]);
        assert!(reg.contains("batch_1"));
    }

    #[test]
    fn batch_update_pulls_once_for_newly_completed_jobs() {
        let mut reg = JobRegistry::new();
        reg.register("batch_0");
        reg.register("batch_1");
        reconcile(&mut reg, &single("batch_0", JobStatus::Completed, 1.0));

        // batch_0 is already recorded; batch_1 flips to completed.
        let effects = reconcile(
            &mut reg,
            &batch(vec![
                ("batch_0", JobStatus::Completed, 1.0, Some("moshed_batch_0.avi")),
                ("batch_1", JobStatus::Completed, 1.0, Some("moshed_batch_1.avi")),
            ]),
        );
        assert_eq!(
            effects,
            vec![
                Effect::RefreshJobs,
                Effect::PullArtifacts,
                Effect::BatchFinished,
            ]
        );

        // Replaying the same batch changes nothing worth pulling for.
        let effects = reconcile(
            &mut reg,
            &batch(vec![
                ("batch_0", JobStatus::Completed, 1.0, Some("moshed_batch_0.avi")),
                ("batch_1", JobStatus::Completed, 1.0, Some("moshed_batch_1.avi")),
            ]),
        );
        assert!(!effects.contains(&Effect::PullArtifacts));
    }

    #[test]
    fn empty_batch_update_has_no_effects() {
        let mut reg = JobRegistry::new();
        reg.register("batch_0");
        let effects = reconcile(&mut reg, &batch(vec![]));
        assert!(effects.is_empty());
    }

    // -- conversions ---------------------------------------------------------

    #[test]
    fn conversion_update_drives_the_sub_tracker() {
        let mut reg = JobRegistry::new();
        reg.register_conversion("convert_moshed_single_1.avi_mp4_9", "single_1", ConvertFormat::Mp4);

        let effects = reconcile(
            &mut reg,
            &single("convert_moshed_single_1.avi_mp4_9", JobStatus::Processing, 0.3),
        );
        assert_matches!(
            effects.as_slice(),
            [
                Effect::RefreshJobs,
                Effect::ConversionProgress { artifact_id, format: ConvertFormat::Mp4, progress },
            ] if artifact_id == "single_1" && *progress == 0.3
        );
    }

    #[test]
    fn conversion_completion_triggers_recheck() {
        let mut reg = JobRegistry::new();
        reg.register_conversion("convert_x_webm_9", "batch_2", ConvertFormat::Webm);

        let effects = reconcile(&mut reg, &single("convert_x_webm_9", JobStatus::Completed, 1.0));
        assert!(effects.contains(&Effect::ConversionFinished {
            artifact_id: "batch_2".into(),
            format: ConvertFormat::Webm,
            succeeded: true,
        }));
    }

    #[test]
    fn conversion_failure_is_surfaced_as_unsuccessful() {
        let mut reg = JobRegistry::new();
        reg.register_conversion("convert_x_mp4_9", "batch_2", ConvertFormat::Mp4);

        let effects = reconcile(&mut reg, &single("convert_x_mp4_9", JobStatus::Failed, 0.0));
        assert!(effects.contains(&Effect::ConversionFinished {
            artifact_id: "batch_2".into(),
            format: ConvertFormat::Mp4,
            succeeded: false,
        }));
    }

    #[test]
    fn unregistered_conversion_id_is_routed_by_its_name() {
        let mut reg = JobRegistry::new();
        reg.register("batch_0");

        // The update lands before the convert response returned the id.
        let effects = reconcile(
            &mut reg,
            &single("convert_moshed_batch_0.avi_mp4_1749018199", JobStatus::Processing, 0.5),
        );
        assert_eq!(
            effects,
            vec![Effect::ConversionProgress {
                artifact_id: "batch_0".into(),
                format: ConvertFormat::Mp4,
                progress: 0.5,
            }]
        );
        // The table never grows from single updates.
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn pending_conversion_does_not_delay_batch_finish() {
        let mut reg = JobRegistry::new();
        reg.register("single_1");
        reg.register_conversion("convert_x_mp4_9", "older_artifact", ConvertFormat::Mp4);

        let effects = reconcile(&mut reg, &single("single_1", JobStatus::Completed, 1.0));
        assert!(effects.contains(&Effect::BatchFinished));
    }

    // -- convergence ---------------------------------------------------------

    #[test]
    fn interleavings_converge_on_the_same_state() {
        let updates = [
            single("batch_0", JobStatus::Processing, 0.5),
            single("batch_1", JobStatus::Processing, 0.2),
            single("batch_0", JobStatus::Completed, 1.0),
            single("batch_1", JobStatus::Completed, 1.0),
        ];
        let recovery = batch(vec![
            ("batch_0", JobStatus::Completed, 1.0, Some("moshed_batch_0.avi")),
            ("batch_1", JobStatus::Completed, 1.0, Some("moshed_batch_1.avi")),
        ]);

        // Path A: every single update, then the recovery batch.
        let mut a = JobRegistry::new();
        a.register("batch_0");
        a.register("batch_1");
        for u in &updates {
            reconcile(&mut a, u);
        }
        reconcile(&mut a, &recovery);

        // Path B: miss the singles entirely, recover from the batch.
        let mut b = JobRegistry::new();
        b.register("batch_0");
        b.register("batch_1");
        reconcile(&mut b, &recovery);

        assert_eq!(a.snapshot(), b.snapshot());
        assert!(a.all_generation_terminal());
    }
}
