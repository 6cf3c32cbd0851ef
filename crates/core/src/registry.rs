//! In-memory job registry.
//!
//! The registry is the single source of truth for "what is running /
//! done / failed" in the current UI session. It is a plain value type:
//! the engine layer owns one per active project and is the only
//! mutator, so no locking is needed. Display-refresh notifications are
//! emitted by the caller after mutating calls, not by the registry.

use crate::job::{ConvertFormat, Job, JobStatus};
use crate::types::JobId;

/// Insertion-ordered table of job id → job state.
///
/// Iteration and [`snapshot`](JobRegistry::snapshot) preserve
/// registration order so that repeated display refreshes are stable.
#[derive(Debug, Default, Clone)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generation job as queued with zero progress.
    ///
    /// Idempotent: re-registering a known id leaves the existing entry
    /// untouched. Returns `true` if a new entry was created.
    pub fn register(&mut self, job_id: impl Into<JobId>) -> bool {
        let job_id = job_id.into();
        if self.contains(&job_id) {
            return false;
        }
        self.jobs.push(Job::new(job_id));
        true
    }

    /// Register a conversion job tagged with its parent artifact and
    /// target format. Idempotent like [`register`](Self::register).
    pub fn register_conversion(
        &mut self,
        job_id: impl Into<JobId>,
        artifact_id: impl Into<String>,
        format: ConvertFormat,
    ) -> bool {
        let job_id = job_id.into();
        if self.contains(&job_id) {
            return false;
        }
        self.jobs.push(Job::new_conversion(job_id, artifact_id, format));
        true
    }

    /// Apply a push update to a job that is already registered.
    ///
    /// A no-op for unknown ids: stale messages from a previous session
    /// must not grow the table. Returns `true` if an entry was mutated.
    pub fn apply_update(
        &mut self,
        job_id: &str,
        status: JobStatus,
        progress: f64,
        output_path: Option<String>,
    ) -> bool {
        match self.jobs.iter_mut().find(|j| j.id == job_id) {
            Some(job) => {
                job.status = status;
                job.progress = progress.clamp(0.0, 1.0);
                if output_path.is_some() {
                    job.output_path = output_path;
                }
                true
            }
            None => false,
        }
    }

    /// Upsert a job from a batch recovery update.
    ///
    /// Unlike [`apply_update`](Self::apply_update) this inserts unknown
    /// ids: a full job list from the backend is the recovery path for
    /// updates missed during a disconnect.
    pub fn upsert(
        &mut self,
        job_id: &str,
        status: JobStatus,
        progress: f64,
        output_path: Option<String>,
    ) {
        if !self.apply_update(job_id, status, progress, output_path.clone()) {
            let mut job = Job::new(job_id);
            job.status = status;
            job.progress = progress.clamp(0.0, 1.0);
            job.output_path = output_path;
            self.jobs.push(job);
        }
    }

    /// Wipe the table. Called when a new batch of jobs is submitted:
    /// a session's job set is not cumulative across generation actions.
    pub fn clear_all(&mut self) {
        self.jobs.clear();
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.iter().any(|j| j.id == job_id)
    }

    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Registration-ordered view for display.
    pub fn snapshot(&self) -> &[Job] {
        &self.jobs
    }

    /// Ids of all registered jobs, in registration order.
    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id.clone()).collect()
    }

    /// True when every registered non-conversion job is completed or
    /// failed. An empty registry (or one holding only conversions) is
    /// not "finished", since there was nothing to finish.
    pub fn all_generation_terminal(&self) -> bool {
        let mut saw_generation = false;
        for job in self.jobs.iter().filter(|j| !j.is_conversion()) {
            saw_generation = true;
            if !job.status.is_terminal() {
                return false;
            }
        }
        saw_generation
    }
}
