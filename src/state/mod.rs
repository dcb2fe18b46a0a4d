mod types;

pub use types::*;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast;
use transcodr_common::{JobId, VideoCodec};

const EVENT_CAPACITY: usize = 1024;

/// A status change of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub job_id: JobId,
    /// `None` when the job was just created.
    pub from: Option<JobStatus>,
    pub to: JobStatus,
}

/// Event published by the job table and the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A job was created or moved to a new status.
    StatusChanged {
        job_id: JobId,
        from: Option<JobStatus>,
        to: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An encode process was started for one target of a job.
    EncodeStarted {
        job_id: JobId,
        variant: VideoCodec,
        destination: PathBuf,
    },
    /// An encode process for one target of a job ended.
    EncodeFinished {
        job_id: JobId,
        variant: VideoCodec,
        destination: PathBuf,
        outcome: EncodeOutcome,
        /// Raw engine output on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostic: Option<String>,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::StatusChanged { job_id, .. }
            | JobEvent::EncodeStarted { job_id, .. }
            | JobEvent::EncodeFinished { job_id, .. } => *job_id,
        }
    }

    /// Create a StatusChanged event.
    pub fn status_changed(
        job_id: JobId,
        from: Option<JobStatus>,
        to: JobStatus,
        error: Option<String>,
    ) -> Self {
        JobEvent::StatusChanged {
            job_id,
            from,
            to,
            error,
        }
    }

    /// Create an EncodeStarted event.
    pub fn encode_started(job_id: JobId, variant: VideoCodec, destination: PathBuf) -> Self {
        JobEvent::EncodeStarted {
            job_id,
            variant,
            destination,
        }
    }

    /// Create an EncodeFinished event.
    pub fn encode_finished(
        job_id: JobId,
        variant: VideoCodec,
        destination: PathBuf,
        outcome: EncodeOutcome,
        diagnostic: Option<String>,
    ) -> Self {
        JobEvent::EncodeFinished {
            job_id,
            variant,
            destination,
            outcome,
            diagnostic,
        }
    }

    /// The status change carried by this event, if it is one.
    pub fn as_status_change(&self) -> Option<StatusChange> {
        match self {
            JobEvent::StatusChanged {
                job_id, from, to, ..
            } => Some(StatusChange {
                job_id: *job_id,
                from: *from,
                to: *to,
            }),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Jobs {
    by_id: HashMap<JobId, Job>,
    /// Submission order.
    order: Vec<JobId>,
}

/// The job table: every job's current status, plus the event channel that
/// announces changes to it.
///
/// All status changes go through [`JobTable::transition`], which checks them
/// against the lifecycle and publishes the event while still holding the
/// write lock. Subscribers therefore see each job's changes in order, and a
/// status never moves backwards.
pub struct JobTable {
    jobs: RwLock<Jobs>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobTable {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: RwLock::new(Jobs::default()),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all subscribers.
    pub fn broadcast(&self, event: JobEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No subscribers for job event");
        }
    }

    /// Add a new job and announce its initial status.
    pub fn insert(&self, job: Job) -> JobId {
        let id = job.id;
        let event = JobEvent::status_changed(id, None, job.status, job.error.clone());

        let mut jobs = self.jobs.write();
        jobs.order.push(id);
        jobs.by_id.insert(id, job);
        self.broadcast(event);
        id
    }

    /// Move a job to `to`.
    ///
    /// Returns the previous status, or `None` if the job is unknown or the
    /// lifecycle does not allow the change. Rejected changes leave the job
    /// untouched and publish nothing.
    pub fn transition(
        &self,
        id: JobId,
        to: JobStatus,
        error: Option<String>,
    ) -> Option<JobStatus> {
        let mut jobs = self.jobs.write();
        let job = jobs.by_id.get_mut(&id)?;
        let from = job.status;
        if !from.can_transition_to(to) {
            tracing::trace!("Ignoring {} -> {} for job {}", from, to, id.short());
            return None;
        }

        job.set_status(to, error.clone());
        self.broadcast(JobEvent::status_changed(id, Some(from), to, error));
        Some(from)
    }

    /// Record that a queued job was handed to the pool.
    ///
    /// Returns false if the job is no longer queued or was already dispatched.
    pub fn mark_dispatched(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.by_id.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued && job.dispatched_at.is_none() => {
                job.dispatched_at = Some(chrono::Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Cancel a job that has not started running. Returns false otherwise.
    pub fn cancel_queued(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.by_id.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.set_status(JobStatus::Cancelled, None);
                self.broadcast(JobEvent::status_changed(
                    id,
                    Some(JobStatus::Queued),
                    JobStatus::Cancelled,
                    None,
                ));
                true
            }
            _ => false,
        }
    }

    /// Move a job to Running when its first encode starts.
    ///
    /// Succeeds if the job is queued or already running, so every sibling
    /// of a fan-out job can call it. Returns false once the job has ended.
    pub fn mark_running(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.by_id.get_mut(&id) else {
            return false;
        };
        match job.status {
            JobStatus::Running => true,
            JobStatus::Queued => {
                job.set_status(JobStatus::Running, None);
                self.broadcast(JobEvent::status_changed(
                    id,
                    Some(JobStatus::Queued),
                    JobStatus::Running,
                    None,
                ));
                true
            }
            _ => false,
        }
    }

    /// Get a job by ID.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().by_id.get(&id).cloned()
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.read().by_id.get(&id).map(|job| job.status)
    }

    /// All jobs in submission order.
    pub fn jobs(&self) -> Vec<Job> {
        let jobs = self.jobs.read();
        jobs.order
            .iter()
            .filter_map(|id| jobs.by_id.get(id))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> JobSummary {
        self.jobs.read().by_id.values().collect()
    }

    /// Whether any dispatched job has not finished yet.
    pub fn has_active(&self) -> bool {
        self.jobs.read().by_id.values().any(Job::is_active)
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}
