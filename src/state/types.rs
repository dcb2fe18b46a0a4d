use crate::conversion::JobSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use transcodr_common::JobId;

/// Lifecycle of a job.
///
/// ```text
/// Queued -> Running -> Succeeded | FailedEncode | Cancelled
/// Queued -> Cancelled
/// (submit) -> SkippedNotAVideo | FailedProbe | FailedFilesystem
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    FailedProbe,
    FailedEncode,
    SkippedNotAVideo,
    Cancelled,
    /// The destination directory could not be created.
    FailedFilesystem,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Queued | Self::Running)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::FailedProbe | Self::FailedEncode | Self::FailedFilesystem
        )
    }

    /// Whether a job in this status may move to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Succeeded)
                | (Running, FailedEncode)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::FailedProbe => "failed_probe",
            Self::FailedEncode => "failed_encode",
            Self::SkippedNotAVideo => "skipped_not_a_video",
            Self::Cancelled => "cancelled",
            Self::FailedFilesystem => "failed_filesystem",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as recorded in the job table. Readers get clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    pub status: JobStatus,
    /// Files the job writes, one per target codec. Empty if never planned.
    pub outputs: Vec<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When `start` handed the job to the pool.
    pub dispatched_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(spec: JobSpec, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            spec,
            status,
            outputs: Vec::new(),
            error: None,
            created_at: now,
            dispatched_at: None,
            started_at: None,
            finished_at: status.is_terminal().then_some(now),
        }
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Apply a status change. Callers validate the transition first.
    pub(crate) fn set_status(&mut self, status: JobStatus, error: Option<String>) {
        let now = Utc::now();
        self.status = status;
        if status == JobStatus::Running {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.finished_at = Some(now);
        }
        if error.is_some() {
            self.error = error;
        }
    }

    /// Handed to the pool and not finished yet.
    pub fn is_active(&self) -> bool {
        self.dispatched_at.is_some() && !self.status.is_terminal()
    }
}

/// Per-status job counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed_probe: usize,
    pub failed_encode: usize,
    pub failed_filesystem: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl JobSummary {
    pub fn record(&mut self, status: JobStatus) {
        let slot = match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::Succeeded => &mut self.succeeded,
            JobStatus::FailedProbe => &mut self.failed_probe,
            JobStatus::FailedEncode => &mut self.failed_encode,
            JobStatus::FailedFilesystem => &mut self.failed_filesystem,
            JobStatus::SkippedNotAVideo => &mut self.skipped,
            JobStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.finished()
    }

    pub fn finished(&self) -> usize {
        self.succeeded + self.failures() + self.skipped + self.cancelled
    }

    pub fn failures(&self) -> usize {
        self.failed_probe + self.failed_encode + self.failed_filesystem
    }
}

impl<'a> FromIterator<&'a Job> for JobSummary {
    fn from_iter<I: IntoIterator<Item = &'a Job>>(jobs: I) -> Self {
        let mut summary = Self::default();
        for job in jobs {
            summary.record(job.status);
        }
        summary
    }
}

/// How a single encode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::TranscodeOptions;

    const ALL: [JobStatus; 8] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::FailedProbe,
        JobStatus::FailedEncode,
        JobStatus::SkippedNotAVideo,
        JobStatus::Cancelled,
        JobStatus::FailedFilesystem,
    ];

    fn spec() -> JobSpec {
        JobSpec::new("/in/a.mp4", "/out/a.mp4", &TranscodeOptions::default())
    }

    #[test]
    fn test_terminal_statuses_never_move() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_running_is_only_reached_from_queued() {
        for from in ALL {
            assert_eq!(
                from.can_transition_to(JobStatus::Running),
                from == JobStatus::Queued
            );
        }
    }

    #[test]
    fn test_submit_outcomes_are_not_transitions() {
        for to in [
            JobStatus::SkippedNotAVideo,
            JobStatus::FailedProbe,
            JobStatus::FailedFilesystem,
        ] {
            assert!(!JobStatus::Queued.can_transition_to(to));
            assert!(!JobStatus::Running.can_transition_to(to));
        }
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Succeeded));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::SkippedNotAVideo).unwrap();
        assert_eq!(json, "\"skipped_not_a_video\"");
        assert_eq!(JobStatus::FailedEncode.to_string(), "failed_encode");
    }

    #[test]
    fn test_job_timestamps() {
        let mut job = Job::new(spec(), JobStatus::Queued);
        assert!(job.finished_at.is_none());

        job.set_status(JobStatus::Running, None);
        assert!(job.started_at.is_some());

        job.set_status(JobStatus::FailedEncode, Some("exit 1".to_string()));
        assert!(job.finished_at.is_some());
        assert_eq!(job.error.as_deref(), Some("exit 1"));

        let skipped = Job::new(spec(), JobStatus::SkippedNotAVideo);
        assert!(skipped.finished_at.is_some());
    }

    #[test]
    fn test_summary_counts() {
        let jobs = vec![
            Job::new(spec(), JobStatus::Queued),
            Job::new(spec(), JobStatus::SkippedNotAVideo),
            Job::new(spec(), JobStatus::FailedProbe),
            Job::new(spec(), JobStatus::FailedFilesystem),
        ];
        let summary: JobSummary = jobs.iter().collect();
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures(), 2);
        assert_eq!(summary.finished(), 3);
    }
}
