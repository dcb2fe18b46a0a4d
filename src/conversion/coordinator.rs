//! Job coordination.
//!
//! The coordinator owns the job table. It probes and plans every submitted
//! spec up front, then runs accepted jobs on a bounded pool: each encode
//! process holds one semaphore permit for its whole lifetime, so no more
//! than `max_concurrent` engine processes exist at any moment no matter how
//! many jobs or fan-out siblings are dispatched.

use super::executor::{EncodeExecutor, EncodeFailure};
use super::planner::{self, EncodePlan};
use super::spec::JobSpec;
use crate::config::Config;
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::state::{
    EncodeOutcome, Job, JobEvent, JobStatus, JobSummary, JobTable, StatusChange,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transcodr_common::JobId;

/// Pool and failure policy of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Maximum encode processes running at once.
    pub max_concurrent: usize,
    /// Cancel the remaining variants of a job when one of them fails.
    pub cancel_siblings_on_failure: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1),
            cancel_siblings_on_failure: false,
        }
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.transcode.effective_max_concurrent(),
            cancel_siblings_on_failure: config.transcode.cancel_siblings_on_failure,
        }
    }
}

/// A queued job waiting for `start`.
struct PendingJob {
    id: JobId,
    plans: Vec<EncodePlan>,
}

/// How one sibling encode of a job ended.
#[derive(Debug)]
enum SiblingOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
    /// The job ended before this encode got a pool slot.
    NotStarted,
}

struct Inner {
    probe: Arc<dyn MediaProbe>,
    executor: EncodeExecutor,
    settings: CoordinatorSettings,
    permits: Arc<Semaphore>,
    table: JobTable,
    pending: Mutex<Vec<PendingJob>>,
    tokens: Mutex<HashMap<JobId, CancellationToken>>,
}

/// Runs transcode jobs.
///
/// Cheap to clone; clones share the same job table and pool.
#[derive(Clone)]
pub struct JobCoordinator {
    inner: Arc<Inner>,
}

impl JobCoordinator {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        executor: EncodeExecutor,
        settings: CoordinatorSettings,
    ) -> Self {
        let max_concurrent = settings.max_concurrent.max(1);
        Self {
            inner: Arc::new(Inner {
                probe,
                executor,
                settings: CoordinatorSettings {
                    max_concurrent,
                    ..settings
                },
                permits: Arc::new(Semaphore::new(max_concurrent)),
                table: JobTable::new(),
                pending: Mutex::new(Vec::new()),
                tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build a coordinator driving the configured (or `PATH`) ffmpeg tools.
    pub fn from_config(config: &Config) -> Self {
        let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
        let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref());
        debug!("Using ffprobe at {:?}, ffmpeg at {:?}", ffprobe, ffmpeg);

        Self::new(
            Arc::new(FfprobeProbe::new(ffprobe)),
            EncodeExecutor::new(ffmpeg),
            CoordinatorSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> CoordinatorSettings {
        self.inner.settings
    }

    /// Probe and plan each spec, adding one job per spec to the table.
    ///
    /// Blocks while probing. Specs that cannot be encoded finish here
    /// (`SkippedNotAVideo`, `FailedProbe`, `FailedFilesystem`) and are never
    /// dispatched; the others become `Queued`. IDs are returned in input
    /// order.
    pub fn submit(&self, specs: Vec<JobSpec>) -> Vec<JobId> {
        specs
            .into_iter()
            .map(|spec| self.inner.submit_one(spec))
            .collect()
    }

    /// Dispatch every queued job that has not been dispatched yet.
    ///
    /// Must be called from within a tokio runtime. Returns the number of
    /// jobs handed to the pool.
    pub fn start(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.pending.lock());
        let mut dispatched = 0;

        for job in pending {
            if !self.inner.table.mark_dispatched(job.id) {
                debug!("Job {} left the queue before start", job.id.short());
                self.inner.tokens.lock().remove(&job.id);
                continue;
            }
            let token = self.inner.token(job.id);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run_job(job, token).await });
            dispatched += 1;
        }

        if dispatched > 0 {
            info!(
                "Dispatched {} job(s), up to {} encode(s) at once",
                dispatched, self.inner.settings.max_concurrent
            );
        }
        dispatched
    }

    /// Cancel one job.
    ///
    /// A queued job becomes `Cancelled` at once; a running job has its encode
    /// processes terminated and ends `Cancelled`. Returns false if the job is
    /// unknown or already finished.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.inner.table.status(id) {
            Some(status) if !status.is_terminal() => {
                if let Some(token) = self.inner.tokens.lock().get(&id) {
                    token.cancel();
                }
                // A running job ends Cancelled once its encodes have stopped
                self.inner.table.cancel_queued(id);
                info!("Cancelled job {}", id.short());
                true
            }
            _ => false,
        }
    }

    /// Cancel every unfinished job. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        self.inner
            .table
            .jobs()
            .into_iter()
            .filter(|job| !job.status.is_terminal())
            .filter(|job| self.cancel(job.id))
            .count()
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.inner.table.status(id)
    }

    /// Full record of one job.
    pub fn snapshot(&self, id: JobId) -> Option<Job> {
        self.inner.table.get(id)
    }

    /// All jobs in submission order.
    pub fn jobs(&self) -> Vec<Job> {
        self.inner.table.jobs()
    }

    pub fn summary(&self) -> JobSummary {
        self.inner.table.summary()
    }

    /// Whether any dispatched job is still unfinished.
    pub fn is_busy(&self) -> bool {
        self.inner.table.has_active()
    }

    /// Status changes from now on, as a lazy stream.
    ///
    /// Each job's changes arrive in lifecycle order. A subscriber that falls
    /// too far behind skips the changes it missed.
    pub fn status_stream(&self) -> impl Stream<Item = StatusChange> + Send + 'static {
        BroadcastStream::new(self.inner.table.subscribe()).filter_map(|event| match event {
            Ok(event) => event.as_status_change(),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Status stream lagged, {} event(s) dropped", skipped);
                None
            }
        })
    }

    /// Subscribe to every job event.
    pub fn events(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.table.subscribe()
    }

    /// Wait until every dispatched job has finished.
    ///
    /// A job only finishes after its encode processes have exited. Dropping
    /// the returned future leaves the jobs running.
    pub async fn wait(&self) {
        let mut events = self.inner.table.subscribe();
        while self.inner.table.has_active() {
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Cancel everything and wait for running encodes to terminate.
    pub async fn shutdown(&self) {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            info!("Shutting down, cancelled {} job(s)", cancelled);
        }
        self.wait().await;
    }
}

impl Inner {
    fn submit_one(&self, spec: JobSpec) -> JobId {
        let probe = self.probe.probe(&spec.source_path);

        // Environment problems fail the job; a file that is not media is skipped
        if let Some(issue) = probe.issue.as_ref().filter(|issue| issue.is_unexpected()) {
            let message = issue.message().unwrap_or("probe failed").to_string();
            warn!("Probe failed for {:?}: {}", spec.source_path, message);
            return self
                .table
                .insert(Job::new(spec, JobStatus::FailedProbe).with_error(message));
        }

        let plans = match planner::plan_all(&spec, &probe) {
            Ok(plans) => plans,
            Err(rejection) => {
                info!("Skipping {}: {}", spec.source_name(), rejection);
                return self.table.insert(
                    Job::new(spec, JobStatus::SkippedNotAVideo).with_error(rejection.to_string()),
                );
            }
        };

        let outputs: Vec<PathBuf> = plans.iter().map(|p| p.destination_path.clone()).collect();

        if let Err(e) = create_destination_dirs(&outputs) {
            error!("Cannot prepare output for {}: {}", spec.source_name(), e);
            return self.table.insert(
                Job::new(spec, JobStatus::FailedFilesystem)
                    .with_outputs(outputs)
                    .with_error(e.to_string()),
            );
        }

        let job = Job::new(spec, JobStatus::Queued).with_outputs(outputs);
        let id = job.id;
        debug!(
            "Queued job {} for {} ({} encode(s))",
            id.short(),
            job.spec.source_name(),
            plans.len()
        );

        // The job must be in the table before `start` can see it as pending
        self.tokens.lock().insert(id, CancellationToken::new());
        self.table.insert(job);
        self.pending.lock().push(PendingJob { id, plans });
        id
    }

    fn token(&self, id: JobId) -> CancellationToken {
        self.tokens.lock().entry(id).or_default().clone()
    }

    async fn run_job(&self, job: PendingJob, token: CancellationToken) {
        let PendingJob { id, plans } = job;

        let outcomes =
            futures::future::join_all(plans.iter().map(|plan| self.run_encode(id, plan, &token)))
                .await;

        let (status, error) = aggregate(&outcomes);
        if self.table.transition(id, status, error).is_some() {
            info!("Job {} finished: {}", id.short(), status);
        }
        self.tokens.lock().remove(&id);
    }

    async fn run_encode(
        &self,
        id: JobId,
        plan: &EncodePlan,
        token: &CancellationToken,
    ) -> SiblingOutcome {
        let _permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return SiblingOutcome::NotStarted,
            },
            _ = token.cancelled() => return SiblingOutcome::NotStarted,
        };

        if token.is_cancelled() || !self.table.mark_running(id) {
            return SiblingOutcome::NotStarted;
        }

        let variant = plan.variant();
        let destination = plan.destination_path.clone();
        info!(
            "Encoding {:?} -> {:?} ({})",
            plan.source_path,
            destination,
            variant.label()
        );
        self.table.broadcast(JobEvent::encode_started(
            id,
            variant,
            destination.clone(),
        ));

        match self.executor.execute_cancellable(plan, token).await {
            Ok(()) => {
                self.table.broadcast(JobEvent::encode_finished(
                    id,
                    variant,
                    destination,
                    EncodeOutcome::Succeeded,
                    None,
                ));
                SiblingOutcome::Succeeded
            }
            Err(EncodeFailure::Cancelled) => {
                self.table.broadcast(JobEvent::encode_finished(
                    id,
                    variant,
                    destination,
                    EncodeOutcome::Cancelled,
                    None,
                ));
                SiblingOutcome::Cancelled
            }
            Err(e) => {
                error!("Encode of {:?} failed: {}", destination, e);
                let message = e.to_string();
                self.table.broadcast(JobEvent::encode_finished(
                    id,
                    variant,
                    destination,
                    EncodeOutcome::Failed,
                    Some(message.clone()),
                ));
                if self.settings.cancel_siblings_on_failure {
                    token.cancel();
                }
                SiblingOutcome::Failed(message)
            }
        }
    }
}

/// Final status of a job from the outcomes of its encodes.
///
/// Any failure makes the job `FailedEncode`; otherwise any encode that was
/// cancelled or never started makes it `Cancelled`.
fn aggregate(outcomes: &[SiblingOutcome]) -> (JobStatus, Option<String>) {
    let failures: Vec<&str> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            SiblingOutcome::Failed(message) => Some(message.as_str()),
            _ => None,
        })
        .collect();

    if !failures.is_empty() {
        return (JobStatus::FailedEncode, Some(failures.join("\n")));
    }

    let interrupted = outcomes
        .iter()
        .any(|o| matches!(o, SiblingOutcome::Cancelled | SiblingOutcome::NotStarted));
    if interrupted {
        (JobStatus::Cancelled, None)
    } else {
        (JobStatus::Succeeded, None)
    }
}

fn create_destination_dirs(outputs: &[PathBuf]) -> std::io::Result<()> {
    for output in outputs {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Configured tool path, else the `PATH` match, else the bare name.
fn resolve_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    match transcodr_av::get_tool_path(name, configured) {
        Ok(path) => path,
        Err(e) => {
            warn!("{}", e);
            configured
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::TranscodeOptions;
    use crate::probe::{ProbeIssue, ProbeResult, Rational, VideoStream};

    struct VideoOnlyProbe;

    impl MediaProbe for VideoOnlyProbe {
        fn probe(&self, _path: &Path) -> ProbeResult {
            ProbeResult {
                video: Some(VideoStream {
                    codec_name: "h264".to_string(),
                    frame_rate: Rational::new(25, 1),
                }),
                audio: None,
                issue: None,
            }
        }
    }

    struct NoVideoProbe;

    impl MediaProbe for NoVideoProbe {
        fn probe(&self, _path: &Path) -> ProbeResult {
            ProbeResult::absent(ProbeIssue::Unreadable {
                message: "Invalid data found when processing input".to_string(),
            })
        }
    }

    struct BrokenProbe;

    impl MediaProbe for BrokenProbe {
        fn probe(&self, _path: &Path) -> ProbeResult {
            ProbeResult::absent(ProbeIssue::ToolUnavailable {
                message: "ffprobe not found".to_string(),
            })
        }
    }

    fn coordinator(probe: impl MediaProbe + 'static) -> JobCoordinator {
        JobCoordinator::new(
            Arc::new(probe),
            EncodeExecutor::new("/nonexistent/bin/ffmpeg"),
            CoordinatorSettings {
                max_concurrent: 2,
                cancel_siblings_on_failure: false,
            },
        )
    }

    fn spec() -> JobSpec {
        JobSpec::new("/in/notes.txt", "/out/notes.txt", &TranscodeOptions::default())
    }

    #[test]
    fn test_aggregate() {
        use SiblingOutcome::*;
        assert_eq!(aggregate(&[Succeeded, Succeeded]).0, JobStatus::Succeeded);
        assert_eq!(
            aggregate(&[Succeeded, Failed("exit 1".into())]),
            (JobStatus::FailedEncode, Some("exit 1".to_string()))
        );
        assert_eq!(aggregate(&[Cancelled, Failed("x".into())]).0, JobStatus::FailedEncode);
        assert_eq!(aggregate(&[Succeeded, NotStarted]).0, JobStatus::Cancelled);
        assert_eq!(aggregate(&[Cancelled]).0, JobStatus::Cancelled);
    }

    #[test]
    fn test_non_video_is_skipped_at_submit() {
        let coordinator = coordinator(NoVideoProbe);
        let ids = coordinator.submit(vec![spec()]);
        assert_eq!(ids.len(), 1);
        assert_eq!(coordinator.status(ids[0]), Some(JobStatus::SkippedNotAVideo));
        assert!(coordinator.snapshot(ids[0]).unwrap().outputs.is_empty());
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_probe_tool_failure_is_failed_probe() {
        let coordinator = coordinator(BrokenProbe);
        let ids = coordinator.submit(vec![spec()]);
        let job = coordinator.snapshot(ids[0]).unwrap();
        assert_eq!(job.status, JobStatus::FailedProbe);
        assert_eq!(job.error.as_deref(), Some("ffprobe not found"));
    }

    #[test]
    fn test_cancel_finished_job_is_noop() {
        let coordinator = coordinator(NoVideoProbe);
        let ids = coordinator.submit(vec![spec()]);
        assert!(!coordinator.cancel(ids[0]));
        assert!(!coordinator.cancel(JobId::new()));
        assert_eq!(coordinator.cancel_all(), 0);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let coordinator = JobCoordinator::new(
            Arc::new(NoVideoProbe),
            EncodeExecutor::default(),
            CoordinatorSettings {
                max_concurrent: 0,
                cancel_siblings_on_failure: true,
            },
        );
        assert_eq!(coordinator.settings().max_concurrent, 1);
        assert!(coordinator.settings().cancel_siblings_on_failure);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_jobs_submitted_while_starting_all_finish() {
        const JOBS: usize = 2000;
        let out = tempfile::tempdir().unwrap();
        let out_dir = out.path().to_path_buf();

        // Encodes fail at spawn, so every dispatched job ends quickly
        let coordinator = coordinator(VideoOnlyProbe);
        let submitter = coordinator.clone();
        let submitting = tokio::task::spawn_blocking(move || {
            for i in 0..JOBS {
                submitter.submit(vec![JobSpec::new(
                    format!("/in/clip{i}.mp4"),
                    out_dir.join(format!("clip{i}.mp4")),
                    &TranscodeOptions::default(),
                )]);
            }
        });

        while !submitting.is_finished() {
            coordinator.start();
            tokio::task::yield_now().await;
        }
        submitting.await.unwrap();
        coordinator.start();
        coordinator.wait().await;

        let summary = coordinator.summary();
        assert_eq!(summary.total(), JOBS);
        assert_eq!(summary.queued, 0, "jobs left behind: {summary:?}");
        assert_eq!(summary.failed_encode, JOBS);
    }

    #[tokio::test]
    async fn test_start_with_nothing_queued() {
        let coordinator = coordinator(NoVideoProbe);
        coordinator.submit(vec![spec()]);
        assert_eq!(coordinator.start(), 0);
        coordinator.wait().await;
        assert_eq!(coordinator.summary().skipped, 1);
    }
}
