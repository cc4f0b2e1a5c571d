//! Completion monitoring for snapshot jobs
//!
//! Each job runs its own `Pending -> Succeeded | Failed` state machine. Jobs
//! are polled concurrently, so one job's backoff never delays another's.
//! Without `max_wait` a job that never leaves a pending status is polled
//! forever; the engine, not this tool, owns the job's lifetime.

use std::time::Duration;

use futures::future::join_all;
use osnap_client::Repository;
use osnap_config::PollPolicy;
use osnap_core::error::OsnapError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::create::SnapshotJob;
use crate::report::{Operation, VmFailure};
use crate::status::{classify, SnapshotState};

/// Terminal result of one snapshot job.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded,
    /// The engine reported a failure status; carries it verbatim.
    Failed { status: String },
    /// Polling itself failed. Not retried.
    PollError(OsnapError),
    /// Still pending when `max_wait` ran out.
    TimedOut { waited: Duration },
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    /// Failure entry for the run report, `None` on success.
    pub fn to_failure(&self, job: &SnapshotJob) -> Option<VmFailure> {
        let detail = match self {
            JobOutcome::Succeeded => return None,
            JobOutcome::Failed { status } => status.clone(),
            JobOutcome::PollError(e) => e.to_string(),
            JobOutcome::TimedOut { waited } => {
                format!("still pending after {}s", waited.as_secs())
            }
            JobOutcome::Cancelled => OsnapError::Cancelled.to_string(),
        };
        Some(
            VmFailure::new(&job.vm.name, Operation::Monitor, detail)
                .with_snapshot(&job.snapshot.id),
        )
    }
}

/// Polls one job until it reaches a terminal state.
///
/// The first poll happens immediately; after each non-terminal poll the job
/// sleeps `policy.interval`. Cancellation is honored between polls, never in
/// the middle of a request.
pub async fn wait_for_completion(
    repo: &dyn Repository,
    job: &SnapshotJob,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> JobOutcome {
    let started = Instant::now();
    let deadline = policy.max_wait.map(|max| started + max);
    debug!(snapshot_id = %job.snapshot.id, "Waiting for snapshot to finish");

    loop {
        if cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        let snapshot = match repo.get_snapshot(&job.vm.id, &job.snapshot.id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return JobOutcome::PollError(e),
        };

        let state = classify(&snapshot.status);
        if state.is_terminal() {
            return match state {
                SnapshotState::Succeeded => JobOutcome::Succeeded,
                _ => JobOutcome::Failed {
                    status: snapshot.status,
                },
            };
        }

        let mut pause = policy.interval;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return JobOutcome::TimedOut {
                    waited: now - started,
                };
            }
            pause = pause.min(deadline - now);
        }

        debug!(
            status = %snapshot.status,
            pause_secs = pause.as_secs(),
            "Snapshot still in progress"
        );
        tokio::select! {
            _ = cancel.cancelled() => return JobOutcome::Cancelled,
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

/// Resolves every job to a terminal outcome.
///
/// All jobs are polled at once; the number of jobs is bounded by the number
/// of selected VMs.
pub async fn monitor_jobs(
    repo: &dyn Repository,
    jobs: Vec<SnapshotJob>,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Vec<(SnapshotJob, JobOutcome)> {
    let waits = jobs.into_iter().map(|job| {
        let span = info_span!("vm", vm = %job.vm.name);
        async move {
            let outcome = wait_for_completion(repo, &job, policy, cancel).await;
            match outcome.to_failure(&job) {
                None => info!(snapshot_id = %job.snapshot.id, "Snapshot completed"),
                Some(failure) => warn!(
                    snapshot_id = %job.snapshot.id,
                    detail = %failure.detail,
                    "Snapshot failed"
                ),
            }
            (job, outcome)
        }
        .instrument(span)
    });

    join_all(waits).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use osnap_client::mock::MockRepository;
    use osnap_client::Vm;

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(30),
            max_wait: None,
        }
    }

    async fn start_job(repo: &MockRepository, vm_id: &str) -> SnapshotJob {
        let vm = Vm::new(vm_id, format!("vm-{vm_id}"), None);
        crate::create::create_snapshot(repo, &vm, "nightly")
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_ok() {
        let repo = MockRepository::new().on_create("1", "s1", &["pending", "pending", "ok"]);
        let job = start_job(&repo, "1").await;

        let started = Instant::now();
        let outcome =
            wait_for_completion(&repo, &job, &policy(), &CancellationToken::new()).await;

        assert!(outcome.is_success());
        assert_eq!(repo.poll_count("s1"), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status_is_reported_verbatim() {
        let repo = MockRepository::new().on_create("1", "s1", &["locked", "failed"]);
        let job = start_job(&repo, "1").await;

        let outcome =
            wait_for_completion(&repo, &job, &policy(), &CancellationToken::new()).await;

        match &outcome {
            JobOutcome::Failed { status } => assert_eq!(status, "failed"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let failure = outcome.to_failure(&job).unwrap();
        assert_eq!(failure.snapshot_id.as_deref(), Some("s1"));
        assert_eq!(failure.detail, "failed");
        assert_eq!(repo.poll_count("s1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_prefix_stops_polling() {
        let repo = MockRepository::new().on_create("1", "s1", &["error_disk_full", "ok"]);
        let job = start_job(&repo, "1").await;

        let started = Instant::now();
        let outcome =
            wait_for_completion(&repo, &job, &policy(), &CancellationToken::new()).await;

        assert!(matches!(outcome, JobOutcome::Failed { ref status } if status == "error_disk_full"));
        assert_eq!(repo.poll_count("s1"), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_is_not_retried() {
        let repo = MockRepository::new()
            .on_create("1", "s1", &["pending"])
            .fail_poll("s1");
        let job = start_job(&repo, "1").await;

        let outcome =
            wait_for_completion(&repo, &job, &policy(), &CancellationToken::new()).await;

        assert!(matches!(outcome, JobOutcome::PollError(OsnapError::Network(_))));
        assert_eq!(repo.poll_count("s1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_bounds_polling() {
        let repo = MockRepository::new().on_create("1", "s1", &["locked"]);
        let job = start_job(&repo, "1").await;
        let policy = PollPolicy {
            interval: Duration::from_secs(30),
            max_wait: Some(Duration::from_secs(75)),
        };

        let outcome = wait_for_completion(&repo, &job, &policy, &CancellationToken::new()).await;

        match outcome {
            JobOutcome::TimedOut { waited } => assert_eq!(waited, Duration::from_secs(75)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Polls at 0s, 30s, 60s and the deadline at 75s.
        assert_eq!(repo.poll_count("s1"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let repo = MockRepository::new().on_create("1", "s1", &["locked"]);
        let job = start_job(&repo, "1").await;
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(45)).await;
            trigger.cancel();
        });

        let outcome = wait_for_completion(&repo, &job, &policy(), &cancel).await;

        assert!(matches!(outcome, JobOutcome::Cancelled));
        assert_eq!(repo.poll_count("s1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_poll_independently() {
        let repo = MockRepository::new()
            .on_create("1", "s1", &["pending", "pending", "pending", "ok"])
            .on_create("2", "s2", &["pending", "ok"])
            .on_create("3", "s3", &["ok"]);
        let jobs = vec![
            start_job(&repo, "1").await,
            start_job(&repo, "2").await,
            start_job(&repo, "3").await,
        ];

        let started = Instant::now();
        let outcomes = monitor_jobs(&repo, jobs, &policy(), &CancellationToken::new()).await;

        assert!(outcomes.iter().all(|(_, outcome)| outcome.is_success()));
        // The slowest job needs three waits; serial polling would need four.
        assert_eq!(started.elapsed(), Duration::from_secs(90));
    }
}
