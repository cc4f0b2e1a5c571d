//! Run coordination: select, create, monitor, purge, summarize.

use osnap_client::{Repository, Vm};
use osnap_config::{RunConfig, RunMode};
use osnap_core::error::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::create::create_snapshots;
use crate::monitor::monitor_jobs;
use crate::optimal_concurrency;
use crate::purge::purge_vms;
use crate::report::RunReport;
use crate::select::{select_vms, VmFilter};

/// Drives one snapshot run against a repository.
///
/// Setup problems (bad patterns, unknown cluster, unreachable inventory) are
/// returned as errors before any VM is touched. Everything after that is
/// recorded per VM in the [`RunReport`]; nothing is rolled back.
pub struct Coordinator<'a> {
    repo: &'a dyn Repository,
    config: &'a RunConfig,
    filter: VmFilter,
    cancel: CancellationToken,
}

impl<'a> Coordinator<'a> {
    /// Compiles the name patterns up front so a bad pattern fails before any
    /// network call.
    pub fn new(
        repo: &'a dyn Repository,
        config: &'a RunConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            repo,
            config,
            filter: VmFilter::compile(&config.selection)?,
            cancel,
        })
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.unwrap_or_else(optimal_concurrency)
    }

    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id, mode = self.config.mode.as_str());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunReport> {
        let vms = select_vms(self.repo, &self.config.selection, &self.filter).await?;
        let mut report = RunReport::new(self.config.mode, vms.len());

        if vms.is_empty() {
            info!("No VMs selected");
            return Ok(report);
        }

        let targets = match self.config.mode {
            RunMode::PurgeOnly => vms,
            RunMode::Normal => self.snapshot_all(&vms, &mut report).await,
        };

        info!(vms = targets.len(), keep = self.config.keep, "Purging old snapshots");
        let purged = purge_vms(
            self.repo,
            &targets,
            self.config.keep,
            self.concurrency(),
            &self.cancel,
        )
        .await;

        for (_, outcome) in purged {
            report.deleted += outcome.deleted.len();
            if outcome.is_clean() {
                report.purged_clean += 1;
            }
            report.failures.extend(outcome.failures);
        }

        if report.is_success() {
            info!(vms = report.selected, deleted = report.deleted, "Run completed");
        } else {
            warn!(
                vms = report.selected,
                failures = report.failures.len(),
                "Run completed with errors"
            );
        }
        Ok(report)
    }

    /// Creates and waits for a snapshot of every VM; returns the VMs whose
    /// snapshot reached `ok`.
    async fn snapshot_all(&self, vms: &[Vm], report: &mut RunReport) -> Vec<Vm> {
        let (jobs, failures) = create_snapshots(
            self.repo,
            vms,
            &self.config.description,
            self.concurrency(),
            &self.cancel,
        )
        .await;
        report.failures.extend(failures);

        info!(jobs = jobs.len(), "Waiting for snapshot jobs");
        let outcomes = monitor_jobs(self.repo, jobs, &self.config.poll, &self.cancel).await;

        let mut succeeded = Vec::new();
        for (job, outcome) in outcomes {
            match outcome.to_failure(&job) {
                Some(failure) => report.failures.push(failure),
                None => succeeded.push(job.vm),
            }
        }
        report.snapshotted = succeeded.len();
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osnap_client::mock::MockRepository;
    use osnap_config::SelectionConfig;
    use osnap_core::OsnapError;

    #[test]
    fn test_bad_pattern_fails_before_any_call() {
        let repo = MockRepository::new().fail_list_vms();
        let config = RunConfig {
            selection: SelectionConfig {
                exclude: Some("[".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = Coordinator::new(&repo, &config, CancellationToken::new())
            .err()
            .unwrap();
        assert!(matches!(err, OsnapError::Validation(_)));
    }

    #[tokio::test]
    async fn test_inventory_failure_is_fatal() {
        let repo = MockRepository::new().fail_list_vms();
        let config = RunConfig::default();

        let coordinator = Coordinator::new(&repo, &config, CancellationToken::new()).unwrap();
        assert!(matches!(
            coordinator.run().await,
            Err(OsnapError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_selection_is_success() {
        let repo = MockRepository::new().with_vm("1", "web01", None);
        let config = RunConfig {
            selection: SelectionConfig {
                include: Some("^db".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let report = Coordinator::new(&repo, &config, CancellationToken::new())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(report.selected, 0);
        assert!(report.is_success());
        assert!(repo.created().is_empty());
    }
}
