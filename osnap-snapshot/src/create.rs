//! Snapshot creation

use futures::stream::{self, StreamExt};
use osnap_client::{Repository, Snapshot, Vm};
use osnap_core::error::{OsnapError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::managed_description;
use crate::report::{Operation, VmFailure};

/// A snapshot request the engine accepted but has not finished yet.
#[derive(Debug, Clone)]
pub struct SnapshotJob {
    pub vm: Vm,
    pub snapshot: Snapshot,
}

/// Requests one disk-only snapshot of `vm`, tagged with the managed marker.
pub async fn create_snapshot(
    repo: &dyn Repository,
    vm: &Vm,
    description: &str,
) -> Result<SnapshotJob> {
    let mut snapshot = repo
        .create_snapshot(&vm.id, &managed_description(description))
        .await?;
    if snapshot.vm.name.is_none() {
        snapshot.vm.name = Some(vm.name.clone());
    }

    Ok(SnapshotJob {
        vm: vm.clone(),
        snapshot,
    })
}

/// Creates snapshots for all `vms`, at most `concurrency` requests at a time.
///
/// Failed VMs are reported and get no job. VMs not yet started when `cancel`
/// fires are reported as cancelled.
pub async fn create_snapshots(
    repo: &dyn Repository,
    vms: &[Vm],
    description: &str,
    concurrency: usize,
    cancel: &CancellationToken,
) -> (Vec<SnapshotJob>, Vec<VmFailure>) {
    let create_futures = vms.iter().map(|vm| {
        let span = info_span!("vm", vm = %vm.name);
        async move {
            if cancel.is_cancelled() {
                return Err(VmFailure::new(
                    &vm.name,
                    Operation::Create,
                    OsnapError::Cancelled.to_string(),
                ));
            }

            info!("Creating snapshot");
            match create_snapshot(repo, vm, description).await {
                Ok(job) => {
                    info!(snapshot_id = %job.snapshot.id, "Snapshot job created");
                    Ok(job)
                }
                Err(e) => {
                    warn!(error = %e, "Snapshot creation failed");
                    Err(VmFailure::new(&vm.name, Operation::Create, e.to_string()))
                }
            }
        }
        .instrument(span)
    });

    let results: Vec<_> = stream::iter(create_futures)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut jobs = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(job) => jobs.push(job),
            Err(failure) => failures.push(failure),
        }
    }
    (jobs, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osnap_client::mock::MockRepository;

    fn vms() -> Vec<Vm> {
        vec![
            Vm::new("x", "vm-x", None),
            Vm::new("y", "vm-y", None),
            Vm::new("z", "vm-z", None),
        ]
    }

    #[tokio::test]
    async fn test_description_is_tagged() {
        let repo = MockRepository::new().with_vm("x", "vm-x", None);
        let job = create_snapshot(&repo, &vms()[0], "nightly").await.unwrap();

        assert_eq!(job.snapshot.description, "nightly - created by oSnap");
        assert!(!job.snapshot.persist_memory_state);
        assert_eq!(job.vm.id, "x");
        assert_eq!(
            repo.created(),
            vec![("x".to_string(), "nightly - created by oSnap".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_create_gets_no_job() {
        let repo = MockRepository::new().fail_create("x", "VM is locked");
        let (jobs, failures) =
            create_snapshots(&repo, &vms(), "nightly", 2, &CancellationToken::new()).await;

        let mut job_vms: Vec<_> = jobs.iter().map(|j| j.vm.name.as_str()).collect();
        job_vms.sort();
        assert_eq!(job_vms, vec!["vm-y", "vm-z"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].vm_name, "vm-x");
        assert_eq!(failures[0].operation, Operation::Create);
        assert!(failures[0].detail.contains("VM is locked"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let repo = MockRepository::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (jobs, failures) = create_snapshots(&repo, &vms(), "nightly", 4, &cancel).await;

        assert!(jobs.is_empty());
        assert_eq!(failures.len(), 3);
        assert!(repo.created().is_empty());
    }
}
