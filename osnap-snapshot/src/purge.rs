//! Retention purge
//!
//! Only snapshots carrying the managed marker are ever candidates. They are
//! ordered oldest first by creation time when every one of them has a
//! timestamp, otherwise in the order the engine listed them.

use futures::stream::{self, StreamExt};
use osnap_client::{Repository, Snapshot, Vm};
use osnap_core::error::OsnapError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::is_managed;
use crate::report::{Operation, VmFailure};

/// Result of purging one VM.
#[derive(Debug, Default)]
pub struct PurgeOutcome {
    pub deleted: Vec<String>,
    pub failures: Vec<VmFailure>,
}

impl PurgeOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Managed snapshots to delete so that at most `keep` remain, oldest first.
pub fn plan_purge(snapshots: &[Snapshot], keep: usize) -> Vec<&Snapshot> {
    let mut managed: Vec<&Snapshot> = snapshots
        .iter()
        .filter(|s| is_managed(&s.description))
        .collect();

    if managed.iter().all(|s| s.created_at.is_some()) {
        // Stable: equal timestamps keep their list order.
        managed.sort_by_key(|s| s.created_at);
    }

    let excess = managed.len().saturating_sub(keep);
    managed.truncate(excess);
    managed
}

/// Lists the VM's snapshots and deletes the excess managed ones.
///
/// Deletions run one after another. A failed deletion is recorded and the
/// remaining candidates are still attempted.
pub async fn purge_vm(
    repo: &dyn Repository,
    vm: &Vm,
    keep: usize,
    cancel: &CancellationToken,
) -> PurgeOutcome {
    let mut outcome = PurgeOutcome::default();

    if cancel.is_cancelled() {
        outcome.failures.push(VmFailure::new(
            &vm.name,
            Operation::List,
            OsnapError::Cancelled.to_string(),
        ));
        return outcome;
    }

    let snapshots = match repo.list_snapshots(&vm.id).await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            warn!(error = %e, "Listing snapshots failed");
            outcome
                .failures
                .push(VmFailure::new(&vm.name, Operation::List, e.to_string()));
            return outcome;
        }
    };

    let candidates = plan_purge(&snapshots, keep);
    debug!(
        total = snapshots.len(),
        to_delete = candidates.len(),
        keep,
        "Planned purge"
    );

    for snapshot in candidates {
        if cancel.is_cancelled() {
            outcome.failures.push(
                VmFailure::new(&vm.name, Operation::Delete, OsnapError::Cancelled.to_string())
                    .with_snapshot(&snapshot.id),
            );
            continue;
        }

        match repo.delete_snapshot(&vm.id, &snapshot.id).await {
            Ok(()) => {
                info!(
                    snapshot_id = %snapshot.id,
                    description = %snapshot.description,
                    "Deleted snapshot"
                );
                outcome.deleted.push(snapshot.id.clone());
            }
            Err(e) => {
                warn!(snapshot_id = %snapshot.id, error = %e, "Deleting snapshot failed");
                outcome.failures.push(
                    VmFailure::new(&vm.name, Operation::Delete, e.to_string())
                        .with_snapshot(&snapshot.id),
                );
            }
        }
    }

    outcome
}

/// Purges every VM, at most `concurrency` VMs at a time.
pub async fn purge_vms(
    repo: &dyn Repository,
    vms: &[Vm],
    keep: usize,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<(Vm, PurgeOutcome)> {
    let purge_futures = vms.iter().map(|vm| {
        let span = info_span!("vm", vm = %vm.name);
        async move { (vm.clone(), purge_vm(repo, vm, keep, cancel).await) }.instrument(span)
    });

    stream::iter(purge_futures)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
