//! oVirt snapshot lifecycle
//!
//! Selects VMs, creates one tagged snapshot per VM, waits for every snapshot
//! job to finish and prunes old tagged snapshots beyond the retention count.

pub mod create;
pub mod monitor;
pub mod purge;
pub mod report;
pub mod run;
pub mod select;
pub mod status;

// Re-export key types
pub use create::SnapshotJob;
pub use monitor::JobOutcome;
pub use report::{Operation, RunReport, VmFailure};
pub use run::Coordinator;
pub use select::VmFilter;
pub use status::{classify, SnapshotState};

/// Suffix appended to every description this tool writes. Only snapshots
/// carrying it are ever considered for deletion.
pub const MANAGED_MARKER: &str = " - created by oSnap";

/// Description for a new snapshot: the user template plus the marker.
pub fn managed_description(template: &str) -> String {
    format!("{template}{MANAGED_MARKER}")
}

pub fn is_managed(description: &str) -> bool {
    description.ends_with(MANAGED_MARKER)
}

/// Calculate optimal concurrency limit based on available CPU count
///
/// Returns a value between 2 and 8 to balance:
/// - Throughput against the engine on multi-core hosts
/// - Protection against flooding the engine's task queue (cap at 8)
pub fn optimal_concurrency() -> usize {
    num_cpus::get().clamp(2, 8)
}
