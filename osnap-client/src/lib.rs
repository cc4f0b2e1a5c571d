//! Repository client for the virtualization management API.
//!
//! The snapshot lifecycle only talks to the platform through the
//! [`Repository`] trait. [`OvirtClient`] implements it over the oVirt v4 REST
//! API; the `test-helpers` feature adds an in-memory implementation.

// External crates
use async_trait::async_trait;
use osnap_core::error::Result;

pub mod models;
pub mod ovirt;
mod wire;

// When the `test-helpers` feature is enabled, include the mock repository.
#[cfg(feature = "test-helpers")]
pub mod mock;

pub use models::{Cluster, Snapshot, Vm, VmRef};
pub use ovirt::OvirtClient;

/// The operations the snapshot lifecycle needs from the platform.
///
/// Every call may fail with a transport or authentication error. Callers
/// treat such failures as final for that call site and never retry.
#[async_trait]
pub trait Repository: Send + Sync {
    /// List every VM visible to the API user.
    async fn list_vms(&self) -> Result<Vec<Vm>>;

    /// Resolve a cluster by its exact name.
    ///
    /// # Errors
    ///
    /// - `OsnapError::UnknownCluster` when no cluster has that name.
    async fn find_cluster_by_name(&self, name: &str) -> Result<Cluster>;

    /// Request a new disk-only snapshot. The returned snapshot is usually
    /// still in progress.
    async fn create_snapshot(&self, vm_id: &str, description: &str) -> Result<Snapshot>;

    /// Fetch the current state of one snapshot.
    async fn get_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<Snapshot>;

    /// List all snapshots of a VM in the order the platform returns them.
    async fn list_snapshots(&self, vm_id: &str) -> Result<Vec<Snapshot>>;

    /// Delete one snapshot.
    async fn delete_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<()>;
}
