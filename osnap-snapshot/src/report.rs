//! Per-VM failures and the aggregate run outcome

use std::fmt;

use osnap_config::RunMode;

/// The lifecycle step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Monitor,
    List,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Operation::Create => "snapshot creation",
            Operation::Monitor => "monitoring",
            Operation::List => "snapshot listing",
            Operation::Delete => "deletion",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmFailure {
    pub vm_name: String,
    pub operation: Operation,
    pub snapshot_id: Option<String>,
    /// Underlying error message, or the raw status of a failed job.
    pub detail: String,
}

impl VmFailure {
    pub fn new(vm_name: &str, operation: Operation, detail: impl Into<String>) -> Self {
        Self {
            vm_name: vm_name.to_string(),
            operation,
            snapshot_id: None,
            detail: detail.into(),
        }
    }

    pub fn with_snapshot(mut self, snapshot_id: &str) -> Self {
        self.snapshot_id = Some(snapshot_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub selected: usize,
    /// VMs whose new snapshot reached `ok`.
    pub snapshotted: usize,
    /// VMs whose purge pass finished without any error.
    pub purged_clean: usize,
    pub deleted: usize,
    pub failures: Vec<VmFailure>,
}

impl RunReport {
    pub fn new(mode: RunMode, selected: usize) -> Self {
        Self {
            mode,
            selected,
            snapshotted: 0,
            purged_clean: 0,
            deleted: 0,
            failures: Vec::new(),
        }
    }

    /// A run succeeds only if every selected VM went through every step.
    pub fn is_success(&self) -> bool {
        self.purged_clean == self.selected
    }
}
