//! VM selection by cluster and name patterns

use osnap_client::{Repository, Vm};
use osnap_config::SelectionConfig;
use osnap_core::error::{OsnapError, Result};
use regex::Regex;
use tracing::{debug, info};

/// Compiled include/exclude name patterns.
///
/// Patterns are unanchored: `web` matches `web01` and `old-web`.
#[derive(Debug, Clone, Default)]
pub struct VmFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl VmFilter {
    /// Compiles the patterns of a selection.
    ///
    /// # Errors
    ///
    /// - `OsnapError::Validation` when either pattern is not a valid regex.
    pub fn compile(selection: &SelectionConfig) -> Result<Self> {
        Ok(Self {
            include: compile_pattern("--vm", selection.include.as_deref())?,
            exclude: compile_pattern("--skip", selection.exclude.as_deref())?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.as_ref().map_or(true, |re| re.is_match(name));
        let excluded = self.exclude.as_ref().is_some_and(|re| re.is_match(name));
        included && !excluded
    }
}

fn compile_pattern(flag: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .filter(|p| !p.is_empty())
        .map(|p| {
            Regex::new(p).map_err(|e| {
                OsnapError::Validation(format!("Invalid {} pattern '{}': {}", flag, p, e))
            })
        })
        .transpose()
}

/// Keeps the VMs in `cluster_id` (when set) whose names pass `filter`.
/// Inventory order is preserved.
pub fn filter_vms(vms: Vec<Vm>, cluster_id: Option<&str>, filter: &VmFilter) -> Vec<Vm> {
    vms.into_iter()
        .filter(|vm| cluster_id.map_or(true, |id| vm.cluster_id.as_deref() == Some(id)))
        .filter(|vm| filter.matches(&vm.name))
        .collect()
}

/// Resolves the cluster filter, then lists and filters the inventory.
///
/// # Errors
///
/// - `OsnapError::UnknownCluster` when the cluster name does not exist.
/// - Any repository error from listing clusters or VMs.
pub async fn select_vms(
    repo: &dyn Repository,
    selection: &SelectionConfig,
    filter: &VmFilter,
) -> Result<Vec<Vm>> {
    let cluster_id = match selection.cluster.as_deref() {
        Some(name) => {
            let cluster = repo.find_cluster_by_name(name).await?;
            debug!(cluster = %cluster.name, cluster_id = %cluster.id, "Resolved cluster");
            Some(cluster.id)
        }
        None => None,
    };

    let inventory = repo.list_vms().await?;
    let total = inventory.len();
    let selected = filter_vms(inventory, cluster_id.as_deref(), filter);
    info!(total, selected = selected.len(), "Selected VMs");

    Ok(selected)
}
