//! In-memory [`Repository`] for tests.
//!
//! Snapshot jobs follow a scripted list of statuses: every poll consumes the
//! next entry and the last one sticks. Failures can be injected per VM or per
//! snapshot, and every mutating call is recorded for assertions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{Cluster, Snapshot, Vm, VmRef};
use crate::Repository;
use osnap_core::error::{OsnapError, Result};

const INITIAL_STATUS: &str = "pending";
const EPOCH_SECS: i64 = 1_700_000_000;

#[derive(Default)]
struct PlannedCreate {
    snapshot_id: Option<String>,
    statuses: Vec<String>,
}

#[derive(Default)]
struct MockState {
    vms: Vec<Vm>,
    clusters: Vec<Cluster>,
    snapshots: HashMap<String, Vec<Snapshot>>,
    planned: HashMap<String, PlannedCreate>,
    scripts: HashMap<String, VecDeque<String>>,

    fail_list_vms: bool,
    fail_create: HashMap<String, String>,
    fail_poll: HashSet<String>,
    fail_list_snapshots: HashSet<String>,
    fail_delete: HashSet<String>,

    clock: i64,
    next_id: u64,
    created: Vec<(String, String)>,
    deleted: Vec<(String, String)>,
    polls: HashMap<String, usize>,
}

impl MockState {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::from_timestamp(EPOCH_SECS, 0).unwrap_or_default() + Duration::minutes(self.clock)
    }

    fn vm_name(&self, vm_id: &str) -> Option<String> {
        self.vms
            .iter()
            .find(|vm| vm.id == vm_id)
            .map(|vm| vm.name.clone())
    }

    fn find_snapshot_mut(&mut self, vm_id: &str, snapshot_id: &str) -> Option<&mut Snapshot> {
        self.snapshots
            .get_mut(vm_id)?
            .iter_mut()
            .find(|s| s.id == snapshot_id)
    }
}

#[derive(Default)]
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_mut(&mut self) -> &mut MockState {
        self.state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- Builders ---

    pub fn with_vm(mut self, id: &str, name: &str, cluster_id: Option<&str>) -> Self {
        self.state_mut().vms.push(Vm::new(id, name, cluster_id));
        self
    }

    pub fn with_cluster(mut self, id: &str, name: &str) -> Self {
        self.state_mut().clusters.push(Cluster {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Adds a finished snapshot. Each call is timestamped later than the
    /// previous one.
    pub fn with_snapshot(mut self, vm_id: &str, snapshot_id: &str, description: &str) -> Self {
        let state = self.state_mut();
        let created_at = Some(state.tick());
        let name = state.vm_name(vm_id);
        state
            .snapshots
            .entry(vm_id.to_string())
            .or_default()
            .push(Snapshot {
                id: snapshot_id.to_string(),
                vm: VmRef {
                    id: vm_id.to_string(),
                    name,
                },
                description: description.to_string(),
                status: "ok".to_string(),
                persist_memory_state: false,
                created_at,
            });
        self
    }

    /// Adds a finished snapshot with an explicit (or missing) timestamp.
    pub fn with_snapshot_at(
        mut self,
        vm_id: &str,
        snapshot_id: &str,
        description: &str,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        let state = self.state_mut();
        let name = state.vm_name(vm_id);
        state
            .snapshots
            .entry(vm_id.to_string())
            .or_default()
            .push(Snapshot {
                id: snapshot_id.to_string(),
                vm: VmRef {
                    id: vm_id.to_string(),
                    name,
                },
                description: description.to_string(),
                status: "ok".to_string(),
                persist_memory_state: false,
                created_at,
            });
        self
    }

    /// The next snapshot created for `vm_id` gets `snapshot_id` and reports
    /// `statuses` on successive polls.
    pub fn on_create(mut self, vm_id: &str, snapshot_id: &str, statuses: &[&str]) -> Self {
        self.state_mut().planned.insert(
            vm_id.to_string(),
            PlannedCreate {
                snapshot_id: Some(snapshot_id.to_string()),
                statuses: statuses.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn fail_list_vms(mut self) -> Self {
        self.state_mut().fail_list_vms = true;
        self
    }

    pub fn fail_create(mut self, vm_id: &str, message: &str) -> Self {
        self.state_mut()
            .fail_create
            .insert(vm_id.to_string(), message.to_string());
        self
    }

    pub fn fail_poll(mut self, snapshot_id: &str) -> Self {
        self.state_mut().fail_poll.insert(snapshot_id.to_string());
        self
    }

    pub fn fail_list_snapshots(mut self, vm_id: &str) -> Self {
        self.state_mut()
            .fail_list_snapshots
            .insert(vm_id.to_string());
        self
    }

    pub fn fail_delete(mut self, snapshot_id: &str) -> Self {
        self.state_mut()
            .fail_delete
            .insert(snapshot_id.to_string());
        self
    }

    // --- Inspection ---

    /// `(vm_id, description)` for every successful create call.
    pub fn created(&self) -> Vec<(String, String)> {
        self.state().created.clone()
    }

    /// `(vm_id, snapshot_id)` for every successful delete call.
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.state().deleted.clone()
    }

    pub fn snapshot_ids(&self, vm_id: &str) -> Vec<String> {
        self.state()
            .snapshots
            .get(vm_id)
            .map(|list| list.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn poll_count(&self, snapshot_id: &str) -> usize {
        self.state().polls.get(snapshot_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_vms(&self) -> Result<Vec<Vm>> {
        let state = self.state();
        if state.fail_list_vms {
            return Err(OsnapError::Network("connection refused".to_string()));
        }
        Ok(state.vms.clone())
    }

    async fn find_cluster_by_name(&self, name: &str) -> Result<Cluster> {
        self.state()
            .clusters
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| OsnapError::UnknownCluster(name.to_string()))
    }

    async fn create_snapshot(&self, vm_id: &str, description: &str) -> Result<Snapshot> {
        let mut state = self.state();
        if let Some(message) = state.fail_create.get(vm_id) {
            return Err(OsnapError::api(409, message.clone()));
        }

        let planned = state.planned.remove(vm_id).unwrap_or_default();
        state.next_id += 1;
        let snapshot_id = planned
            .snapshot_id
            .unwrap_or_else(|| format!("{vm_id}-snap-{}", state.next_id));
        let statuses = if planned.statuses.is_empty() {
            vec!["ok".to_string()]
        } else {
            planned.statuses
        };
        state
            .scripts
            .insert(snapshot_id.clone(), statuses.into_iter().collect());

        let created_at = Some(state.tick());
        let snapshot = Snapshot {
            id: snapshot_id,
            vm: VmRef {
                id: vm_id.to_string(),
                name: state.vm_name(vm_id),
            },
            description: description.to_string(),
            status: INITIAL_STATUS.to_string(),
            persist_memory_state: false,
            created_at,
        };
        state
            .snapshots
            .entry(vm_id.to_string())
            .or_default()
            .push(snapshot.clone());
        state
            .created
            .push((vm_id.to_string(), description.to_string()));

        Ok(snapshot)
    }

    async fn get_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<Snapshot> {
        let mut state = self.state();
        *state.polls.entry(snapshot_id.to_string()).or_default() += 1;

        if state.fail_poll.contains(snapshot_id) {
            return Err(OsnapError::Network("read timed out".to_string()));
        }

        let next_status = state.scripts.get_mut(snapshot_id).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        });

        let snapshot = state
            .find_snapshot_mut(vm_id, snapshot_id)
            .ok_or_else(|| OsnapError::api(404, format!("Snapshot {snapshot_id} not found")))?;
        if let Some(status) = next_status {
            snapshot.status = status;
        }
        Ok(snapshot.clone())
    }

    async fn list_snapshots(&self, vm_id: &str) -> Result<Vec<Snapshot>> {
        let state = self.state();
        if state.fail_list_snapshots.contains(vm_id) {
            return Err(OsnapError::api(500, "Internal server error"));
        }
        Ok(state.snapshots.get(vm_id).cloned().unwrap_or_default())
    }

    async fn delete_snapshot(&self, vm_id: &str, snapshot_id: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_delete.contains(snapshot_id) {
            return Err(OsnapError::api(409, "Cannot remove Snapshot. Snapshot is locked."));
        }

        let list = state
            .snapshots
            .get_mut(vm_id)
            .ok_or_else(|| OsnapError::api(404, format!("VM {vm_id} not found")))?;
        let before = list.len();
        list.retain(|s| s.id != snapshot_id);
        if list.len() == before {
            return Err(OsnapError::api(404, format!("Snapshot {snapshot_id} not found")));
        }

        state
            .deleted
            .push((vm_id.to_string(), snapshot_id.to_string()));
        Ok(())
    }
}
