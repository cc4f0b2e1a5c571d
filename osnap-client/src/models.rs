use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
    pub id: String,
    pub name: String,
    pub cluster_id: Option<String>,
}

impl Vm {
    pub fn new(id: impl Into<String>, name: impl Into<String>, cluster_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cluster_id: cluster_id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
}

/// Reference from a snapshot back to its VM. The API only returns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub vm: VmRef,
    pub description: String,
    /// Raw platform status (`ok`, `locked`, `in_preview`, ...).
    pub status: String,
    pub persist_memory_state: bool,
    pub created_at: Option<DateTime<Utc>>,
}
