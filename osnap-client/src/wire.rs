//! oVirt v4 JSON payloads.
//!
//! The engine omits empty collections entirely (`{}`), renders booleans as
//! `"true"`/`"false"` strings and dates as epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cluster, Snapshot, Vm, VmRef};

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VmList {
    #[serde(default)]
    pub vm: Vec<VmDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VmDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cluster: Option<Link>,
}

impl From<VmDto> for Vm {
    fn from(dto: VmDto) -> Self {
        Vm {
            id: dto.id,
            name: dto.name,
            cluster_id: dto.cluster.map(|c| c.id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClusterList {
    #[serde(default)]
    pub cluster: Vec<ClusterDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClusterDto {
    pub id: String,
    pub name: String,
}

impl From<ClusterDto> for Cluster {
    fn from(dto: ClusterDto) -> Self {
        Cluster {
            id: dto.id,
            name: dto.name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SnapshotList {
    #[serde(default)]
    pub snapshot: Vec<SnapshotDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotDto {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub snapshot_status: Option<String>,
    #[serde(default)]
    pub persist_memorystate: Option<FlexBool>,
    #[serde(default)]
    pub date: Option<FlexDate>,
    #[serde(default)]
    pub vm: Option<Link>,
}

impl SnapshotDto {
    /// `vm_id` fills in the owner when the engine leaves the link out.
    pub fn into_snapshot(self, vm_id: &str) -> Snapshot {
        Snapshot {
            id: self.id,
            vm: VmRef {
                id: self.vm.map(|l| l.id).unwrap_or_else(|| vm_id.to_string()),
                name: None,
            },
            description: self.description,
            status: self.snapshot_status.unwrap_or_default(),
            persist_memory_state: self
                .persist_memorystate
                .map(FlexBool::value)
                .unwrap_or(false),
            created_at: self.date.and_then(FlexDate::value),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlexBool {
    Bool(bool),
    Text(String),
}

impl FlexBool {
    fn value(self) -> bool {
        match self {
            FlexBool::Bool(b) => b,
            FlexBool::Text(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlexDate {
    Millis(i64),
    Text(String),
}

impl FlexDate {
    fn value(self) -> Option<DateTime<Utc>> {
        match self {
            FlexDate::Millis(ms) => DateTime::from_timestamp_millis(ms),
            FlexDate::Text(s) => match s.parse::<i64>() {
                Ok(ms) => DateTime::from_timestamp_millis(ms),
                Err(_) => DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|d| d.with_timezone(&Utc)),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateSnapshotRequest<'a> {
    pub description: &'a str,
    pub persist_memorystate: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Fault {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl Fault {
    /// Best human-readable message from an error body.
    pub fn message_from(body: &str) -> String {
        let fault: Fault = serde_json::from_str(body).unwrap_or_default();
        match (fault.reason, fault.detail) {
            (_, Some(detail)) if !detail.trim().is_empty() => detail.trim().to_string(),
            (Some(reason), _) => reason,
            _ => body.trim().chars().take(200).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_with_string_bool_and_millis_date() {
        let dto: SnapshotDto = serde_json::from_str(
            r#"{
                "id": "s1",
                "description": "nightly - created by oSnap",
                "snapshot_status": "locked",
                "persist_memorystate": "false",
                "date": 1527683862000,
                "vm": {"href": "/ovirt-engine/api/vms/v1", "id": "v1"}
            }"#,
        )
        .unwrap();
        let snapshot = dto.into_snapshot("ignored");
        assert_eq!(snapshot.vm.id, "v1");
        assert_eq!(snapshot.status, "locked");
        assert!(!snapshot.persist_memory_state);
        assert_eq!(
            snapshot.created_at.map(|d| d.timestamp_millis()),
            Some(1527683862000)
        );
    }

    #[test]
    fn test_snapshot_minimal_payload() {
        let dto: SnapshotDto = serde_json::from_str(r#"{"id": "s2"}"#).unwrap();
        let snapshot = dto.into_snapshot("v9");
        assert_eq!(snapshot.vm.id, "v9");
        assert_eq!(snapshot.status, "");
        assert_eq!(snapshot.description, "");
        assert_eq!(snapshot.created_at, None);
    }

    #[test]
    fn test_rfc3339_date() {
        let date = FlexDate::Text("2018-05-30T14:17:42.000+02:00".into()).value();
        assert_eq!(date.map(|d| d.to_rfc3339()), Some("2018-05-30T12:17:42+00:00".into()));
    }

    #[test]
    fn test_empty_collections() {
        let list: VmList = serde_json::from_str("{}").unwrap();
        assert!(list.vm.is_empty());
        let list: SnapshotList = serde_json::from_str("{}").unwrap();
        assert!(list.snapshot.is_empty());
    }

    #[test]
    fn test_fault_message() {
        assert_eq!(
            Fault::message_from(r#"{"reason": "Operation Failed", "detail": "[Cannot create Snapshot. VM is locked.]"}"#),
            "[Cannot create Snapshot. VM is locked.]"
        );
        assert_eq!(
            Fault::message_from(r#"{"reason": "Not Found"}"#),
            "Not Found"
        );
        assert_eq!(Fault::message_from("Bad Gateway"), "Bad Gateway");
    }
}
