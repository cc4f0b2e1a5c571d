//! Classification of platform snapshot statuses.
//!
//! The engine reports an open-ended vocabulary (`locked`, `in_preview`, `ok`,
//! `failed`, ...). Everything that is neither the success marker nor starts
//! with a failure prefix counts as still in progress. Matching is
//! case-sensitive, as the engine reports statuses in lower case.

/// Status of a finished, usable snapshot.
pub const SUCCESS_STATUS: &str = "ok";

/// Status prefixes that end a snapshot job as failed.
pub const FAILURE_PREFIXES: &[&str] = &["fail", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    Pending,
    Succeeded,
    Failed,
}

impl SnapshotState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SnapshotState::Pending)
    }
}

pub fn classify(status: &str) -> SnapshotState {
    if status == SUCCESS_STATUS {
        SnapshotState::Succeeded
    } else if FAILURE_PREFIXES
        .iter()
        .any(|prefix| status.starts_with(prefix))
    {
        SnapshotState::Failed
    } else {
        SnapshotState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert_eq!(classify("ok"), SnapshotState::Succeeded);
        assert!(classify("ok").is_terminal());
    }

    #[test]
    fn test_failure_families() {
        for status in ["failed", "failure", "fail", "error", "error_locked"] {
            assert_eq!(classify(status), SnapshotState::Failed, "{status}");
        }
    }

    #[test]
    fn test_everything_else_is_pending() {
        for status in ["locked", "in_preview", "pending", "", "OK", "okay", "not_failed"] {
            assert_eq!(classify(status), SnapshotState::Pending, "{status}");
            assert!(!classify(status).is_terminal());
        }
    }
}
