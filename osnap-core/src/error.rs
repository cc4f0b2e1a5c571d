use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OsnapError {
    Config(String),
    Validation(String),
    UnknownCluster(String),
    Network(String),
    Api { status: u16, message: String },
    Serialization(String),
    Io(#[from] std::io::Error),
    Cancelled,
    Other(#[from] anyhow::Error),
}

impl OsnapError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        OsnapError::Api {
            status,
            message: message.into(),
        }
    }

    /// Errors that abort a run before any VM is touched.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            OsnapError::Config(_) | OsnapError::Validation(_) | OsnapError::UnknownCluster(_)
        )
    }
}

impl Display for OsnapError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            OsnapError::Config(s) => write!(f, "Configuration error: {}", s),
            OsnapError::Validation(s) => write!(f, "Invalid input: {}", s),
            OsnapError::UnknownCluster(name) => write!(f, "Unknown cluster: {}", name),
            OsnapError::Network(s) => write!(f, "Network error: {}", s),
            OsnapError::Api { status, message } => {
                if message.is_empty() {
                    write!(f, "API request failed with status {}", status)
                } else {
                    write!(f, "API request failed with status {}: {}", status, message)
                }
            }
            OsnapError::Serialization(s) => write!(f, "Serialization error: {}", s),
            OsnapError::Io(e) => write!(f, "I/O error: {}", e),
            OsnapError::Cancelled => write!(f, "Operation cancelled"),
            OsnapError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl From<serde_yaml_ng::Error> for OsnapError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        OsnapError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for OsnapError {
    fn from(err: serde_json::Error) -> Self {
        OsnapError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OsnapError>;
