//! # Error Taxonomy
//!
//! | error                        | scope                                   |
//! |------------------------------|-----------------------------------------|
//! | [`InspectError::Connection`] | device-fatal                            |
//! | [`InspectError::CommandTimeout`] | device-fatal unless configured otherwise |
//! | [`SchemaError`]              | action-fatal, the device run continues  |
//! | [`RunError`]                 | orchestrator-level, after the barrier   |
//!
//! A pattern that matches nothing is not an error: it yields an empty row set.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inspection::RunResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no parse content provided for the {0} strategy")]
    Empty(String),

    #[error("invalid regular expression: {0}")]
    InvalidPattern(String),

    #[error("pattern '{0}' has no named capture groups")]
    NoNamedGroups(String),

    #[error("invalid table template: {0}")]
    InvalidTemplate(String),

    #[error("invalid column name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("command '{command}' timed out after {}s", timeout.as_secs_f64())]
    CommandTimeout { command: String, timeout: Duration },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("inspection task aborted: {0}")]
    TaskAborted(String),
}

impl InspectError {
    pub fn connection(host: impl Into<String>, reason: impl ToString) -> Self {
        InspectError::Connection {
            host: host.into(),
            reason: reason.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            InspectError::Connection { .. } => ErrorClass::Connection,
            InspectError::CommandTimeout { .. } => ErrorClass::Timeout,
            InspectError::Schema(_) => ErrorClass::Schema,
            InspectError::TaskAborted(_) => ErrorClass::Aborted,
        }
    }
}

/// Coarse classification kept in run outcomes and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Connection,
    Timeout,
    Schema,
    Aborted,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorClass::Connection => "connection",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Schema => "schema",
            ErrorClass::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Failures of the registries and the inspection store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("action not found: {0}")]
    ActionNotFound(u64),

    #[error("action already exists: {0}")]
    ActionExists(u64),

    #[error("device already exists: {0}")]
    DeviceExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Orchestrator-level failures, surfaced once every device task has finished.
#[derive(Debug, Error)]
pub enum RunError {
    /// The run completed but the records could not be stored. The results are handed back.
    #[error("failed to persist inspection records: {source}")]
    Persist {
        #[source]
        source: RepositoryError,
        run: Box<RunResult>,
    },

    #[error("failed to serialize inspection results: {0}")]
    Serialize(#[from] serde_json::Error),
}
