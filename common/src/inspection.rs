//! # Inspection Results
//!
//! Per-run result types and their flattened, persisted form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorClass, InspectError};

/// One parsed row: column name to captured text.
pub type Row = BTreeMap<String, String>;

/// The outcome of one action on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action_id: u64,
    pub action_name: String,
    pub output: String,
    pub parse_result: Vec<Row>,
    /// The parsed rows, or the value derived by the validation hook registered for the action.
    pub validation_result: Value,
}

/// An action that was skipped while the rest of the device run continued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub action_id: u64,
    pub action_name: String,
    pub class: ErrorClass,
    pub reason: String,
}

impl ActionFailure {
    pub fn new(action_id: u64, action_name: &str, err: &InspectError) -> Self {
        Self {
            action_id,
            action_name: action_name.to_string(),
            class: err.class(),
            reason: err.to_string(),
        }
    }
}

/// Where a device run was when it was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum FailureStage {
    Connecting,
    Executing { index: usize, action: String },
    /// The device task itself died (e.g. panicked) outside the runner's control.
    Task,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Connecting => write!(f, "connecting"),
            FailureStage::Executing { index, action } => {
                write!(f, "executing #{index} ({action})")
            }
            FailureStage::Task => write!(f, "task"),
        }
    }
}

/// Marker stored in place of results for a device that could not be inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFailure {
    pub class: ErrorClass,
    #[serde(flatten)]
    pub stage: FailureStage,
    pub message: String,
}

impl DeviceFailure {
    pub fn new(stage: FailureStage, err: &InspectError) -> Self {
        Self {
            class: err.class(),
            stage,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeviceOutcome {
    Completed {
        results: Vec<ExecutionResult>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<ActionFailure>,
    },
    Failed(DeviceFailure),
}

impl DeviceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DeviceOutcome::Failed(_))
    }

    pub fn results(&self) -> &[ExecutionResult] {
        match self {
            DeviceOutcome::Completed { results, .. } => results,
            DeviceOutcome::Failed(_) => &[],
        }
    }
}

/// Everything one run produced, keyed by device serial number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub started_at: DateTime<Utc>,
    pub devices: BTreeMap<String, DeviceOutcome>,
}

impl RunResult {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            devices: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, sn: &str) -> Option<&DeviceOutcome> {
        self.devices.get(sn)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&String, &DeviceFailure)> {
        self.devices.iter().filter_map(|(sn, outcome)| match outcome {
            DeviceOutcome::Failed(failure) => Some((sn, failure)),
            DeviceOutcome::Completed { .. } => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Flattens the run into persistable records, one per (device, action).
    ///
    /// Failed devices contribute no records.
    pub fn to_records(&self) -> Result<Vec<InspectionRecord>, serde_json::Error> {
        let mut records = Vec::new();
        for (sn, outcome) in &self.devices {
            for result in outcome.results() {
                records.push(InspectionRecord {
                    sn: sn.clone(),
                    action_id: result.action_id,
                    action_name: result.action_name.clone(),
                    output: result.output.clone(),
                    parse_result: serde_json::to_string(&result.parse_result)?,
                    validation_result: to_transport_string(&result.validation_result)?,
                    timestamp: self.started_at,
                });
            }
        }
        Ok(records)
    }
}

/// Strings are kept verbatim, every other value is encoded as JSON.
fn to_transport_string(value: &Value) -> Result<String, serde_json::Error> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => serde_json::to_string(other),
    }
}

/// Persisted, flattened form of an [`ExecutionResult`]. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub sn: String,
    pub action_id: u64,
    pub action_name: String,
    pub output: String,
    pub parse_result: String,
    pub validation_result: String,
    pub timestamp: DateTime<Utc>,
}

/// Half-open time window `[start, end)` used to query stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant < self.end
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
