//! Hooks shipped with patrol.
//!
//! Each hook returns a one-element list of objects, so stored validation results keep the same
//! list-of-objects shape as raw parsed rows.

use std::collections::BTreeSet;

use patrol_common::inspection::Row;
use serde_json::{Value, json};

use crate::HookRegistry;

/// Status values counted as healthy by the hardware checks (case-insensitive).
const HEALTHY_STATES: &[&str] = &["normal", "ok", "good", "up", "present", "powered-on", "on"];

pub fn register_all(registry: &mut HookRegistry) {
    registry
        .register("check_version", check_version)
        .register("fans_check", status_summary)
        .register("power_check", status_summary);
}

/// Collects the distinct `version` values. A device is consistent when it runs one version.
pub fn check_version(rows: &[Row]) -> Value {
    let versions: BTreeSet<&str> = rows
        .iter()
        .filter_map(|row| row.get("version"))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();

    json!([{
        "consistent": versions.len() == 1,
        "versions": versions,
    }])
}

/// Counts rows whose `status` column is not a healthy state.
pub fn status_summary(rows: &[Row]) -> Value {
    let abnormal = rows
        .iter()
        .filter(|row| {
            let status = row.get("status").map(|s| s.trim().to_ascii_lowercase());
            !status.is_some_and(|s| HEALTHY_STATES.contains(&s.as_str()))
        })
        .count();

    json!([{
        "total": rows.len(),
        "abnormal": abnormal,
        "healthy": !rows.is_empty() && abnormal == 0,
    }])
}
