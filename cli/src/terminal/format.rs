use colored::*;
use patrol_common::action::Action;
use patrol_common::device::Device;
use patrol_common::inspection::{DeviceOutcome, ExecutionResult, InspectionRecord};
use serde_json::Value;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

const PREVIEW_WIDTH: usize = 48;

/// One line per executed or skipped action of a device.
pub fn outcome_to_details(outcome: &DeviceOutcome) -> Vec<Detail> {
    match outcome {
        DeviceOutcome::Completed { results, skipped } => {
            let mut details: Vec<Detail> = results.iter().map(result_to_detail).collect();
            details.extend(skipped.iter().map(|skip| {
                let value = format!("skipped ({}): {}", skip.class, skip.reason);
                (skip.action_name.clone(), value.color(colors::DEGRADED))
            }));
            details
        }
        DeviceOutcome::Failed(failure) => vec![
            (
                "Status".to_string(),
                format!("failed while {}", failure.stage).color(colors::FAILED).bold(),
            ),
            (
                "Error".to_string(),
                failure.message.as_str().color(colors::FAILED),
            ),
        ],
    }
}

fn result_to_detail(result: &ExecutionResult) -> Detail {
    let rows = result.parse_result.len();
    let summary = match verdict(&result.validation_result) {
        Some(true) => format!("{rows} rows, healthy").color(colors::HEALTHY),
        Some(false) => format!("{rows} rows, check failed").color(colors::DEGRADED),
        None if rows > 0 => format!("{rows} rows").color(colors::TEXT_DEFAULT),
        None => preview(&result.output).color(colors::TEXT_DEFAULT),
    };
    (result.action_name.clone(), summary)
}

/// The `healthy` / `consistent` flag of a hook result, when the hook produced one.
pub fn verdict(validation: &Value) -> Option<bool> {
    let first = match validation {
        Value::Array(items) => items.first()?,
        other => other,
    };
    first
        .get("healthy")
        .or_else(|| first.get("consistent"))
        .and_then(Value::as_bool)
}

/// First non-empty output line, shortened to fit a tree line.
pub fn preview(output: &str) -> String {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("(no output)");
    if line.chars().count() > PREVIEW_WIDTH {
        let cut: String = line.chars().take(PREVIEW_WIDTH - 1).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

pub fn device_to_details(device: &Device) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("SN".to_string(), device.sn.as_str().color(colors::ACCENT)),
        ("IP".to_string(), device.ip.to_string().color(colors::SECONDARY)),
    ];
    for (key, value) in [
        ("Vendor", &device.vendor),
        ("Model", &device.model),
        ("Role", &device.role),
        ("IDC", &device.idc),
    ] {
        if !value.is_empty() {
            details.push((key.to_string(), value.as_str().color(colors::TEXT_DEFAULT)));
        }
    }
    if let Some(port) = device.port {
        details.push(("Port".to_string(), port.to_string().color(colors::TEXT_DEFAULT)));
    }
    details
}

pub fn action_to_details(action: &Action) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![
        ("Command".to_string(), action.cmd.as_str().color(colors::SECONDARY)),
        (
            "Parser".to_string(),
            action
                .parse_type
                .map_or_else(|| "raw".to_string(), |p| p.to_string())
                .color(colors::TEXT_DEFAULT),
        ),
    ];
    if !action.vendor.is_empty() {
        details.push(("Vendor".to_string(), action.vendor.as_str().color(colors::TEXT_DEFAULT)));
    }
    if !action.description.is_empty() {
        details.push((
            "About".to_string(),
            action.description.as_str().color(colors::TEXT_DEFAULT),
        ));
    }
    details
}

pub fn record_to_details(record: &InspectionRecord) -> Vec<Detail> {
    vec![
        ("Action".to_string(), record.action_name.as_str().color(colors::PRIMARY)),
        (
            "Time".to_string(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().color(colors::SECONDARY),
        ),
        ("Output".to_string(), preview(&record.output).color(colors::TEXT_DEFAULT)),
        (
            "Result".to_string(),
            record.validation_result.as_str().color(colors::TEXT_DEFAULT),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_reads_hook_flags() {
        assert_eq!(verdict(&json!([{"healthy": false, "total": 2}])), Some(false));
        assert_eq!(verdict(&json!([{"consistent": true}])), Some(true));
        assert_eq!(verdict(&json!([{"status": "up"}])), None);
        assert_eq!(verdict(&json!([])), None);
    }

    #[test]
    fn preview_takes_first_line_and_truncates() {
        assert_eq!(preview("\n  Version 9.3\nmore"), "Version 9.3");
        assert_eq!(preview(""), "(no output)");
        let long = "x".repeat(80);
        assert_eq!(preview(&long).chars().count(), PREVIEW_WIDTH);
    }
}
