#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::TimeDelta;

use patrol_common::action::{Action, ParseStrategy};
use patrol_common::config::{Credentials, RunConfig};
use patrol_common::device::Device;
use patrol_common::inspection::{DeviceOutcome, FailureStage, Row, TimeRange};
use patrol_common::registry::InspectionStore;
use patrol_core::InspectionService;
use patrol_core::repository::{JsonLinesStore, MemoryInspectionStore};
use patrol_plugins::HookRegistry;
use serde_json::json;

use crate::fakes::FakeFleet;

const VERSION_OUTPUT: &str = "Cisco Nexus Operating System (NX-OS) Software\n  NXOS: version 9.3(8)\n";
const FAN_OUTPUT: &str = "Fan   Status\n----  ------\n1     Normal\n2     Normal\n";

fn device(sn: &str, last_octet: u8) -> Device {
    Device::new(sn, IpAddr::V4(Ipv4Addr::new(192, 168, 1, last_octet)), sn.to_lowercase())
        .with_vendor("cisco")
}

fn version_action() -> Action {
    Action::new(1, "check_version", "show version")
        .with_parser(ParseStrategy::Pattern, r"version (?P<version>\S+)")
}

fn fans_action() -> Action {
    Action::new(2, "fans_check", "show environment fan").with_parser(
        ParseStrategy::Table,
        r#"{"header": "^Fan\\s+Status", "columns": [{"name": "fan", "pattern": "\\d+"}, {"name": "status"}]}"#,
    )
}

fn scripted_fleet() -> FakeFleet {
    let mut fleet = FakeFleet::new();
    for sn in ["SN1", "SN2", "SN3"] {
        fleet = fleet
            .reply(sn, "show version", VERSION_OUTPUT)
            .reply(sn, "show environment fan", FAN_OUTPUT);
    }
    fleet
}

fn config() -> RunConfig {
    RunConfig::default()
        .with_credentials(Credentials::new("admin", "admin"))
        .with_max_workers(2)
}

#[tokio::test]
async fn three_devices_one_unreachable() {
    let fleet = Arc::new(scripted_fleet().refuse("SN2"));
    let store = Arc::new(MemoryInspectionStore::default());
    let service = InspectionService::new(fleet.clone(), HookRegistry::builtin(), store.clone(), config());

    let run = service
        .run(
            vec![device("SN1", 1), device("SN2", 2), device("SN3", 3)],
            vec![version_action(), fans_action()],
        )
        .await
        .unwrap();

    assert_eq!(run.len(), 3);
    assert_eq!(run.failed_count(), 1);
    match run.get("SN2").unwrap() {
        DeviceOutcome::Failed(failure) => assert_eq!(failure.stage, FailureStage::Connecting),
        other => panic!("SN2 should have failed, got {other:?}"),
    }
    for sn in ["SN1", "SN3"] {
        let results = run.get(sn).unwrap().results();
        assert_eq!(results.len(), 2, "{sn}");
        assert_eq!(
            results[0].validation_result,
            json!([{"consistent": true, "versions": ["9.3(8)"]}])
        );
        assert_eq!(
            results[1].validation_result,
            json!([{"total": 2, "abnormal": 0, "healthy": true}])
        );
    }

    assert!(fleet.calls_for("SN2").is_empty());
    assert_eq!(fleet.opened(), 2);
    assert_eq!(fleet.closed(), 2);
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn actions_execute_in_the_given_order() {
    let fleet = Arc::new(scripted_fleet());
    let service = InspectionService::new(
        fleet.clone(),
        HookRegistry::new(),
        Arc::new(MemoryInspectionStore::default()),
        config(),
    );

    let run = service
        .inspect(vec![device("SN1", 1)], vec![fans_action(), version_action()])
        .await;

    assert_eq!(fleet.calls_for("SN1"), ["show environment fan", "show version"]);
    let names: Vec<&str> = run.get("SN1").unwrap().results().iter().map(|r| r.action_name.as_str()).collect();
    assert_eq!(names, ["fans_check", "check_version"]);
}

#[tokio::test]
async fn registered_hook_replaces_rows_and_others_pass_through() {
    let mut hooks = HookRegistry::new();
    hooks.register("fans_check", |rows: &[Row]| json!({"fans": rows.len()}));

    let service = InspectionService::new(
        Arc::new(scripted_fleet()),
        hooks,
        Arc::new(MemoryInspectionStore::default()),
        config(),
    );
    let run = service
        .inspect(vec![device("SN1", 1)], vec![version_action(), fans_action()])
        .await;

    let results = run.get("SN1").unwrap().results();
    assert_eq!(results[0].validation_result, json!([{"version": "9.3(8)"}]));
    assert_eq!(results[1].validation_result, json!({"fans": 2}));
}

#[tokio::test]
async fn pattern_without_match_yields_no_rows() {
    let action = Action::new(5, "bgp", "show bgp summary")
        .with_parser(ParseStrategy::Pattern, r"Neighbor (?P<peer>\S+)");
    let fleet = FakeFleet::new().reply("SN1", "show bgp summary", "% BGP not active");
    let service = InspectionService::new(
        Arc::new(fleet),
        HookRegistry::new(),
        Arc::new(MemoryInspectionStore::default()),
        config(),
    );

    let run = service.inspect(vec![device("SN1", 1)], vec![action]).await;

    let DeviceOutcome::Completed { results, skipped } = run.get("SN1").unwrap() else {
        panic!("expected completion");
    };
    assert!(skipped.is_empty());
    assert!(results[0].parse_result.is_empty());
    assert_eq!(results[0].output, "% BGP not active");
}

#[tokio::test]
async fn records_survive_a_jsonl_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonLinesStore::new(dir.path().join("inspections.jsonl")));
    let service = InspectionService::new(
        Arc::new(scripted_fleet()),
        HookRegistry::builtin(),
        store.clone(),
        config(),
    );

    let run = service
        .run(vec![device("SN1", 1), device("SN3", 3)], vec![version_action()])
        .await
        .unwrap();

    let window = TimeRange::new(run.started_at, run.started_at + TimeDelta::seconds(1));
    let mut records = store.query(window).await.unwrap();
    records.sort_by(|a, b| a.sn.cmp(&b.sn));

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sn, "SN1");
    assert_eq!(records[0].output, VERSION_OUTPUT);
    let rows: Vec<Row> = serde_json::from_str(&records[0].parse_result).unwrap();
    assert_eq!(rows[0]["version"], "9.3(8)");
}
