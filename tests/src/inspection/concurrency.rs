#![cfg(test)]
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use patrol_common::action::Action;
use patrol_common::config::RunConfig;
use patrol_common::device::Device;
use patrol_core::InspectionService;
use patrol_core::repository::MemoryInspectionStore;
use patrol_plugins::HookRegistry;

use crate::fakes::FakeFleet;

fn fleet_of(count: u8) -> Vec<Device> {
    (1..=count)
        .map(|i| Device::new(format!("SN{i:02}"), IpAddr::V4(Ipv4Addr::new(10, 1, 0, i)), format!("sw-{i:02}")))
        .collect()
}

fn actions() -> Vec<Action> {
    vec![
        Action::new(1, "clock", "show clock"),
        Action::new(2, "uptime", "show uptime"),
    ]
}

async fn peak_with_workers(max_workers: usize, devices: u8) -> (usize, usize) {
    let fleet = Arc::new(FakeFleet::new().with_latency(Duration::from_millis(20)));
    let service = InspectionService::new(
        fleet.clone(),
        HookRegistry::new(),
        Arc::new(MemoryInspectionStore::default()),
        RunConfig::default().with_max_workers(max_workers),
    );

    let run = service.inspect(fleet_of(devices), actions()).await;
    assert_eq!(run.len(), devices as usize);
    assert_eq!(fleet.opened(), fleet.closed());
    (fleet.peak_sessions(), run.failed_count())
}

#[tokio::test]
async fn sessions_never_exceed_the_worker_limit() {
    let (peak, failed) = peak_with_workers(3, 10).await;
    assert_eq!(peak, 3);
    assert_eq!(failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn limit_holds_on_a_multi_threaded_runtime() {
    let (peak, _) = peak_with_workers(4, 16).await;
    assert!(peak <= 4, "peak {peak} exceeded the limit");
}

#[tokio::test]
async fn zero_workers_still_makes_progress() {
    let (peak, failed) = peak_with_workers(0, 3).await;
    assert_eq!(peak, 1);
    assert_eq!(failed, 0);
}

#[tokio::test]
async fn limit_above_fleet_size_opens_everything_at_once() {
    let (peak, _) = peak_with_workers(32, 5).await;
    assert_eq!(peak, 5);
}
