//! Inventory files: devices and actions as JSON arrays, loaded into the in-memory registries.

use std::path::Path;

use anyhow::Context;
use patrol_common::action::Action;
use patrol_common::device::Device;
use patrol_common::registry::{ActionRegistry, DeviceRegistry};
use patrol_core::repository::{MemoryActionRegistry, MemoryDeviceRegistry};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::commands::{ActionSelect, DeviceSelect};

async fn load<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {what} inventory {}", path.display()))?;
    let items: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("invalid {what} inventory {}", path.display()))?;
    debug!(path = %path.display(), count = items.len(), "{what} inventory loaded");
    Ok(items)
}

pub async fn device_registry(path: &Path) -> anyhow::Result<MemoryDeviceRegistry> {
    let devices: Vec<Device> = load(path, "device").await?;
    MemoryDeviceRegistry::with_devices(devices)
        .with_context(|| format!("duplicate device in {}", path.display()))
}

pub async fn action_registry(path: &Path) -> anyhow::Result<MemoryActionRegistry> {
    let actions: Vec<Action> = load(path, "action").await?;
    MemoryActionRegistry::with_actions(actions)
        .with_context(|| format!("duplicate action in {}", path.display()))
}

/// Devices picked by serial number (in the order given) or else by the field filter.
pub async fn select_devices(
    registry: &dyn DeviceRegistry,
    select: &DeviceSelect,
) -> anyhow::Result<Vec<Device>> {
    let filter = select.filter();
    let devices = if select.sn.is_empty() {
        registry.get(&filter).await?
    } else {
        let mut devices = registry.get_by_identity(&select.sn).await?;
        devices.retain(|d| filter.matches(d));
        devices
    };
    Ok(devices)
}

/// Actions picked by id (in the order given) or else by the field filter, in id order.
pub async fn select_actions(
    registry: &dyn ActionRegistry,
    select: &ActionSelect,
) -> anyhow::Result<Vec<Action>> {
    let filter = select.filter();
    let mut actions = registry.get(&filter).await?;
    if !select.ids.is_empty() {
        actions = select
            .ids
            .iter()
            .filter_map(|id| actions.iter().find(|a| a.id == *id).cloned())
            .collect();
    }
    Ok(actions)
}
