use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use patrol_common::action::{Action, ActionFilter, ActionPatch};
use patrol_common::device::{Device, DeviceFilter};
use patrol_common::error::RepositoryError;
use patrol_common::inspection::{InspectionRecord, TimeRange};
use patrol_common::registry::{ActionRegistry, DeviceRegistry, InspectionStore};
use tracing::debug;

/// Actions keyed by id; `get` returns them in id order.
#[derive(Debug, Default)]
pub struct MemoryActionRegistry {
    actions: RwLock<BTreeMap<u64, Action>>,
}

impl MemoryActionRegistry {
    /// Builds a registry from an inventory. A repeated id is rejected.
    pub fn with_actions(actions: Vec<Action>) -> Result<Self, RepositoryError> {
        let mut map = BTreeMap::new();
        for action in actions {
            let id = action.id;
            if map.insert(id, action).is_some() {
                return Err(RepositoryError::ActionExists(id));
            }
        }
        Ok(Self {
            actions: RwLock::new(map),
        })
    }
}

#[async_trait]
impl ActionRegistry for MemoryActionRegistry {
    async fn get(&self, filter: &ActionFilter) -> Result<Vec<Action>, RepositoryError> {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(actions
            .values()
            .filter(|action| filter.matches(action))
            .cloned()
            .collect())
    }

    async fn add(&self, actions: Vec<Action>) -> Result<(), RepositoryError> {
        let mut stored = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        let mut batch = BTreeMap::new();
        for action in actions {
            let id = action.id;
            if stored.contains_key(&id) || batch.insert(id, action).is_some() {
                return Err(RepositoryError::ActionExists(id));
            }
        }
        debug!(count = batch.len(), "actions added");
        stored.append(&mut batch);
        Ok(())
    }

    async fn delete(&self, ids: &[u64]) -> Result<(), RepositoryError> {
        let mut stored = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn update(&self, patches: Vec<ActionPatch>) -> Result<(), RepositoryError> {
        let mut stored = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(missing) = patches.iter().find(|p| !stored.contains_key(&p.id)) {
            return Err(RepositoryError::ActionNotFound(missing.id));
        }
        for patch in patches {
            if let Some(action) = stored.get_mut(&patch.id) {
                patch.apply(action);
            }
        }
        Ok(())
    }
}

/// Devices in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDeviceRegistry {
    devices: RwLock<Vec<Device>>,
}

impl MemoryDeviceRegistry {
    /// Builds a registry from an inventory. A repeated serial number is rejected.
    pub fn with_devices(devices: Vec<Device>) -> Result<Self, RepositoryError> {
        let mut stored = Vec::with_capacity(devices.len());
        insert_devices(&mut stored, devices)?;
        Ok(Self {
            devices: RwLock::new(stored),
        })
    }
}

fn insert_devices(stored: &mut Vec<Device>, devices: Vec<Device>) -> Result<(), RepositoryError> {
    let mut known: HashSet<&str> = stored.iter().map(|d| d.sn.as_str()).collect();
    for device in &devices {
        if !known.insert(device.sn.as_str()) {
            return Err(RepositoryError::DeviceExists(device.sn.clone()));
        }
    }
    stored.extend(devices);
    Ok(())
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn get(&self, filter: &DeviceFilter) -> Result<Vec<Device>, RepositoryError> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(devices.iter().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn get_by_identity(&self, sns: &[String]) -> Result<Vec<Device>, RepositoryError> {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sns
            .iter()
            .filter_map(|sn| devices.iter().find(|d| &d.sn == sn))
            .cloned()
            .collect())
    }

    async fn add(&self, devices: Vec<Device>) -> Result<(), RepositoryError> {
        let mut stored = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        insert_devices(&mut stored, devices)
    }

    async fn delete(&self, sns: &[String]) -> Result<(), RepositoryError> {
        let mut stored = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        stored.retain(|d| !sns.contains(&d.sn));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryInspectionStore {
    records: RwLock<Vec<InspectionRecord>>,
}

impl MemoryInspectionStore {
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InspectionStore for MemoryInspectionStore {
    async fn add(&self, records: Vec<InspectionRecord>) -> Result<(), RepositoryError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
        Ok(())
    }

    async fn query(&self, range: TimeRange) -> Result<Vec<InspectionRecord>, RepositoryError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .filter(|r| range.contains(&r.timestamp))
            .cloned()
            .collect())
    }
}
