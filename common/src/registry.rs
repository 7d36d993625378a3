//! Contracts for the external record services.
//!
//! The inspection engine only reads actions and devices and appends inspection records;
//! how they are stored is up to the implementation.

use async_trait::async_trait;

use crate::action::{Action, ActionFilter, ActionPatch};
use crate::device::{Device, DeviceFilter};
use crate::error::RepositoryError;
use crate::inspection::{InspectionRecord, TimeRange};

#[async_trait]
pub trait ActionRegistry: Send + Sync {
    async fn get(&self, filter: &ActionFilter) -> Result<Vec<Action>, RepositoryError>;
    async fn add(&self, actions: Vec<Action>) -> Result<(), RepositoryError>;
    async fn delete(&self, ids: &[u64]) -> Result<(), RepositoryError>;
    async fn update(&self, patches: Vec<ActionPatch>) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn get(&self, filter: &DeviceFilter) -> Result<Vec<Device>, RepositoryError>;
    /// Looks devices up by serial number, preserving the order of `sns`. Unknown serials are skipped.
    async fn get_by_identity(&self, sns: &[String]) -> Result<Vec<Device>, RepositoryError>;
    async fn add(&self, devices: Vec<Device>) -> Result<(), RepositoryError>;
    async fn delete(&self, sns: &[String]) -> Result<(), RepositoryError>;
}

/// Append-only store of inspection records.
#[async_trait]
pub trait InspectionStore: Send + Sync {
    async fn add(&self, records: Vec<InspectionRecord>) -> Result<(), RepositoryError>;
    async fn query(&self, range: TimeRange) -> Result<Vec<InspectionRecord>, RepositoryError>;
}
