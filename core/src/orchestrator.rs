//! # Inspection Service
//!
//! Implements the "inspect the fleet" use case.
//!
//! Every device gets its own task; a semaphore sized to the worker limit decides how many of
//! them hold a session at once. The coordinator is the only writer of the [`RunResult`]: tasks
//! hand their outcome back through their join handle, and the run is complete once every
//! handle has resolved.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use patrol_common::action::Action;
use patrol_common::config::RunConfig;
use patrol_common::device::Device;
use patrol_common::error::{InspectError, RunError};
use patrol_common::executor::RemoteExecutor;
use patrol_common::inspection::{DeviceFailure, DeviceOutcome, FailureStage, RunResult};
use patrol_common::registry::InspectionStore;
use patrol_common::success;
use patrol_plugins::HookRegistry;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::plan::ActionPlan;
use crate::runner::{DeviceRunner, RunnerPolicy};

/// Called with `(finished, total)` each time a device completes.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Application service for fleet inspections.
///
/// Orchestrates a run by:
/// 1. compiling the action list once into an [`ActionPlan`].
/// 2. fanning a [`DeviceRunner`] out over the devices, bounded by the worker limit.
/// 3. flattening the outcomes into records and appending them to the [`InspectionStore`].
pub struct InspectionService {
    executor: Arc<dyn RemoteExecutor>,
    hooks: Arc<HookRegistry>,
    store: Arc<dyn InspectionStore>,
    config: RunConfig,
    on_progress: Option<ProgressCallback>,
}

impl InspectionService {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        hooks: HookRegistry,
        store: Arc<dyn InspectionStore>,
        config: RunConfig,
    ) -> Self {
        Self {
            executor,
            hooks: Arc::new(hooks),
            store,
            config,
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Inspects `devices` with `actions` and persists the resulting records.
    ///
    /// When persisting fails, the complete [`RunResult`] is returned inside
    /// [`RunError::Persist`].
    pub async fn run(
        &self,
        devices: Vec<Device>,
        actions: Vec<Action>,
    ) -> Result<RunResult, RunError> {
        let run = self.inspect(devices, actions).await;
        let records = run.to_records()?;
        if records.is_empty() {
            debug!("nothing to persist");
            return Ok(run);
        }

        let count = records.len();
        match self.store.add(records).await {
            Ok(()) => {
                info!(records = count, "inspection records stored");
                Ok(run)
            }
            Err(source) => {
                error!("failed to store {count} inspection records: {source}");
                Err(RunError::Persist {
                    source,
                    run: Box::new(run),
                })
            }
        }
    }

    /// Runs the inspection without persisting anything.
    ///
    /// The result holds exactly one entry per distinct device serial number.
    pub async fn inspect(&self, devices: Vec<Device>, actions: Vec<Action>) -> RunResult {
        let mut run = RunResult::new(Utc::now());
        let devices = dedup_by_sn(devices);
        let total = devices.len();
        if total == 0 {
            warn!("no devices selected, nothing to inspect");
            return run;
        }

        let plan = Arc::new(ActionPlan::compile(actions));
        let runner = DeviceRunner::new(
            self.executor.clone(),
            self.hooks.clone(),
            plan.clone(),
            RunnerPolicy::from(&self.config),
        );
        let limit = self.config.worker_limit();
        let permits = Arc::new(Semaphore::new(limit));
        let credentials = Arc::new(self.config.credentials.clone());

        info!(
            devices = total,
            actions = plan.len(),
            workers = limit,
            "starting inspection"
        );

        let mut pending = FuturesUnordered::new();
        for device in devices {
            let runner = runner.clone();
            let permits = permits.clone();
            let credentials = credentials.clone();
            let sn = device.sn.clone();

            let handle = tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_closed) => {
                        let err = InspectError::TaskAborted("worker pool closed".into());
                        return DeviceOutcome::Failed(DeviceFailure::new(FailureStage::Task, &err));
                    }
                };
                runner.run(&device, &credentials).await
            });
            pending.push(async move { (sn, handle.await) });
        }

        let mut finished = 0;
        while let Some((sn, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|join_err| {
                error!(sn = %sn, "inspection task died: {join_err}");
                let err = InspectError::TaskAborted(join_err.to_string());
                DeviceOutcome::Failed(DeviceFailure::new(FailureStage::Task, &err))
            });
            run.devices.insert(sn, outcome);

            finished += 1;
            if let Some(callback) = &self.on_progress {
                callback(finished, total);
            }
        }

        let failed = run.failed_count();
        success!(
            "inspected {} devices ({} ok, {} failed)",
            run.len(),
            run.len() - failed,
            failed
        );
        run
    }
}

/// Keeps the first device of every serial number, preserving order.
fn dedup_by_sn(devices: Vec<Device>) -> Vec<Device> {
    let mut seen = HashSet::new();
    devices
        .into_iter()
        .filter(|device| {
            let fresh = seen.insert(device.sn.clone());
            if !fresh {
                warn!(sn = %device.sn, "duplicate device ignored");
            }
            fresh
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
