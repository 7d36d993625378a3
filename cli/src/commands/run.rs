use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use patrol_common::device::Device;
use patrol_common::error::RunError;
use patrol_common::inspection::RunResult;
use patrol_common::registry::InspectionStore;
use patrol_common::success;
use patrol_core::InspectionService;
use patrol_core::executor::SshExecutor;
use patrol_core::repository::{JsonLinesStore, MemoryInspectionStore};
use patrol_plugins::HookRegistry;
use tracing::{error, warn};

use crate::commands::RunArgs;
use crate::inventory;
use crate::mprint;
use crate::terminal::{colors, format, print, spinner::RunProgress};

const KEY_WIDTH: usize = 7;

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let device_registry = inventory::device_registry(&args.devices.path).await?;
    let action_registry = inventory::action_registry(&args.actions.path).await?;
    let devices = inventory::select_devices(&device_registry, &args.select).await?;
    let actions = inventory::select_actions(&action_registry, &args.action_select).await?;

    if devices.is_empty() {
        print::no_results("devices");
        return Ok(());
    }
    if actions.is_empty() {
        warn!("no actions selected, devices will only be logged into");
    }

    let config = args.run_config();
    let store: Arc<dyn InspectionStore> = if args.dry_run {
        Arc::new(MemoryInspectionStore::default())
    } else {
        Arc::new(JsonLinesStore::new(&args.store.path))
    };
    let store_label = match args.dry_run {
        true => "dry run, nothing stored".to_string(),
        false => args.store.path.display().to_string(),
    };

    print::aligned_line("Devices", devices.len().to_string(), KEY_WIDTH);
    print::aligned_line("Actions", actions.len().to_string(), KEY_WIDTH);
    print::aligned_line("Workers", config.worker_limit().to_string(), KEY_WIDTH);
    print::aligned_line("Store", store_label, KEY_WIDTH);

    let progress = RunProgress::start(devices.len());
    let service = InspectionService::new(
        Arc::new(SshExecutor::from_config(&config)),
        HookRegistry::builtin(),
        store,
        config,
    )
    .with_progress(progress.reporter());

    let start_time = Instant::now();
    let outcome = service.run(devices.clone(), actions).await;
    progress.finish();

    let run = match outcome {
        Ok(run) => {
            if !args.dry_run {
                success!("records appended to {}", args.store.path.display());
            }
            run
        }
        Err(RunError::Persist { source, run }) => {
            error!("results were not stored: {source}");
            *run
        }
        Err(err) => return Err(err).context("inspection run failed"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    run_ends(&run, &devices, start_time.elapsed());
    Ok(())
}

fn run_ends(run: &RunResult, devices: &[Device], total_time: Duration) {
    print::header("inspection report");
    print_devices(run, devices);
    print_summary(run, total_time);
}

fn print_devices(run: &RunResult, devices: &[Device]) {
    let mut idx = 0;
    for device in devices {
        let Some(outcome) = run.get(&device.sn) else {
            continue;
        };
        if idx > 0 {
            mprint!();
        }
        print::tree_head(idx, &format!("{} ({})", device.hostname, device.sn));
        print::detail_tree(&format::outcome_to_details(outcome));
        idx += 1;
    }
}

fn print_summary(run: &RunResult, total_time: Duration) {
    let failed = run.failed_count();
    let ok: ColoredString = format!("{} inspected", run.len() - failed).bold().green();
    let failed: ColoredString = match failed {
        0 => "0 failed".normal(),
        n => format!("{n} failed").bold().red(),
    };
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString = format!("Inspection Complete: {ok}, {failed} in {total_time}")
        .color(colors::TEXT_DEFAULT);

    print::fat_separator();
    print::centerln(&output.to_string());
}
