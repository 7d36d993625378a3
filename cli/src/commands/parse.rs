use anyhow::{Context, anyhow};
use patrol_common::action::ActionFilter;
use patrol_common::registry::ActionRegistry;
use patrol_plugins::HookRegistry;
use patrol_protocols::Parser;
use serde_json::json;
use tokio::io::AsyncReadExt;

use crate::commands::ParseArgs;
use crate::inventory;

pub async fn parse(args: ParseArgs) -> anyhow::Result<()> {
    let registry = inventory::action_registry(&args.inventory.path).await?;
    let filter = ActionFilter {
        id: Some(args.id),
        ..Default::default()
    };
    let action = registry
        .get(&filter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("action {} not found in {}", args.id, args.inventory.path.display()))?;

    let raw = match &args.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read stdin")?;
            raw
        }
    };

    let parser = Parser::for_action(&action)
        .with_context(|| format!("action '{}' has an unusable parse schema", action.name))?;
    let rows = parser.parse(&raw);
    let validation = HookRegistry::builtin().validate(&action.name, &rows);

    let report = json!({
        "action_id": action.id,
        "action_name": action.name,
        "parse_result": rows,
        "validation_result": validation,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
