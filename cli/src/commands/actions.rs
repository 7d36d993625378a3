use crate::commands::ActionsArgs;
use crate::inventory;
use crate::mprint;
use crate::terminal::{format, print};

pub async fn actions(args: ActionsArgs) -> anyhow::Result<()> {
    let registry = inventory::action_registry(&args.inventory.path).await?;
    let actions = inventory::select_actions(&registry, &args.select).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(());
    }
    if actions.is_empty() {
        print::no_results("actions");
        return Ok(());
    }

    print::header("actions");
    for (idx, action) in actions.iter().enumerate() {
        if idx > 0 {
            mprint!();
        }
        print::tree_head(action.id as usize, &action.name);
        print::detail_tree(&format::action_to_details(action));
    }
    print::footer();
    Ok(())
}
