use crate::commands::DevicesArgs;
use crate::inventory;
use crate::mprint;
use crate::terminal::{format, print};

pub async fn devices(args: DevicesArgs) -> anyhow::Result<()> {
    let registry = inventory::device_registry(&args.inventory.path).await?;
    let devices = inventory::select_devices(&registry, &args.select).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        print::no_results("devices");
        return Ok(());
    }

    print::header("devices");
    for (idx, device) in devices.iter().enumerate() {
        if idx > 0 {
            mprint!();
        }
        print::tree_head(idx, &device.hostname);
        print::detail_tree(&format::device_to_details(device));
    }
    print::footer();
    Ok(())
}
