mod commands;
mod inventory;
mod terminal;

use commands::{CommandLine, Commands, actions, devices, history, parse, run};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);

    match commands.command {
        Commands::Run(args) => {
            print::banner();
            print::header("getting ready for inspection");
            run::run(args).await
        }
        Commands::Actions(args) => actions::actions(args).await,
        Commands::Devices(args) => devices::devices(args).await,
        Commands::Parse(args) => parse::parse(args).await,
        Commands::History(args) => history::history(args).await,
    }
}
