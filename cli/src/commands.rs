pub mod actions;
pub mod devices;
pub mod history;
pub mod parse;
pub mod run;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use patrol_common::action::{ActionFilter, CommandKind};
use patrol_common::config::{
    Credentials, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_WORKERS,
    DEFAULT_SSH_PORT, RunConfig,
};
use patrol_common::device::DeviceFilter;

#[derive(Parser)]
#[command(name = "patrol")]
#[command(about = "Fleet inspection for network devices over SSH.", version)]
pub struct CommandLine {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run actions against devices and store the results
    #[command(alias = "r")]
    Run(RunArgs),
    /// List actions from the action inventory
    #[command(alias = "a")]
    Actions(ActionsArgs),
    /// List devices from the device inventory
    #[command(alias = "d")]
    Devices(DevicesArgs),
    /// Parse a captured command output with an action's schema
    #[command(alias = "p")]
    Parse(ParseArgs),
    /// Show stored inspection records
    #[command(alias = "h")]
    History(HistoryArgs),
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeviceInventory {
    /// Device inventory, a JSON array of devices
    #[arg(id = "devices", long = "devices", value_name = "FILE", default_value = "devices.json")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ActionInventory {
    /// Action inventory, a JSON array of actions
    #[arg(id = "actions", long = "actions", value_name = "FILE", default_value = "actions.json")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeviceSelect {
    /// Serial numbers to inspect, in order (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub sn: Vec<String>,
    #[arg(long)]
    pub hostname: Option<String>,
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub role: Option<String>,
    /// Datacenter / location code
    #[arg(long)]
    pub idc: Option<String>,
}

impl DeviceSelect {
    /// Filter over every field except the serial numbers, which are looked up by identity.
    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter {
            sn: None,
            hostname: self.hostname.clone(),
            vendor: self.vendor.clone(),
            model: self.model.clone(),
            role: self.role.clone(),
            idc: self.idc.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ActionSelect {
    /// Action ids to run, in order (comma separated or repeated)
    #[arg(id = "action-id", long = "action-id", value_delimiter = ',')]
    pub ids: Vec<u64>,
    #[arg(id = "action-name", long = "action-name")]
    pub name: Option<String>,
    #[arg(id = "action-vendor", long = "action-vendor")]
    pub vendor: Option<String>,
    #[arg(id = "action-model", long = "action-model")]
    pub model: Option<String>,
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,
}

impl ActionSelect {
    pub fn filter(&self) -> ActionFilter {
        ActionFilter {
            id: None,
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            model: self.model.clone(),
            kind: self.kind.map(CommandKind::from),
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum KindArg {
    Show,
    Config,
}

impl From<KindArg> for CommandKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Show => CommandKind::Show,
            KindArg::Config => CommandKind::Config,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    #[arg(short, long, env = "PATROL_SSH_USERNAME")]
    pub username: String,
    #[arg(short, long, env = "PATROL_SSH_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Privileged-mode secret, sent when the device lands in user mode
    #[arg(long, env = "PATROL_SSH_SECRET", hide_env_values = true, default_value = "")]
    pub secret: String,
}

impl From<&CredentialArgs> for Credentials {
    fn from(args: &CredentialArgs) -> Self {
        Credentials::new(&args.username, &args.password).with_secret(&args.secret)
    }
}

#[derive(Args, Debug, Clone)]
pub struct StoreArg {
    /// JSON-lines file holding inspection records
    #[arg(id = "store", long = "store", value_name = "FILE", default_value = "inspections.jsonl")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub devices: DeviceInventory,
    #[command(flatten)]
    pub actions: ActionInventory,
    #[command(flatten)]
    pub select: DeviceSelect,
    #[command(flatten)]
    pub action_select: ActionSelect,
    #[command(flatten)]
    pub credentials: CredentialArgs,
    #[command(flatten)]
    pub store: StoreArg,

    /// Devices inspected concurrently
    #[arg(short, long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub workers: usize,
    /// Per-command timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs())]
    pub command_timeout: u64,
    /// Login timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout: u64,
    #[arg(long, default_value_t = DEFAULT_SSH_PORT)]
    pub port: u16,
    /// Skip a timed-out action instead of abandoning the device
    #[arg(long)]
    pub continue_on_timeout: bool,
    /// Skip an action that lost the connection instead of abandoning the device
    #[arg(long)]
    pub continue_on_disconnect: bool,
    /// Do not write records to the store
    #[arg(long)]
    pub dry_run: bool,
    /// Print the run result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            credentials: Credentials::from(&self.credentials),
            max_workers: self.workers,
            abort_on_connection_error: !self.continue_on_disconnect,
            abort_on_command_timeout: !self.continue_on_timeout,
            command_timeout: Duration::from_secs(self.command_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            port: self.port,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ActionsArgs {
    #[command(flatten)]
    pub inventory: ActionInventory,
    #[command(flatten)]
    pub select: ActionSelect,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub inventory: DeviceInventory,
    #[command(flatten)]
    pub select: DeviceSelect,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[command(flatten)]
    pub inventory: ActionInventory,
    /// Action whose parse schema and validation hook are applied
    #[arg(id = "action-id", long = "action-id")]
    pub id: u64,
    /// Captured output; reads stdin when omitted
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub store: StoreArg,
    /// Start of the window (RFC 3339). Defaults to `--hours` before the end
    #[arg(long)]
    pub since: Option<String>,
    /// End of the window, exclusive (RFC 3339). Defaults to now
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long, default_value_t = 24)]
    pub hours: i64,
    #[arg(long)]
    pub sn: Option<String>,
    #[arg(long)]
    pub json: bool,
}
