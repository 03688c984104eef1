use clap::{Args, Subcommand};

use crate::config::OptionArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod origin;
pub mod simulate;
pub mod url;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the checkout address for a session.
    Url(UrlArgs),
    /// Derive the origin of an address.
    Origin(OriginArgs),
    /// Run an inline checkout against a simulated frame.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Url(args) => url::run(args, format),
        Command::Origin(args) => origin::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct UrlArgs {
    /// Session token to address.
    #[arg(long)]
    pub token: Option<String>,
    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug)]
pub struct OriginArgs {
    /// Address to derive the origin from.
    pub address: String,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Session token to load.
    #[arg(long, default_value = "demo-session")]
    pub token: String,
    /// Notifications the simulated frame emits after loading (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "paymentTypeSelection,authorize,close")]
    pub notify: Vec<String>,
    /// Reject the session with this error text.
    #[arg(long, value_name = "TEXT", conflicts_with = "fail_load")]
    pub reject: Option<String>,
    /// Fail the frame load with this reason.
    #[arg(long, value_name = "REASON")]
    pub fail_load: Option<String>,
    /// Never answer any request, not even the handshake.
    #[arg(long)]
    pub silent: bool,
    /// Maximum time for the whole flow (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
