use crate::console::{run_lookup, LookupArgs, LookupKind};
use crate::server;
use clap::{Args, Parser, Subcommand};
use safe_area::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "safe-area",
    about = "Assess area risk and find nearby emergency facilities",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the risk assessment for a coordinate
    Assess(LookupArgs),
    /// List the nearest hospitals and police stations
    Facilities(LookupArgs),
    /// Run the assessment and facility lookup together
    Inspect(LookupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_lookup(LookupKind::Assessment, args).await,
        Command::Facilities(args) => run_lookup(LookupKind::Facilities, args).await,
        Command::Inspect(args) => run_lookup(LookupKind::Inspection, args).await,
    }
}
