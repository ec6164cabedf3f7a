use crate::demo::{run_demo, run_inventory, DemoArgs, InventoryArgs};
use crate::server;
use bed_switch::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bed-switch-api",
    about = "Serve and demonstrate the room/bed switch request workflow",
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
    /// Walk through submission, rate limiting, rejection and approval against an inventory
    Demo(DemoArgs),
    /// Print room and bed availability per property for an inventory export
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Inventory CSV export to serve (defaults to the bundled demo inventory)
    #[arg(long, value_parser = crate::infra::parse_path)]
    pub(crate) inventory: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Inventory(args) => run_inventory(args),
    }
}
