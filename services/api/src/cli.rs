use crate::demo::{run_demo, run_schedule_preview, DemoArgs, ScheduleArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rental_ledger::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rental Ledger",
    about = "Run the rental ledger service or preview schedules from the command line",
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
    /// Print the payment schedule and commission split for a prospective contract
    Schedule(ScheduleArgs),
    /// Walk a sample contract from its first collection to delinquency
    Demo(DemoArgs),
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
        Command::Schedule(args) => run_schedule_preview(args),
        Command::Demo(args) => run_demo(args),
    }
}
