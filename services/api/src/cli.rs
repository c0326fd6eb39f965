use crate::admin::{run_level_lookup, run_migrations, run_report_export, LevelArgs, ReportArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use englesoft::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "EnglesSoft",
    about = "Serve and operate the EnglesSoft English-proficiency tracker",
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
    /// Apply the database schema and level seed
    Migrate,
    /// Show the MCER level a total score resolves to
    Level(LevelArgs),
    /// Export the progress summary of every student as CSV
    Report(ReportArgs),
    /// Walk through a full training period against the in-memory store
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
    /// Keep all data in process memory instead of Postgres
    #[arg(long)]
    pub(crate) in_memory: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Migrate => run_migrations().await,
        Command::Level(args) => run_level_lookup(args),
        Command::Report(args) => run_report_export(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
