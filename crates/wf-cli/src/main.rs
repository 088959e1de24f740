// Operator CLI for the workflow execution engine
//
// Design Decision: run directly against an in-process ExecutionEngine
// rather than talking to wf-api over HTTP, so an operator can execute a
// workflow file with no server running.

mod commands;
mod hooks;
mod output;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "wf")]
#[command(about = "Run and inspect workflow executions from the command line")]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json"])]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow file once
    Run(commands::run::RunArgs),

    /// Inspect a previously saved run report
    Inspect(commands::inspect::InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "wf_cli=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let output = OutputFormat::from_str(&cli.output);

    match cli.command {
        Command::Run(args) => commands::run::run(args, output).await,
        Command::Inspect(args) => commands::inspect::inspect(args, output),
    }
}
