use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::{execute::ExecuteArgs, ConnectionArgs};
use error::CliResult;

#[derive(Parser)]
#[command(name = "solbatch")]
#[command(about = "Solbatch - Batch token transfers and trades into as few Solana transactions as fit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an operations file without touching the network
    Validate {
        /// Operations file (YAML or JSON)
        operations: PathBuf,

        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the largest number of operations that fit in one transaction
    Estimate {
        /// Operations file (YAML or JSON)
        operations: PathBuf,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Execute every operation in the file
    Execute {
        /// Operations file (YAML or JSON)
        operations: PathBuf,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        args: ExecuteArgs,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { operations, json } => commands::validate::execute(operations, json),

        Commands::Estimate {
            operations,
            connection,
        } => commands::estimate::execute(operations, connection).await,

        Commands::Execute {
            operations,
            connection,
            args,
        } => commands::execute::execute(operations, connection, args).await,
    }
}
