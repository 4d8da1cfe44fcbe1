//! SMS Dispatch CLI - main entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sms_dispatch::commands;

#[derive(Parser)]
#[command(name = "sms_dispatch")]
#[command(about = "Batch SMS sender for recruitment notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the batch described by a roster CSV
    Send {
        /// Roster CSV with columns: name, phone, date, time, place
        #[arg(short, long)]
        roster: PathBuf,

        /// Write the per-recipient report to this CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },

    /// Validate a roster without sending anything
    Check {
        /// Roster CSV to validate
        #[arg(short, long)]
        roster: PathBuf,
    },

    /// Render the message preview for one roster row
    Preview {
        /// Roster CSV to read the row from
        #[arg(short, long)]
        roster: PathBuf,

        /// Zero-based row index
        #[arg(long, default_value = "0")]
        row: usize,

        /// Custom template text with {name}/{date}/{time}/{place} placeholders
        #[arg(short, long)]
        template: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("sms_dispatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    execute_command(cli.command).await
}

async fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Send {
            roster,
            export,
            yes,
        } => {
            commands::send::run(commands::send::SendArgs {
                roster,
                export,
                yes,
            })
            .await?;
        }
        Commands::Check { roster } => {
            commands::check::run(&roster)?;
        }
        Commands::Preview {
            roster,
            row,
            template,
        } => {
            commands::preview::run(&roster, row, template.as_deref())?;
        }
    }

    Ok(())
}
