use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Parser)]
#[command(name = "goldtrack")]
#[command(about = "Gold price pipeline CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the update job (incremental merge by default)
    Pull {
        /// Force a full 3-year backup instead of an incremental merge
        #[arg(long)]
        backup: bool,
    },
    /// Start the HTTP API and dashboard server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
    /// Show current data status
    Status,
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pull { backup } => {
            commands::pull::run(backup);
        }
        Commands::Serve { port } => {
            commands::serve::run(port);
        }
        Commands::Status => {
            commands::status::run();
        }
    }
}
