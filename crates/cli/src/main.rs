//! jobsuite CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: write the default config
//! - `chat`: interactive or single-message chat
//! - `sync`: rebuild the job description index from the database
//! - `listing`: show one job listing
//! - `doctor`: check config, database and index

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "jobsuite",
    about = "jobsuite: ask questions about students, employers and job listings",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue a named session (a new one is created otherwise)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Embed every job description into the vector index
    Sync,

    /// Show one job listing with all its fields
    Listing {
        /// The listing's job_id
        job_id: i64,
    },

    /// Diagnose configuration, database and index
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message, session } => commands::chat::run(message, session).await?,
        Commands::Sync => commands::sync::run().await?,
        Commands::Listing { job_id } => commands::listing::run(job_id).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
