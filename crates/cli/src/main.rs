//! slotboard CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `serve`    — Start the HTTP gateway
//! - `status`   — Show configuration and board occupancy
//! - `list`     — Show a board's occupied slots
//! - `place`    — Put content at a slot, shifting occupants
//! - `remove`   — Take content off a board, closing the gap
//! - `reorder`  — Replace a board's whole layout
//! - `rebuild`  — Re-derive a board's index from its slots
//! - `upsert`   — Create or update a content payload

use clap::{Parser, Subcommand};

mod commands;

use commands::board::ContentArgs;

#[derive(Parser)]
#[command(
    name = "slotboard",
    about = "slotboard — ordered content slot boards over a key-value store",
    version
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
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration and board occupancy
    Status,

    /// List a board's occupied slots
    List {
        /// Board: event, daily or topic-<id>
        board: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Place content at a slot
    Place {
        board: String,
        slot: u32,
        content_id: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Remove content from a board
    Remove { board: String, content_id: String },

    /// Replace a board's layout, e.g. `reorder daily 1=A 2= 3=B`
    Reorder {
        board: String,

        /// `slot=contentId` pairs; an empty id leaves the slot empty
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Rebuild a board's index from a full slot scan
    Rebuild { board: String },

    /// Create or update a content payload without moving it
    Upsert {
        board: String,
        content_id: String,

        #[command(flatten)]
        content: ContentArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Status => commands::status::run().await?,
        Commands::List { board, json } => commands::board::list(&board, json).await?,
        Commands::Place {
            board,
            slot,
            content_id,
            content,
        } => commands::board::place(&board, slot, &content_id, content).await?,
        Commands::Remove { board, content_id } => {
            commands::board::remove(&board, &content_id).await?
        }
        Commands::Reorder { board, assignments } => {
            commands::board::reorder(&board, &assignments).await?
        }
        Commands::Rebuild { board } => commands::board::rebuild(&board).await?,
        Commands::Upsert {
            board,
            content_id,
            content,
        } => commands::board::upsert(&board, &content_id, content).await?,
    }

    Ok(())
}
