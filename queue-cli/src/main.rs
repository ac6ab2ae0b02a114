//! # leadq
//!
//! Command-line front end for the offline lead-draft queue.
//!
//! ## Commands
//!
//! - `create`: Capture a lead draft (works offline)
//! - `list`: Show stored drafts
//! - `status`: Show connectivity and queue counts
//! - `sync`: Send one draft, or every pending draft, to the server
//! - `delete`: Discard a draft
//! - `prune`: Remove drafts the server already holds
//! - `watch`: Stay running and sync whenever connectivity returns
//!
//! ## Example
//!
//! ```bash
//! # Capture a lead while offline
//! leadq create --customer-name "Acme" --item X:2:10
//!
//! # Later, push everything
//! leadq sync --all
//!
//! # Try it without a server
//! leadq --mock sync --all
//! ```

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{create, delete, list, prune, status, sync, watch};
use queue_types::{DraftId, LineItem};

/// Offline lead-draft queue.
#[derive(Parser, Debug)]
#[command(name = "leadq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for drafts and configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (default: <data-dir>/leadq.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-process mock API instead of the configured server
    #[arg(long, global = true)]
    mock: bool,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture a new lead draft
    #[command(group(ArgGroup::new("customer").required(true).args(["customer_id", "customer_name"])))]
    Create {
        /// Id of an existing remote customer
        #[arg(long)]
        customer_id: Option<String>,

        /// Customer name, when the customer has not been looked up yet
        #[arg(long)]
        customer_name: Option<String>,

        /// Line item as SKU:QUANTITY:UNIT_PRICE (repeatable)
        #[arg(long = "item", value_parser = create::parse_item)]
        items: Vec<LineItem>,
    },

    /// List stored drafts
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show connectivity and queue counts
    Status,

    /// Synchronize drafts with the server
    #[command(group(ArgGroup::new("target").required(true).args(["id", "all"])))]
    Sync {
        /// Draft to synchronize
        id: Option<DraftId>,

        /// Synchronize every pending draft, oldest first
        #[arg(long)]
        all: bool,
    },

    /// Delete a draft that is not being synchronized
    Delete {
        /// Draft to delete
        id: DraftId,
    },

    /// Remove synced drafts from local storage
    Prune,

    /// Stay running and sync whenever connectivity returns
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let settings = config::Settings::load(&data_dir, cli.config.as_deref(), cli.mock)?;

    match cli.command {
        Commands::Create {
            customer_id,
            customer_name,
            items,
        } => {
            let customer = create::customer(customer_id, customer_name)?;
            create::run(&settings, customer, items).await?;
        }
        Commands::List { json } => {
            list::run(&settings, json).await?;
        }
        Commands::Status => {
            status::run(&settings).await?;
        }
        Commands::Sync { id, all } => {
            if all {
                sync::all(&settings).await?;
            } else if let Some(id) = id {
                sync::one(&settings, id).await?;
            } else {
                anyhow::bail!("Must specify a draft id or --all");
            }
        }
        Commands::Delete { id } => {
            delete::run(&settings, id).await?;
        }
        Commands::Prune => {
            prune::run(&settings).await?;
        }
        Commands::Watch => {
            watch::run(&settings).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for leadq.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "leadq", "leadq")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
