use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "smartsync")]
#[command(about = "Keep a local cache of remote collections current")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull remote changes into the local cache
    Sync {
        /// Collections to sync (defaults to the configured list)
        collections: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show last sync time and cache size per collection
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget sync progress so the next sync fetches everything
    Reset {
        /// Collection to reset
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        collection: Option<String>,
        /// Reset every collection
        #[arg(long)]
        all: bool,
        /// Also drop cached records
        #[arg(long)]
        cache: bool,
    },
    /// List cached records of a collection
    List {
        /// Collection name
        collection: String,
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Remote base URL (e.g. <https://records.example.com>)
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// Collection synced by default (repeatable)
        #[arg(long = "collection", value_name = "NAME")]
        collections: Vec<String>,
        /// Fetch timeout in seconds
        #[arg(long, value_name = "SECS")]
        fetch_timeout: Option<u64>,
        /// Local write timeout in seconds
        #[arg(long, value_name = "SECS")]
        persist_timeout: Option<u64>,
        /// Filter fallback (unfiltered) fetches by the last sync time locally
        #[arg(long, value_name = "BOOL")]
        client_side_filter: Option<bool>,
    },
    /// Print the effective configuration
    Show,
}
