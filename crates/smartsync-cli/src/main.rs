//! smartsync CLI - keep a local cache of remote collections current
//!
//! Syncs configured collections incrementally and inspects or resets the
//! cache from the terminal.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{resolve_config_path, Context};
use crate::commands::config::run_config;
use crate::commands::list::run_list;
use crate::commands::reset::run_reset;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "smartsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    // stdout is reserved for command output (including --json)
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Sync { collections, json } => {
            let context = Context::load(&config_path, cli.db_path)?;
            run_sync(&collections, json, &context).await?;
        }
        Commands::Status { json } => {
            let context = Context::load(&config_path, cli.db_path)?;
            run_status(json, &context).await?;
        }
        Commands::Reset {
            collection,
            all,
            cache,
        } => {
            let context = Context::load(&config_path, cli.db_path)?;
            run_reset(collection.as_deref(), all, cache, &context).await?;
        }
        Commands::List {
            collection,
            limit,
            json,
        } => {
            let context = Context::load(&config_path, cli.db_path)?;
            run_list(&collection, limit, json, &context).await?;
        }
        Commands::Config { command } => run_config(command, &config_path)?,
    }

    Ok(())
}
