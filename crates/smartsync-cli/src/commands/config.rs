use std::path::Path;

use smartsync_core::util::normalize_text_option;
use smartsync_core::SmartSyncConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            remote_url,
            collections,
            fetch_timeout,
            persist_timeout,
            client_side_filter,
        } => {
            // env overrides are not persisted, so start from the file alone
            let mut config = SmartSyncConfig::load_from_path(config_path)?;
            apply_init_args(
                &mut config,
                remote_url,
                &collections,
                fetch_timeout,
                persist_timeout,
                client_side_filter,
            );
            config.validate()?;
            config.save_to_path(config_path)?;
            println!("Saved config to {}", config_path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Merge `config init` flags into an existing config; absent flags keep current values
pub fn apply_init_args(
    config: &mut SmartSyncConfig,
    remote_url: Option<String>,
    collections: &[String],
    fetch_timeout: Option<u64>,
    persist_timeout: Option<u64>,
    client_side_filter: Option<bool>,
) {
    if let Some(url) = normalize_text_option(remote_url) {
        config.remote_url = Some(url.trim_end_matches('/').to_string());
    }
    for name in collections {
        let name = name.trim();
        if !name.is_empty() && !config.collections.iter().any(|existing| existing == name) {
            config.collections.push(name.to_string());
        }
    }
    if let Some(secs) = fetch_timeout {
        config.fetch_timeout_secs = secs;
    }
    if let Some(secs) = persist_timeout {
        config.persist_timeout_secs = secs;
    }
    if let Some(enabled) = client_side_filter {
        config.filter_fallback_client_side = enabled;
    }
}
