use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use smartsync_core::config::CONFIG_FILE_NAME;
use smartsync_core::db::LibSqlStore;
use smartsync_core::remote::HttpRemote;
use smartsync_core::util::normalize_text_option;
use smartsync_core::{CollectionName, Record, SmartSyncConfig, SyncReport};

use crate::error::CliError;

pub const AUTH_TOKEN_ENV: &str = "SMARTSYNC_AUTH_TOKEN";

/// Effective configuration for one invocation
pub struct Context {
    pub config: SmartSyncConfig,
    pub db_path: PathBuf,
}

impl Context {
    pub fn load(config_path: &Path, cli_db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = load_config(config_path)?;
        let db_path = resolve_db_path(cli_db_path, &config);
        Ok(Self { config, db_path })
    }

    pub async fn open_store(&self) -> Result<Arc<LibSqlStore>, CliError> {
        open_store(&self.db_path).await
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("smartsync")
        .join(CONFIG_FILE_NAME)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("smartsync")
        .join("cache.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path.unwrap_or_else(default_config_path)
}

/// `--db-path` wins over `SMARTSYNC_DB_PATH` and the config file
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &SmartSyncConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(default_db_path)
}

/// Config file with `SMARTSYNC_*` environment overrides applied
pub fn load_config(path: &Path) -> Result<SmartSyncConfig, CliError> {
    let mut config = SmartSyncConfig::load_from_path(path)?;
    config.apply_env()?;
    Ok(config)
}

pub async fn open_store(db_path: &Path) -> Result<Arc<LibSqlStore>, CliError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(Arc::new(LibSqlStore::open(db_path).await?))
}

pub fn build_remote(config: &SmartSyncConfig) -> Result<HttpRemote, CliError> {
    let url = config.remote_url().ok_or(CliError::RemoteNotConfigured)?;
    let remote = HttpRemote::new(url)?;
    Ok(match normalize_text_option(env::var(AUTH_TOKEN_ENV).ok()) {
        Some(token) => remote.with_auth_token(token),
        None => remote,
    })
}

/// Explicit names when given, otherwise the configured list; repeats are dropped
pub fn resolve_collections(
    explicit: &[String],
    config: &SmartSyncConfig,
) -> Result<Vec<CollectionName>, CliError> {
    let mut collections = if explicit.is_empty() {
        config.collections()?
    } else {
        explicit
            .iter()
            .map(CollectionName::new)
            .collect::<Result<Vec<_>, _>>()?
    };
    let mut seen = HashSet::new();
    collections.retain(|name| seen.insert(name.clone()));

    if collections.is_empty() {
        return Err(CliError::NoCollections);
    }
    Ok(collections)
}

pub fn format_report_line(report: &SyncReport) -> String {
    let mode = if report.is_first_sync() {
        "full"
    } else if report.used_filtered_query {
        "delta"
    } else {
        "full (fallback)"
    };
    format!(
        "{:<20}  {:<15}  fetched {:>5}  +{} ~{}  {} cached",
        report.collection.as_str(),
        mode,
        report.fetched,
        report.added,
        report.replaced,
        report.total
    )
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now = Utc::now();
    records
        .iter()
        .map(|record| {
            let id = record.id.as_str().chars().take(20).collect::<String>();
            let relative_time = record
                .updated_at
                .map_or_else(|| "-".to_string(), |at| format_relative_time(at, now));
            let preview = record_preview(record, 60);
            format!("{id:<20}  {relative_time:<10}  {preview}")
        })
        .collect()
}

/// Attributes rendered as compact JSON, truncated with an ellipsis
pub fn record_preview(record: &Record, max_chars: usize) -> String {
    let rendered = serde_json::Value::Object(record.attributes.clone()).to_string();

    if rendered.chars().count() <= max_chars {
        rendered
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = rendered.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(at).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
