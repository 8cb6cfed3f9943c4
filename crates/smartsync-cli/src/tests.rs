use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use smartsync_core::models::SYNC_METADATA_KEY;
use smartsync_core::remote::MemoryRemote;
use smartsync_core::storage::{LocalStore, MemoryStore};
use smartsync_core::{CollectionName, Record, SmartSyncConfig, SyncError, SyncOptions, SyncOrchestrator};

use crate::cli::{Cli, Commands};
use crate::commands::common::{
    build_remote, format_relative_time, format_report_line, format_timestamp, open_store,
    record_preview, resolve_collections, resolve_db_path,
};
use crate::commands::config::apply_init_args;
use crate::commands::reset::{reset_all, reset_collection};
use crate::commands::status::{collect_status, format_status_lines, StatusItem};
use crate::commands::sync::sync_result_item;
use crate::error::CliError;

fn officers() -> CollectionName {
    CollectionName::new("officers").unwrap()
}

#[test]
fn format_relative_time_units() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(
        format_relative_time(now - chrono::Duration::seconds(30), now),
        "just now"
    );
    assert_eq!(
        format_relative_time(now - chrono::Duration::minutes(2), now),
        "2m ago"
    );
    assert_eq!(
        format_relative_time(now - chrono::Duration::hours(2), now),
        "2h ago"
    );
    // clock skew never renders a negative age
    assert_eq!(
        format_relative_time(now + chrono::Duration::hours(1), now),
        "just now"
    );
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(
        format_timestamp(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()),
        "1970-01-01 00:00:00 UTC"
    );
}

#[test]
fn record_preview_truncates_with_ellipsis() {
    let record = Record::new("1").with_attribute("name", "a rather long officer name");
    assert_eq!(record_preview(&record, 20), "{\"name\":\"a rather...");
    assert_eq!(record_preview(&Record::new("2"), 20), "{}");
}

#[test]
fn db_path_prefers_cli_flag_then_config() {
    let config = SmartSyncConfig {
        db_path: Some(PathBuf::from("/from/config.db")),
        ..SmartSyncConfig::default()
    };

    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/from/flag.db")), &config),
        PathBuf::from("/from/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &config),
        PathBuf::from("/from/config.db")
    );
    assert!(resolve_db_path(None, &SmartSyncConfig::default()).ends_with("cache.db"));
}

#[test]
fn explicit_collections_override_configured_ones() {
    let config = SmartSyncConfig {
        collections: vec!["officers".to_string(), "students".to_string()],
        ..SmartSyncConfig::default()
    };

    let configured = resolve_collections(&[], &config).unwrap();
    assert_eq!(configured.len(), 2);

    let explicit = resolve_collections(&["events".to_string()], &config).unwrap();
    assert_eq!(explicit, vec![CollectionName::new("events").unwrap()]);
}

#[test]
fn repeated_collection_arguments_sync_once() {
    let names = ["officers", "students", "officers"].map(String::from);

    let collections = resolve_collections(&names, &SmartSyncConfig::default()).unwrap();
    assert_eq!(
        collections,
        vec![officers(), CollectionName::new("students").unwrap()]
    );
}

#[test]
fn missing_collections_are_reported() {
    assert!(matches!(
        resolve_collections(&[], &SmartSyncConfig::default()),
        Err(CliError::NoCollections)
    ));
    assert!(matches!(
        resolve_collections(&["bad name".to_string()], &SmartSyncConfig::default()),
        Err(CliError::Core(_))
    ));
}

#[test]
fn remote_requires_configured_url() {
    assert!(matches!(
        build_remote(&SmartSyncConfig::default()),
        Err(CliError::RemoteNotConfigured)
    ));

    let config = SmartSyncConfig {
        remote_url: Some("https://records.example.com".to_string()),
        ..SmartSyncConfig::default()
    };
    assert!(build_remote(&config).is_ok());
}

#[test]
fn config_init_merges_into_existing_values() {
    let mut config = SmartSyncConfig {
        remote_url: Some("https://old.example.com".to_string()),
        collections: vec!["officers".to_string()],
        ..SmartSyncConfig::default()
    };

    apply_init_args(
        &mut config,
        Some(" https://new.example.com/ ".to_string()),
        &["officers".to_string(), " students ".to_string()],
        Some(30),
        None,
        Some(true),
    );

    assert_eq!(config.remote_url(), Some("https://new.example.com"));
    assert_eq!(config.collections, vec!["officers", "students"]);
    assert_eq!(config.fetch_timeout_secs, 30);
    assert_eq!(config.persist_timeout_secs, 5);
    assert!(config.filter_fallback_client_side);
}

#[test]
fn reset_requires_collection_or_all() {
    assert!(Cli::try_parse_from(["smartsync", "reset"]).is_err());
    assert!(Cli::try_parse_from(["smartsync", "reset", "officers", "--all"]).is_err());

    let cli = Cli::try_parse_from(["smartsync", "reset", "--all", "--cache"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Reset {
            collection: None,
            all: true,
            cache: true
        }
    ));
}

#[test]
fn global_flags_follow_subcommands() {
    let cli = Cli::try_parse_from([
        "smartsync",
        "sync",
        "officers",
        "students",
        "--json",
        "--db-path",
        "/tmp/cache.db",
    ])
    .unwrap();

    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/cache.db")));
    match cli.command {
        Commands::Sync { collections, json } => {
            assert_eq!(collections, vec!["officers", "students"]);
            assert!(json);
        }
        _ => panic!("expected sync command"),
    }
}

#[tokio::test]
async fn sync_results_render_for_humans_and_json() {
    let remote = MemoryRemote::new().with_records(
        &officers(),
        vec![Record::new("1").with_updated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())],
    );
    let orchestrator =
        SyncOrchestrator::new(remote, Arc::new(MemoryStore::new()), SyncOptions::default());

    let report = orchestrator.sync(&officers()).await.unwrap();
    let line = format_report_line(&report);
    assert!(line.starts_with("officers"));
    assert!(line.contains("full"));
    assert!(line.contains("1 cached"));

    let ok = serde_json::to_value(sync_result_item(&officers(), Ok(report))).unwrap();
    assert_eq!(ok["ok"], true);
    assert_eq!(ok["report"]["total"], 1);

    let failed = serde_json::to_value(sync_result_item(
        &officers(),
        Err(SyncError::InFlight(officers())),
    ))
    .unwrap();
    assert_eq!(failed["ok"], false);
    assert!(failed.get("report").is_none());
    assert_eq!(
        failed["error"],
        "A sync of 'officers' is already in progress"
    );
}

#[tokio::test]
async fn status_lists_configured_synced_and_cached_collections() {
    let store = Arc::new(MemoryStore::with_entries([
        ("officers", r#"[{"id":"1"},{"id":"2"}]"#),
        ("events", "{broken"),
        (SYNC_METADATA_KEY, r#"{"officers":"2024-01-02T00:00:00Z"}"#),
    ]));
    let configured = vec![CollectionName::new("students").unwrap()];

    let items = collect_status(store, &configured).await.unwrap();

    assert_eq!(
        items,
        vec![
            StatusItem {
                collection: "events".to_string(),
                last_synced: None,
                cached_records: None,
            },
            StatusItem {
                collection: "officers".to_string(),
                last_synced: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
                cached_records: Some(2),
            },
            StatusItem {
                collection: "students".to_string(),
                last_synced: None,
                cached_records: Some(0),
            },
        ]
    );

    let lines = format_status_lines(&items, Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap());
    assert!(lines[0].contains("smartsync reset events --cache"));
    assert!(lines[1].contains("synced 5m ago"));
    assert!(lines[2].contains("never synced"));
}

#[tokio::test]
async fn reset_collection_optionally_drops_cache() {
    let store = Arc::new(MemoryStore::with_entries([
        ("officers", "[]"),
        (SYNC_METADATA_KEY, r#"{"officers":"2024-01-02T00:00:00Z"}"#),
    ]));

    let outcome = reset_collection(Arc::clone(&store), &officers(), false)
        .await
        .unwrap();
    assert_eq!(outcome, (true, false));
    assert_eq!(store.load("officers").await.unwrap().as_deref(), Some("[]"));

    let outcome = reset_collection(Arc::clone(&store), &officers(), true)
        .await
        .unwrap();
    assert_eq!(outcome, (false, true));
    assert_eq!(store.load("officers").await.unwrap(), None);
}

#[tokio::test]
async fn reset_all_with_cache_leaves_store_empty() {
    let store = Arc::new(MemoryStore::with_entries([
        ("officers", "[]"),
        ("students", "{broken"),
        (SYNC_METADATA_KEY, r#"{"officers":"2024-01-02T00:00:00Z"}"#),
    ]));

    assert_eq!(reset_all(Arc::clone(&store), true).await.unwrap(), 2);
    assert!(store.keys().await.unwrap().is_empty());
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "multi_thread")]
async fn open_store_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("cache.db");

    let store = open_store(&db_path).await.unwrap();
    store.save("officers", "[]").await.unwrap();

    assert!(db_path.exists());
    assert_eq!(store.keys().await.unwrap(), vec!["officers".to_string()]);
}
