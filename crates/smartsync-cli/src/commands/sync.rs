use serde::Serialize;
use smartsync_core::{CollectionName, SyncError, SyncOrchestrator, SyncReport};

use crate::commands::common::{build_remote, format_report_line, resolve_collections, Context};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncResultItem {
    pub collection: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn run_sync(
    collections: &[String],
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let collections = resolve_collections(collections, &context.config)?;
    let remote = build_remote(&context.config)?;
    let store = context.open_store().await?;
    let orchestrator = SyncOrchestrator::new(remote, store, context.config.sync_options());

    let results = orchestrator.sync_all(&collections).await;
    let total = results.len();
    let failed = results.iter().filter(|(_, result)| result.is_err()).count();

    if as_json {
        let items = results
            .into_iter()
            .map(|(collection, result)| sync_result_item(&collection, result))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (collection, result) in &results {
            match result {
                Ok(report) => println!("{}", format_report_line(report)),
                Err(error) => eprintln!("{:<20}  failed: {error}", collection.as_str()),
            }
        }
    }

    if failed > 0 {
        return Err(CliError::SyncFailed { failed, total });
    }
    Ok(())
}

pub fn sync_result_item(
    collection: &CollectionName,
    result: Result<SyncReport, SyncError>,
) -> SyncResultItem {
    match result {
        Ok(report) => SyncResultItem {
            collection: collection.to_string(),
            ok: true,
            report: Some(report),
            error: None,
        },
        Err(error) => SyncResultItem {
            collection: collection.to_string(),
            ok: false,
            report: None,
            error: Some(error.to_string()),
        },
    }
}
