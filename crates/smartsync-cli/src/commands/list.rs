use smartsync_core::sync::RecordCache;
use smartsync_core::CollectionName;

use crate::commands::common::{format_record_lines, Context};
use crate::error::CliError;

pub async fn run_list(
    collection: &str,
    limit: usize,
    as_json: bool,
    context: &Context,
) -> Result<(), CliError> {
    let collection = CollectionName::new(collection)?;
    let store = context.open_store().await?;
    let records = RecordCache::new(store).records(&collection).await?;
    let shown = &records[..records.len().min(limit)];

    if as_json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No cached records for '{collection}'.");
        return Ok(());
    }

    for line in format_record_lines(shown) {
        println!("{line}");
    }
    if records.len() > shown.len() {
        println!("... {} more", records.len() - shown.len());
    }
    Ok(())
}
