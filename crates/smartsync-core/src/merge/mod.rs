//! Timestamp-reconciled merge of a local and a remote record set.
//!
//! Precedence is per whole record: a remote record replaces its local
//! counterpart only when its `updatedAt` is strictly later. Equal timestamps
//! keep the local copy so unsynced local edits are never overwritten by
//! equally-old remote data. A missing timestamp counts as the earliest
//! possible instant.

use std::collections::HashMap;

use crate::models::{Record, RecordId};

/// Reconciled record set plus bookkeeping for one merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    /// One record per distinct identifier
    pub records: Vec<Record>,
    /// Remote records with no local counterpart
    pub added: usize,
    /// Local records superseded by a strictly newer remote record
    pub replaced: usize,
    /// Remote records ignored because the local copy was as new or newer
    pub retained: usize,
}

impl MergeResult {
    /// Whether the merge changed anything relative to the local input
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.added > 0 || self.replaced > 0
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Merge `remote` into `local` without mutating either input.
///
/// Output order is the surviving local records in their input order
/// followed by newly added remote records in remote order. Duplicate
/// identifiers inside `local` collapse under the same precedence rule.
#[must_use]
pub fn merge(local: &[Record], remote: &[Record]) -> MergeResult {
    let mut records: Vec<Record> = Vec::with_capacity(local.len() + remote.len());
    let mut index: HashMap<RecordId, usize> = HashMap::with_capacity(local.len() + remote.len());

    for record in local {
        upsert(&mut records, &mut index, record);
    }

    let mut result = MergeResult::default();
    for record in remote {
        match upsert(&mut records, &mut index, record) {
            Upsert::Inserted => result.added += 1,
            Upsert::Replaced => result.replaced += 1,
            Upsert::Kept => result.retained += 1,
        }
    }

    result.records = records;
    result
}

enum Upsert {
    Inserted,
    Replaced,
    Kept,
}

fn upsert(
    records: &mut Vec<Record>,
    index: &mut HashMap<RecordId, usize>,
    incoming: &Record,
) -> Upsert {
    match index.get(&incoming.id) {
        None => {
            index.insert(incoming.id.clone(), records.len());
            records.push(incoming.clone());
            Upsert::Inserted
        }
        Some(&position) => {
            if supersedes(incoming, &records[position]) {
                records[position] = incoming.clone();
                Upsert::Replaced
            } else {
                Upsert::Kept
            }
        }
    }
}

/// `None` orders before every `Some`, so an untimestamped record never wins.
fn supersedes(incoming: &Record, existing: &Record) -> bool {
    incoming.updated_at > existing.updated_at
}
