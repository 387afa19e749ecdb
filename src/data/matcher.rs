use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::SpectrumTable;

/// Identifiers present in both tables, sorted lexicographically.
///
/// No overlap yields an empty set; callers decide whether that is an error.
pub fn common_ids(a: &SpectrumTable, b: &SpectrumTable) -> BTreeSet<String> {
    let common: BTreeSet<String> = a
        .ids()
        .filter(|id| b.contains_id(id))
        .map(str::to_string)
        .collect();
    debug!(
        "matched {} ids ({} vs {} unique)",
        common.len(),
        a.ids().count(),
        b.ids().count()
    );
    common
}

/// One identifier present on both sides, with the note of its first record
/// on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMatch {
    pub id: String,
    pub reference_note: Option<String>,
    pub current_note: Option<String>,
}

/// Like [`common_ids`], keeping the first-record note from each table.
pub fn matched_pairs(reference: &SpectrumTable, current: &SpectrumTable) -> Vec<IdMatch> {
    common_ids(reference, current)
        .into_iter()
        .map(|id| {
            let reference_note = reference.records_for(&id).next().and_then(|r| r.note.clone());
            let current_note = current.records_for(&id).next().and_then(|r| r.note.clone());
            IdMatch {
                id,
                reference_note,
                current_note,
            }
        })
        .collect()
}
