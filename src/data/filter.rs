use std::collections::BTreeSet;

use super::model::{MeasurementRecord, SpectrumTable};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Record selection: sub-tables by lamp note or identifier subset
// ---------------------------------------------------------------------------

/// Return indices of records that pass `predicate`, in table order.
pub fn filtered_indices<F>(table: &SpectrumTable, predicate: F) -> Vec<usize>
where
    F: Fn(&MeasurementRecord) -> bool,
{
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| predicate(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Records whose note equals `note` (one lamp's measurements).
///
/// Records without a note never match.
pub fn by_note(table: &SpectrumTable, note: &str) -> Result<SpectrumTable> {
    select(table, |rec| rec.note.as_deref() == Some(note))
}

/// Records whose id is in `ids`.
///
/// Ids not present in the table are ignored; an empty selection yields an
/// empty table.
pub fn by_ids<S: AsRef<str>>(table: &SpectrumTable, ids: &[S]) -> Result<SpectrumTable> {
    let wanted: BTreeSet<&str> = ids.iter().map(AsRef::as_ref).collect();
    select(table, |rec| wanted.contains(rec.id.as_str()))
}

fn select<F>(table: &SpectrumTable, predicate: F) -> Result<SpectrumTable>
where
    F: Fn(&MeasurementRecord) -> bool,
{
    let records = filtered_indices(table, predicate)
        .into_iter()
        .map(|i| table.records()[i].clone())
        .collect();
    SpectrumTable::build(records)
}
