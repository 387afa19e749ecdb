use std::collections::BTreeMap;

use super::model::{Spectrum, SpectrumTable};
use crate::error::{EngineError, Result};

/// Element-wise mean of every spectrum recorded under `id`.
///
/// Sums are accumulated in `f64`. NaN in any replicate propagates into the
/// affected channels of the mean.
pub fn aggregate(table: &SpectrumTable, id: &str) -> Result<Spectrum> {
    let mut sum = vec![0.0_f64; table.channels()];
    let mut count = 0usize;

    for rec in table.records_for(id) {
        for (acc, &v) in sum.iter_mut().zip(rec.spectrum.iter()) {
            *acc += v;
        }
        count += 1;
    }

    if count == 0 {
        return Err(EngineError::NoRecordsForId(id.to_string()));
    }

    let n = count as f64;
    Ok(Spectrum::new(sum.into_iter().map(|s| s / n).collect()))
}

/// Mean spectrum for every identifier in the table.
pub fn aggregate_all(table: &SpectrumTable) -> Result<BTreeMap<String, Spectrum>> {
    table
        .ids()
        .map(|id| Ok((id.to_string(), aggregate(table, id)?)))
        .collect()
}
