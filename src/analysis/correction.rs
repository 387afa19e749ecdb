use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::metrics::{max_propagating, std_dev};
use crate::data::aggregate::aggregate;
use crate::data::model::{Spectrum, SpectrumTable};
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// CorrectionVector
// ---------------------------------------------------------------------------

/// Mean signed difference `reference − new` over a set of matched standards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionVector {
    pub values: Spectrum,
    /// Identifiers the correction was derived from, sorted.
    pub source_ids: Vec<String>,
}

/// Summary of a correction's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStatistics {
    pub max_abs: f64,
    pub mean_abs: f64,
    pub std: f64,
}

impl CorrectionVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// NaN in the correction makes every statistic NaN.
    pub fn statistics(&self) -> CorrectionStatistics {
        let v = self.values.values();
        let n = v.len() as f64;
        CorrectionStatistics {
            max_abs: max_propagating(v.iter().map(|x| x.abs()), 0.0),
            mean_abs: v.iter().map(|x| x.abs()).sum::<f64>() / n,
            std: std_dev(v),
        }
    }

    /// Simulate a new-lamp measurement after correction: `spectrum + correction`.
    pub fn apply_to_spectrum(&self, spectrum: &[f64]) -> Result<Spectrum> {
        self.check_len(spectrum.len())?;
        Ok(Spectrum::new(
            spectrum.iter().zip(self.values.iter()).map(|(s, c)| s + c).collect(),
        ))
    }

    /// Corrected instrument baseline: `baseline − correction`.
    pub fn apply_to_baseline(&self, baseline: &[f64]) -> Result<Spectrum> {
        self.check_len(baseline.len())?;
        Ok(Spectrum::new(
            baseline.iter().zip(self.values.iter()).map(|(b, c)| b - c).collect(),
        ))
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(EngineError::ChannelCountMismatch {
                left: self.len(),
                right: len,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Per-id difference `mean(reference) − mean(new)`, keyed by id.
pub fn per_id_differences<S: AsRef<str>>(
    reference: &SpectrumTable,
    new: &SpectrumTable,
    ids: &[S],
) -> Result<BTreeMap<String, Spectrum>> {
    if reference.channels() != new.channels() && !reference.is_empty() && !new.is_empty() {
        return Err(EngineError::ChannelCountMismatch {
            left: reference.channels(),
            right: new.channels(),
        });
    }

    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            let r = aggregate(reference, id)?;
            let n = aggregate(new, id)?;
            let diff = r.iter().zip(n.iter()).map(|(a, b)| a - b).collect();
            Ok((id.to_string(), Spectrum::new(diff)))
        })
        .collect()
}

/// Channel-wise mean of the per-id differences.
///
/// Every id must be present in both tables. A single id is valid: the
/// correction is then that id's difference. NaN in any input propagates.
pub fn compute_correction<S: AsRef<str>>(
    reference: &SpectrumTable,
    new: &SpectrumTable,
    ids: &[S],
) -> Result<CorrectionVector> {
    let diffs = per_id_differences(reference, new, ids)?;
    if diffs.is_empty() {
        return Err(EngineError::InsufficientData(
            "correction needs at least one matched id".into(),
        ));
    }

    let channels = reference.channels();
    let mut sum = vec![0.0_f64; channels];
    for diff in diffs.values() {
        for (acc, d) in sum.iter_mut().zip(diff.iter()) {
            *acc += d;
        }
    }
    let n = diffs.len() as f64;
    let values = Spectrum::new(sum.into_iter().map(|s| s / n).collect());

    if values.has_non_finite() {
        warn!("correction vector contains non-finite values; check input spectra");
    }
    info!("correction derived from {} ids over {channels} channels", diffs.len());

    Ok(CorrectionVector {
        values,
        source_ids: diffs.into_keys().collect(),
    })
}
