use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Spectrum – one intensity vector
// ---------------------------------------------------------------------------

/// Intensities, one per spectral channel. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spectrum {
    values: Vec<f64>,
}

impl Spectrum {
    pub fn new(values: Vec<f64>) -> Self {
        Spectrum { values }
    }

    /// Widen single-precision instrument data to `f64`.
    pub fn from_f32(values: &[f32]) -> Self {
        Spectrum {
            values: values.iter().map(|&v| v as f64).collect(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Whether any channel holds NaN or ±Inf.
    pub fn has_non_finite(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }
}

impl Deref for Spectrum {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}

impl AsRef<[f64]> for Spectrum {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl From<Vec<f64>> for Spectrum {
    fn from(values: Vec<f64>) -> Self {
        Spectrum::new(values)
    }
}

// ---------------------------------------------------------------------------
// MeasurementRecord – one row of an instrument export
// ---------------------------------------------------------------------------

/// A single measurement. Several records may share an `id` (replicates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Sample / standard identifier.
    pub id: String,
    pub spectrum: Spectrum,
    /// Free-text note; the lamp label in baseline workflows.
    pub note: Option<String>,
}

impl MeasurementRecord {
    pub fn new(id: impl Into<String>, spectrum: impl Into<Spectrum>) -> Self {
        MeasurementRecord {
            id: id.into(),
            spectrum: spectrum.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// ---------------------------------------------------------------------------
// SpectrumTable – the validated collection
// ---------------------------------------------------------------------------

/// Ordered records sharing one channel count, with an id index.
#[derive(Debug, Clone)]
pub struct SpectrumTable {
    records: Vec<MeasurementRecord>,
    channels: usize,
    /// id → positions of its records, in insertion order.
    index: BTreeMap<String, Vec<usize>>,
}

impl SpectrumTable {
    /// Validate the records and build the id index.
    ///
    /// Every spectrum must have the length of the first one. An empty record
    /// list yields an empty table with zero channels.
    pub fn build(records: Vec<MeasurementRecord>) -> Result<Self> {
        let channels = records.first().map_or(0, |r| r.spectrum.len());

        let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, rec) in records.iter().enumerate() {
            if rec.spectrum.len() != channels {
                return Err(EngineError::InconsistentChannelCount {
                    index: i,
                    id: rec.id.clone(),
                    expected: channels,
                    found: rec.spectrum.len(),
                });
            }
            index.entry(rec.id.clone()).or_default().push(i);
        }

        Ok(SpectrumTable {
            records,
            channels,
            index,
        })
    }

    /// Shared channel count `C`.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// Number of records (replicates counted individually).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unique identifiers in lexicographic order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All records carrying `id`, in table order.
    pub fn records_for<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a MeasurementRecord> + 'a {
        self.index
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.records[i])
    }

    pub fn replicate_count(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, Vec::len)
    }

    /// Distinct notes (lamp labels) present in the table, sorted.
    pub fn notes(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter_map(|r| r.note.as_deref())
            .collect()
    }
}
