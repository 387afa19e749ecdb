use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// EngineError – every failure the engine can report
// ---------------------------------------------------------------------------

/// Errors produced by the comparison and validation engine.
///
/// Structural problems (shape mismatches, missing ids, empty inputs) and
/// configuration problems are reported here. Numeric degeneracy (NaN in the
/// input spectra) is *not* an error: it propagates into the metrics so that
/// reporting shows the corruption instead of a false pass.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A table was built from spectra of differing lengths.
    #[error("record {index} ('{id}') has {found} channels, expected {expected}")]
    InconsistentChannelCount {
        index: usize,
        id: String,
        expected: usize,
        found: usize,
    },

    /// Two spectra or tables that must share a channel count do not.
    #[error("channel count mismatch: {left} vs {right}")]
    ChannelCountMismatch { left: usize, right: usize },

    /// No record carries the requested identifier.
    #[error("no records for id '{0}'")]
    NoRecordsForId(String),

    /// Not enough data to compute a result (e.g. zero matched ids).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Spectrum too short for the configured shift search.
    #[error("spectrum has {channels} channels, shift search needs at least {required}")]
    SpectrumTooShort { channels: usize, required: usize },

    /// Region with an empty or inverted channel range.
    #[error("invalid region '{name}': {reason}")]
    InvalidRegion { name: String, reason: String },

    /// Region extends past the channel count of the spectra.
    #[error("region '{name}' [{start}, {end}) exceeds {channels} channels")]
    RegionOutOfBounds {
        name: String,
        start: usize,
        end: usize,
        channels: usize,
    },

    /// Kit-level statistics requested over zero results.
    #[error("cannot summarise an empty result set")]
    EmptyResultSet,

    /// Threshold values outside their valid ranges.
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    /// Engine configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
