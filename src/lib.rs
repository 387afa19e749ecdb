//! Spectral comparison and validation engine for NIR baseline correction.
//!
//! After a lamp replacement the technician measures a kit of optical
//! standards with the old and the new lamp. This crate
//!
//! * matches the two measurement tables by standard id and averages replicates,
//! * derives the baseline correction vector (`reference − new`),
//! * validates each standard against correlation / RMS / max |Δ| thresholds,
//!   optionally per critical band and with wavelength-shift detection,
//! * summarises a kit into pass/fail counts and the worst standard.
//!
//! Every operation is a pure function over borrowed inputs; file loading,
//! workflow state and report rendering belong to the caller.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod synthetic;

pub use analysis::correction::{compute_correction, CorrectionVector};
pub use analysis::region::{CriticalRegion, WavelengthAxis};
pub use analysis::shift::{ShiftDetection, ShiftDetector, ShiftResult};
pub use analysis::summary::{summarize, summarize_outcomes, KitSummary};
pub use analysis::validator::{
    StandardOutcome, StandardValidator, Thresholds, ValidationResult, ValidationStatus,
};
pub use config::EngineConfig;
pub use data::aggregate::aggregate;
pub use data::matcher::common_ids;
pub use data::model::{MeasurementRecord, Spectrum, SpectrumTable};
pub use error::{EngineError, Result};
