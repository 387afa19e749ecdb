use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::diagnostics::{OffsetLimits, QualityTiers, WhiteReferenceTiers, WstdTiers};
use crate::analysis::region::{CriticalRegion, WavelengthAxis, DEFAULT_CRITICAL_BANDS};
use crate::analysis::shift::ShiftDetector;
use crate::analysis::validator::{StandardValidator, Thresholds};
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Critical bands (in nm)
// ---------------------------------------------------------------------------

/// A critical band expressed in wavelengths, resolved to channels per
/// instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    pub name: String,
    pub start_nm: f64,
    pub end_nm: f64,
}

fn default_bands() -> Vec<BandConfig> {
    DEFAULT_CRITICAL_BANDS
        .iter()
        .map(|&(start_nm, end_nm)| BandConfig {
            name: format!("{start_nm:.0}-{end_nm:.0}"),
            start_nm,
            end_nm,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Caller-side settings for a validation session.
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides:
///
/// ```json
/// { "thresholds": { "min_correlation": 0.999, "max_rms": 0.005, "max_abs_diff": 0.01 },
///   "shift": { "max_shift": 8 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub critical_bands: Vec<BandConfig>,
    pub axis: WavelengthAxis,
    pub shift: ShiftDetector,
    /// Attach shift estimates to validation results.
    pub detect_shift: bool,
    /// White-standard RMS at or above which another alignment pass is needed.
    pub alignment_rms_threshold: f64,
    pub quality_tiers: QualityTiers,
    pub wstd_tiers: WstdTiers,
    pub white_reference_tiers: WhiteReferenceTiers,
    pub offset_limits: OffsetLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            thresholds: Thresholds::default(),
            critical_bands: default_bands(),
            axis: WavelengthAxis::default(),
            shift: ShiftDetector::default(),
            detect_shift: true,
            alignment_rms_threshold: 0.005,
            quality_tiers: QualityTiers::default(),
            wstd_tiers: WstdTiers::default(),
            white_reference_tiers: WhiteReferenceTiers::default(),
            offset_limits: OffsetLimits::default(),
        }
    }
}

fn ascending(name: &str, values: &[f64]) -> Result<()> {
    let negative = values.iter().any(|v| !v.is_finite() || *v < 0.0);
    if negative || values.windows(2).any(|w| w[0] > w[1]) {
        return Err(EngineError::InvalidConfig(format!(
            "{name} must be non-negative and ascending, got {values:?}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Reject settings no validation run could use.
    ///
    /// Thresholds and shift settings validate themselves on deserialisation.
    pub fn validate(&self) -> Result<()> {
        if !(self.axis.start_nm.is_finite()
            && self.axis.end_nm.is_finite()
            && self.axis.start_nm < self.axis.end_nm)
        {
            return Err(EngineError::InvalidConfig(format!(
                "wavelength axis {}-{} nm is not increasing",
                self.axis.start_nm, self.axis.end_nm
            )));
        }
        for band in &self.critical_bands {
            if !(band.start_nm < band.end_nm) {
                return Err(EngineError::InvalidConfig(format!(
                    "band '{}' has start {} >= end {}",
                    band.name, band.start_nm, band.end_nm
                )));
            }
        }
        if !(self.alignment_rms_threshold >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "alignment_rms_threshold must be >= 0".into(),
            ));
        }
        let q = &self.quality_tiers;
        ascending("quality_tiers", &[q.excellent, q.good, q.acceptable])?;
        ascending("wstd_tiers", &[self.wstd_tiers.good, self.wstd_tiers.warning])?;
        let o = &self.offset_limits;
        ascending("offset_limits", &[o.negligible, o.acceptable])?;
        let w = &self.white_reference_tiers;
        ascending(
            "white_reference_tiers.rms",
            &[w.excellent.rms, w.good.rms, w.acceptable.rms],
        )?;
        ascending(
            "white_reference_tiers.max_diff",
            &[w.excellent.max_diff, w.good.max_diff, w.acceptable.max_diff],
        )?;
        Ok(())
    }

    /// Resolve the configured bands onto a `channels`-long spectrum.
    ///
    /// Bands entirely outside the instrument range are skipped with a warning.
    pub fn critical_regions(&self, channels: usize) -> Result<Vec<CriticalRegion>> {
        let mut regions = Vec::with_capacity(self.critical_bands.len());
        for band in &self.critical_bands {
            match self
                .axis
                .region(band.name.clone(), band.start_nm, band.end_nm, channels)
            {
                Ok(region) => regions.push(region),
                Err(EngineError::RegionOutOfBounds { .. }) => {
                    warn!(
                        "band '{}' ({}-{} nm) outside instrument range, skipped",
                        band.name, band.start_nm, band.end_nm
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(regions)
    }

    /// A validator carrying these thresholds, the resolved regions and, if
    /// enabled, the shift detector.
    pub fn validator(&self, channels: usize) -> Result<StandardValidator> {
        let mut validator =
            StandardValidator::new(self.thresholds).with_regions(self.critical_regions(channels)?);
        if self.detect_shift {
            validator = validator.with_shift_detector(self.shift);
        }
        Ok(validator)
    }
}
