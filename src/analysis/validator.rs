use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::metrics::SpectralMetrics;
use super::region::{analyze_regions, CriticalRegion};
use super::shift::{ShiftDetector, ShiftResult};
use crate::data::aggregate::aggregate;
use crate::data::model::SpectrumTable;
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Acceptance limits for one validation session.
///
/// Fields are private so that every instance went through [`Thresholds::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds", into = "RawThresholds")]
pub struct Thresholds {
    min_correlation: f64,
    max_rms: f64,
    max_abs_diff: f64,
}

#[derive(Serialize, Deserialize)]
struct RawThresholds {
    min_correlation: f64,
    max_rms: f64,
    max_abs_diff: f64,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = EngineError;

    fn try_from(raw: RawThresholds) -> Result<Self> {
        Thresholds::new(raw.min_correlation, raw.max_rms, raw.max_abs_diff)
    }
}

impl From<Thresholds> for RawThresholds {
    fn from(t: Thresholds) -> Self {
        RawThresholds {
            min_correlation: t.min_correlation,
            max_rms: t.max_rms,
            max_abs_diff: t.max_abs_diff,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_correlation: 0.9995,
            max_rms: 0.010,
            max_abs_diff: 0.015,
        }
    }
}

impl Thresholds {
    /// `min_correlation` must lie in (−1, 1]; both bounds must be ≥ 0.
    pub fn new(min_correlation: f64, max_rms: f64, max_abs_diff: f64) -> Result<Self> {
        if !(min_correlation > -1.0 && min_correlation <= 1.0) {
            return Err(EngineError::InvalidThresholds(format!(
                "min_correlation {min_correlation} outside (-1, 1]"
            )));
        }
        if !(max_rms >= 0.0 && max_rms.is_finite()) {
            return Err(EngineError::InvalidThresholds(format!(
                "max_rms {max_rms} must be a finite value >= 0"
            )));
        }
        if !(max_abs_diff >= 0.0 && max_abs_diff.is_finite()) {
            return Err(EngineError::InvalidThresholds(format!(
                "max_abs_diff {max_abs_diff} must be a finite value >= 0"
            )));
        }
        Ok(Thresholds {
            min_correlation,
            max_rms,
            max_abs_diff,
        })
    }

    pub fn min_correlation(&self) -> f64 {
        self.min_correlation
    }

    pub fn max_rms(&self) -> f64 {
        self.max_rms
    }

    pub fn max_abs_diff(&self) -> f64 {
        self.max_abs_diff
    }

    /// Evaluate each criterion on its own. NaN metrics fail.
    pub fn check(&self, metrics: &SpectralMetrics) -> CriterionChecks {
        CriterionChecks {
            correlation: metrics.correlation >= self.min_correlation,
            rms: metrics.rms <= self.max_rms,
            max_abs_diff: metrics.max_abs_diff <= self.max_abs_diff,
        }
    }
}

// ---------------------------------------------------------------------------
// Result records
// ---------------------------------------------------------------------------

/// Per-criterion verdicts, so callers can show which one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionChecks {
    pub correlation: bool,
    pub rms: bool,
    pub max_abs_diff: bool,
}

impl CriterionChecks {
    pub fn all_passed(&self) -> bool {
        self.correlation && self.rms && self.max_abs_diff
    }

    /// Names of the failed criteria.
    pub fn failed(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.correlation {
            out.push("correlation");
        }
        if !self.rms {
            out.push("rms");
        }
        if !self.max_abs_diff {
            out.push("max_abs_diff");
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

impl ValidationStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Pass => write!(f, "PASS"),
            ValidationStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Verdict for one standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: String,
    pub correlation: f64,
    pub rms: f64,
    pub max_abs_diff: f64,
    pub mean_diff: f64,
    pub checks: CriterionChecks,
    /// Present only when a shift was detected.
    pub shift: Option<ShiftResult>,
    /// Whole-spectrum status. Regions do not affect it.
    pub status: ValidationStatus,
    pub region_results: BTreeMap<String, SpectralMetrics>,
}

impl ValidationResult {
    pub fn metrics(&self) -> SpectralMetrics {
        SpectralMetrics {
            correlation: self.correlation,
            rms: self.rms,
            max_abs_diff: self.max_abs_diff,
            mean_diff: self.mean_diff,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// Status when critical regions are treated as gating: every region must
    /// also satisfy `thresholds`.
    pub fn status_with_regions(&self, thresholds: &Thresholds) -> ValidationStatus {
        let regions_ok = self
            .region_results
            .values()
            .all(|m| thresholds.check(m).all_passed());
        ValidationStatus::from_passed(self.passed() && regions_ok)
    }

    /// Regions failing `thresholds`, by name.
    pub fn failing_regions(&self, thresholds: &Thresholds) -> Vec<&str> {
        self.region_results
            .iter()
            .filter(|(_, m)| !thresholds.check(m).all_passed())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Outcome of validating one standard within a kit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StandardOutcome {
    Validated(ValidationResult),
    /// The standard could not be validated (e.g. missing on one side).
    Failed { id: String, reason: String },
}

impl StandardOutcome {
    pub fn id(&self) -> &str {
        match self {
            StandardOutcome::Validated(r) => &r.id,
            StandardOutcome::Failed { id, .. } => id,
        }
    }

    pub fn result(&self) -> Option<&ValidationResult> {
        match self {
            StandardOutcome::Validated(r) => Some(r),
            StandardOutcome::Failed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StandardValidator
// ---------------------------------------------------------------------------

/// Compares a standard's current spectrum with its reference.
#[derive(Debug, Clone, Default)]
pub struct StandardValidator {
    pub thresholds: Thresholds,
    pub regions: Vec<CriticalRegion>,
    /// When set, a detected shift is attached to each result.
    pub shift_detector: Option<ShiftDetector>,
}

impl StandardValidator {
    pub fn new(thresholds: Thresholds) -> Self {
        StandardValidator {
            thresholds,
            regions: Vec::new(),
            shift_detector: None,
        }
    }

    pub fn with_regions(mut self, regions: Vec<CriticalRegion>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_shift_detector(mut self, detector: ShiftDetector) -> Self {
        self.shift_detector = Some(detector);
        self
    }

    /// Validate one standard.
    pub fn validate(
        &self,
        id: &str,
        reference: &[f64],
        current: &[f64],
    ) -> Result<ValidationResult> {
        let metrics = SpectralMetrics::compute(reference, current)?;
        if metrics.is_degenerate() {
            warn!("standard '{id}': non-finite values in spectra, metrics contain NaN");
        }

        let region_results = analyze_regions(reference, current, &self.regions)?;
        let shift = match &self.shift_detector {
            Some(det) => match det.detect(reference, current) {
                Ok(detection) => detection.result(),
                Err(EngineError::SpectrumTooShort { channels, required }) => {
                    warn!(
                        "standard '{id}': {channels} channels, shift search needs {required}; \
                         shift not checked"
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let checks = self.thresholds.check(&metrics);
        let status = ValidationStatus::from_passed(checks.all_passed());
        debug!(
            "standard '{id}': r={:.6} rms={:.6} max|d|={:.6} -> {status}",
            metrics.correlation, metrics.rms, metrics.max_abs_diff
        );

        Ok(ValidationResult {
            id: id.to_string(),
            correlation: metrics.correlation,
            rms: metrics.rms,
            max_abs_diff: metrics.max_abs_diff,
            mean_diff: metrics.mean_diff,
            checks,
            shift,
            status,
            region_results,
        })
    }

    /// Average replicates on both sides, then validate.
    pub fn validate_id(
        &self,
        reference: &SpectrumTable,
        current: &SpectrumTable,
        id: &str,
    ) -> Result<ValidationResult> {
        let ref_mean = aggregate(reference, id)?;
        let cur_mean = aggregate(current, id)?;
        self.validate(id, &ref_mean, &cur_mean)
    }

    /// Validate every id independently, in parallel.
    ///
    /// One standard's failure is recorded as [`StandardOutcome::Failed`] and
    /// never stops the others. Outcomes are sorted by id.
    pub fn validate_kit<S>(
        &self,
        reference: &SpectrumTable,
        current: &SpectrumTable,
        ids: &[S],
    ) -> Vec<StandardOutcome>
    where
        S: AsRef<str> + Sync,
    {
        let mut outcomes: Vec<StandardOutcome> = ids
            .par_iter()
            .map(|id| {
                let id = id.as_ref();
                match self.validate_id(reference, current, id) {
                    Ok(result) => StandardOutcome::Validated(result),
                    Err(e) => {
                        warn!("standard '{id}' not validated: {e}");
                        StandardOutcome::Failed {
                            id: id.to_string(),
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .collect();
        outcomes.sort_by(|a, b| a.id().cmp(b.id()));
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MeasurementRecord;

    fn ramp(n: usize, offset: f64) -> Vec<f64> {
        (0..n).map(|i| 0.2 + 0.01 * i as f64 + offset).collect()
    }

    #[test]
    fn thresholds_reject_out_of_range() {
        assert!(Thresholds::new(-1.0, 0.01, 0.01).is_err());
        assert!(Thresholds::new(1.0001, 0.01, 0.01).is_err());
        assert!(Thresholds::new(0.99, -0.01, 0.01).is_err());
        assert!(Thresholds::new(0.99, 0.01, -0.5).is_err());
        assert!(Thresholds::new(f64::NAN, 0.01, 0.01).is_err());
        assert!(Thresholds::new(1.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn thresholds_deserialize_through_validation() {
        let ok: Thresholds =
            serde_json::from_str(r#"{"min_correlation":0.99,"max_rms":0.01,"max_abs_diff":0.02}"#)
                .unwrap();
        assert_eq!(ok.max_abs_diff(), 0.02);
        let bad: std::result::Result<Thresholds, _> =
            serde_json::from_str(r#"{"min_correlation":0.99,"max_rms":-1,"max_abs_diff":0.02}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn self_validation_passes_strictest_thresholds() {
        let s = ramp(50, 0.0);
        let v = StandardValidator::new(Thresholds::new(1.0, 0.0, 0.0).unwrap());
        let r = v.validate("S", &s, &s).unwrap();
        assert_eq!(r.correlation, 1.0);
        assert_eq!(r.rms, 0.0);
        assert_eq!(r.max_abs_diff, 0.0);
        assert_eq!(r.status, ValidationStatus::Pass);
    }

    #[test]
    fn each_criterion_reported_independently() {
        let reference = ramp(50, 0.0);
        let current = ramp(50, 0.02);
        let v = StandardValidator::new(Thresholds::new(0.99, 0.01, 0.015).unwrap());
        let r = v.validate("S", &reference, &current).unwrap();
        assert!(r.checks.correlation);
        assert!(!r.checks.rms);
        assert!(!r.checks.max_abs_diff);
        assert_eq!(r.checks.failed(), vec!["rms", "max_abs_diff"]);
        assert_eq!(r.status, ValidationStatus::Fail);
        assert!((r.mean_diff - 0.02).abs() < 1e-12);
    }

    #[test]
    fn nan_input_never_passes() {
        let reference = ramp(20, 0.0);
        let mut current = reference.clone();
        current[3] = f64::NAN;
        let v = StandardValidator::new(Thresholds::new(-0.5, 1e9, 1e9).unwrap());
        let r = v.validate("S", &reference, &current).unwrap();
        assert!(r.rms.is_nan());
        assert_eq!(r.status, ValidationStatus::Fail);
    }

    #[test]
    fn regions_are_informational_unless_gated() {
        let reference = ramp(40, 0.0);
        let mut current = reference.clone();
        for v in &mut current[10..12] {
            *v += 0.012;
        }
        let thresholds = Thresholds::new(0.99, 0.005, 0.015).unwrap();
        let v = StandardValidator::new(thresholds).with_regions(vec![
            CriticalRegion::new("band", 8, 14).unwrap(),
            CriticalRegion::new("quiet", 20, 30).unwrap(),
        ]);
        let r = v.validate("S", &reference, &current).unwrap();
        // Whole spectrum: rms = 0.012 * sqrt(2/40) ≈ 0.0027.
        assert_eq!(r.status, ValidationStatus::Pass);
        // Band: rms = 0.012 * sqrt(2/6) ≈ 0.0069.
        assert_eq!(r.status_with_regions(&thresholds), ValidationStatus::Fail);
        assert_eq!(r.failing_regions(&thresholds), vec!["band"]);
    }

    #[test]
    fn short_spectra_skip_shift_search() {
        let s = ramp(8, 0.0);
        let v = StandardValidator::default().with_shift_detector(ShiftDetector::default());
        let r = v.validate("S", &s, &s).unwrap();
        assert!(r.shift.is_none());
        assert_eq!(r.status, ValidationStatus::Pass);

        let moved = ramp(8, 0.5);
        let r = v.validate("S", &s, &moved).unwrap();
        assert!(r.shift.is_none());
        assert_eq!(r.status, ValidationStatus::Fail);
    }

    #[test]
    fn region_outside_spectrum_fails_validation() {
        let s = ramp(10, 0.0);
        let v = StandardValidator::default()
            .with_regions(vec![CriticalRegion::new("far", 5, 20).unwrap()]);
        assert!(matches!(
            v.validate("S", &s, &s),
            Err(EngineError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn kit_validation_isolates_failures() {
        let reference = SpectrumTable::build(vec![
            MeasurementRecord::new("B", ramp(30, 0.0)),
            MeasurementRecord::new("A", ramp(30, 0.0)),
            MeasurementRecord::new("C", ramp(30, 0.0)),
        ])
        .unwrap();
        let current = SpectrumTable::build(vec![
            MeasurementRecord::new("A", ramp(30, 0.001)),
            MeasurementRecord::new("A", ramp(30, -0.001)),
            MeasurementRecord::new("C", ramp(30, 0.5)),
        ])
        .unwrap();

        let v = StandardValidator::default();
        let outcomes = v.validate_kit(&reference, &current, &["C", "B", "A"]);
        let ids: Vec<&str> = outcomes.iter().map(StandardOutcome::id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let a = outcomes[0].result().unwrap();
        assert!(a.rms < 1e-12);
        assert!(a.passed());
        assert!(matches!(&outcomes[1], StandardOutcome::Failed { reason, .. } if reason.contains("'B'")));
        assert!(!outcomes[2].result().unwrap().passed());
    }
}
