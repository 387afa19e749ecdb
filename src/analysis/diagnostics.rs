//! Quality grades and instrument diagnostics layered on top of the metrics.
//!
//! None of these affect pass/fail; they describe *how well* a standard or a
//! white reference matches, for display by reporting collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::metrics::{max_propagating, pearson, rms_diff, std_dev};
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Tier tables
// ---------------------------------------------------------------------------

/// Upper bounds (exclusive) on RMS for each validation quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityTiers {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
}

impl Default for QualityTiers {
    fn default() -> Self {
        QualityTiers {
            excellent: 0.001,
            good: 0.01,
            acceptable: 0.05,
        }
    }
}

/// Bounds (exclusive) on the max deviation of a white-standard spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WstdTiers {
    pub good: f64,
    pub warning: f64,
}

impl Default for WstdTiers {
    fn default() -> Self {
        WstdTiers {
            good: 0.015,
            warning: 0.05,
        }
    }
}

/// `(rms, max_diff)` limits (inclusive) for one white-reference grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhiteLimit {
    pub rms: f64,
    pub max_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteReferenceTiers {
    pub excellent: WhiteLimit,
    pub good: WhiteLimit,
    pub acceptable: WhiteLimit,
}

impl Default for WhiteReferenceTiers {
    fn default() -> Self {
        WhiteReferenceTiers {
            excellent: WhiteLimit {
                rms: 0.002,
                max_diff: 0.005,
            },
            good: WhiteLimit {
                rms: 0.005,
                max_diff: 0.01,
            },
            acceptable: WhiteLimit {
                rms: 0.01,
                max_diff: 0.02,
            },
        }
    }
}

/// Bounds (exclusive) on |mean offset|.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetLimits {
    pub negligible: f64,
    pub acceptable: f64,
}

impl Default for OffsetLimits {
    fn default() -> Self {
        OffsetLimits {
            negligible: 0.001,
            acceptable: 0.005,
        }
    }
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    Excellent,
    Good,
    Acceptable,
    Bad,
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Acceptable => "acceptable",
            QualityGrade::Bad => "bad",
        };
        write!(f, "{s}")
    }
}

/// Grade a standard by its RMS difference. NaN grades as `Bad`.
pub fn grade_rms(rms: f64, tiers: &QualityTiers) -> QualityGrade {
    if rms < tiers.excellent {
        QualityGrade::Excellent
    } else if rms < tiers.good {
        QualityGrade::Good
    } else if rms < tiers.acceptable {
        QualityGrade::Acceptable
    } else {
        QualityGrade::Bad
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteReferenceGrade {
    Excellent,
    Good,
    Acceptable,
    Review,
}

pub fn grade_white_reference(
    rms: f64,
    max_diff: f64,
    tiers: &WhiteReferenceTiers,
) -> WhiteReferenceGrade {
    let within = |l: &WhiteLimit| rms <= l.rms && max_diff <= l.max_diff;
    if within(&tiers.excellent) {
        WhiteReferenceGrade::Excellent
    } else if within(&tiers.good) {
        WhiteReferenceGrade::Good
    } else if within(&tiers.acceptable) {
        WhiteReferenceGrade::Acceptable
    } else {
        WhiteReferenceGrade::Review
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetGrade {
    Negligible,
    Acceptable,
    Significant,
}

pub fn grade_offset(offset: f64, limits: &OffsetLimits) -> OffsetGrade {
    let abs = offset.abs();
    if abs < limits.negligible {
        OffsetGrade::Negligible
    } else if abs < limits.acceptable {
        OffsetGrade::Acceptable
    } else {
        OffsetGrade::Significant
    }
}

// ---------------------------------------------------------------------------
// White standard (WSTD) diagnostic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WstdStatus {
    Good,
    Warning,
    Bad,
}

/// Deviation statistics of a white-standard measurement, which ideally reads
/// flat zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WstdDiagnostic {
    pub max_deviation: f64,
    pub mean_deviation: f64,
    pub std_deviation: f64,
    pub status: WstdStatus,
}

pub fn wstd_diagnostic(spectrum: &[f64], tiers: &WstdTiers) -> Result<WstdDiagnostic> {
    if spectrum.is_empty() {
        return Err(EngineError::InsufficientData(
            "white standard spectrum is empty".into(),
        ));
    }
    let n = spectrum.len() as f64;
    let max_deviation = max_propagating(spectrum.iter().map(|v| v.abs()), 0.0);
    let status = if max_deviation < tiers.good {
        WstdStatus::Good
    } else if max_deviation < tiers.warning {
        WstdStatus::Warning
    } else {
        WstdStatus::Bad
    };
    Ok(WstdDiagnostic {
        max_deviation,
        mean_deviation: spectrum.iter().map(|v| v.abs()).sum::<f64>() / n,
        std_deviation: std_dev(spectrum),
        status,
    })
}

/// Whether the white standard still differs enough from its reference to
/// need another baseline alignment pass.
pub fn needs_alignment(
    white_reference: &[f64],
    white_current: &[f64],
    threshold: f64,
) -> Result<bool> {
    if white_reference.len() != white_current.len() {
        return Err(EngineError::ChannelCountMismatch {
            left: white_reference.len(),
            right: white_current.len(),
        });
    }
    if white_reference.is_empty() {
        return Err(EngineError::InsufficientData(
            "white standard spectrum is empty".into(),
        ));
    }
    let rms = rms_diff(white_reference, white_current);
    Ok(!(rms < threshold))
}

// ---------------------------------------------------------------------------
// Pairwise matrices
// ---------------------------------------------------------------------------

fn check_same_length<S: AsRef<[f64]>>(spectra: &[S]) -> Result<usize> {
    let n = spectra.first().map_or(0, |s| s.as_ref().len());
    for s in spectra {
        if s.as_ref().len() != n {
            return Err(EngineError::ChannelCountMismatch {
                left: n,
                right: s.as_ref().len(),
            });
        }
    }
    if n == 0 {
        return Err(EngineError::InsufficientData(
            "need non-empty spectra to compare".into(),
        ));
    }
    Ok(n)
}

/// Symmetric Pearson matrix; the diagonal is 1.
pub fn correlation_matrix<S: AsRef<[f64]>>(spectra: &[S]) -> Result<Vec<Vec<f64>>> {
    check_same_length(spectra)?;
    let k = spectra.len();
    let mut m = vec![vec![1.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let c = pearson(spectra[i].as_ref(), spectra[j].as_ref());
            m[i][j] = c;
            m[j][i] = c;
        }
    }
    Ok(m)
}

/// Symmetric RMS-difference matrix; the diagonal is 0.
pub fn rms_matrix<S: AsRef<[f64]>>(spectra: &[S]) -> Result<Vec<Vec<f64>>> {
    check_same_length(spectra)?;
    let k = spectra.len();
    let mut m = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let r = rms_diff(spectra[i].as_ref(), spectra[j].as_ref());
            m[i][j] = r;
            m[j][i] = r;
        }
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_grades() {
        let t = QualityTiers::default();
        assert_eq!(grade_rms(0.0005, &t), QualityGrade::Excellent);
        assert_eq!(grade_rms(0.001, &t), QualityGrade::Good);
        assert_eq!(grade_rms(0.02, &t), QualityGrade::Acceptable);
        assert_eq!(grade_rms(0.05, &t), QualityGrade::Bad);
        assert_eq!(grade_rms(f64::NAN, &t), QualityGrade::Bad);
    }

    #[test]
    fn white_reference_grades_need_both_limits() {
        let t = WhiteReferenceTiers::default();
        assert_eq!(grade_white_reference(0.001, 0.004, &t), WhiteReferenceGrade::Excellent);
        assert_eq!(grade_white_reference(0.001, 0.008, &t), WhiteReferenceGrade::Good);
        assert_eq!(grade_white_reference(0.009, 0.001, &t), WhiteReferenceGrade::Acceptable);
        assert_eq!(grade_white_reference(0.02, 0.001, &t), WhiteReferenceGrade::Review);
    }

    #[test]
    fn offset_grades_use_magnitude() {
        let l = OffsetLimits::default();
        assert_eq!(grade_offset(-0.0005, &l), OffsetGrade::Negligible);
        assert_eq!(grade_offset(-0.003, &l), OffsetGrade::Acceptable);
        assert_eq!(grade_offset(0.005, &l), OffsetGrade::Significant);
    }

    #[test]
    fn wstd_status() {
        let t = WstdTiers::default();
        let flat = wstd_diagnostic(&[0.001, -0.002, 0.0], &t).unwrap();
        assert_eq!(flat.status, WstdStatus::Good);
        assert_eq!(flat.max_deviation, 0.002);
        assert_eq!(wstd_diagnostic(&[0.02, 0.0], &t).unwrap().status, WstdStatus::Warning);
        assert_eq!(wstd_diagnostic(&[0.0, -0.08], &t).unwrap().status, WstdStatus::Bad);
        assert_eq!(wstd_diagnostic(&[0.0, f64::NAN], &t).unwrap().status, WstdStatus::Bad);
        assert!(wstd_diagnostic(&[], &t).is_err());
    }

    #[test]
    fn alignment_decision() {
        let white = [0.5, 0.5, 0.5, 0.5];
        assert!(!needs_alignment(&white, &[0.501, 0.499, 0.5, 0.5], 0.005).unwrap());
        assert!(needs_alignment(&white, &[0.51, 0.51, 0.51, 0.51], 0.005).unwrap());
        assert!(needs_alignment(&white, &[0.5, 0.5, 0.5, f64::NAN], 0.005).unwrap());
    }

    #[test]
    fn matrices_are_symmetric() {
        let spectra = vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 4.0, 6.5],
            vec![3.0, 2.0, 1.0],
        ];
        let c = correlation_matrix(&spectra).unwrap();
        let r = rms_matrix(&spectra).unwrap();
        for i in 0..3 {
            assert_eq!(c[i][i], 1.0);
            assert_eq!(r[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(c[i][j], c[j][i]);
                assert_eq!(r[i][j], r[j][i]);
            }
        }
        assert!(c[0][2] < -0.99);
        assert!(correlation_matrix(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
