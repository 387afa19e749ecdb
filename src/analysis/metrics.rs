use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Every value equal to the first (no spread at all).
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}

/// Fold with `pick`, but any NaN makes the result NaN.
fn fold_propagating<I>(values: I, init: f64, pick: fn(f64, f64) -> f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().fold(init, |acc, v| {
        if v.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            pick(acc, v)
        }
    })
}

/// Maximum of `values` (or `init` if empty). NaN anywhere yields NaN.
pub(crate) fn max_propagating<I: IntoIterator<Item = f64>>(values: I, init: f64) -> f64 {
    fold_propagating(values, init, f64::max)
}

/// Minimum of `values` (or `init` if empty). NaN anywhere yields NaN.
pub(crate) fn min_propagating<I: IntoIterator<Item = f64>>(values: I, init: f64) -> f64 {
    fold_propagating(values, init, f64::min)
}

// ---------------------------------------------------------------------------
// Metric kernels
// ---------------------------------------------------------------------------

/// Pearson correlation coefficient of two equal-length slices.
///
/// Zero-variance fallback: if either side is constant the coefficient is
/// undefined, so the result is `1.0` when both slices are element-wise equal
/// and `0.0` otherwise. NaN inputs, empty slices and slices of different
/// lengths yield NaN.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    if n == 0 || n != b.len() {
        return f64::NAN;
    }
    if a == b {
        return 1.0;
    }

    let nf = n as f64;
    let mean_a = a.iter().sum::<f64>() / nf;
    let mean_b = b.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a.is_nan() || var_b.is_nan() || cov.is_nan() {
        return f64::NAN;
    }

    if is_constant(a) || is_constant(b) || var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }

    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Root-mean-square of `current − reference`.
pub fn rms_diff(reference: &[f64], current: &[f64]) -> f64 {
    let n = reference.len() as f64;
    let sq: f64 = reference
        .iter()
        .zip(current)
        .map(|(r, c)| (c - r) * (c - r))
        .sum();
    (sq / n).sqrt()
}

/// Largest absolute channel difference. NaN anywhere yields NaN.
pub fn max_abs_diff(reference: &[f64], current: &[f64]) -> f64 {
    max_propagating(reference.iter().zip(current).map(|(r, c)| (c - r).abs()), 0.0)
}

/// Mean signed offset `current − reference`.
pub fn mean_diff(reference: &[f64], current: &[f64]) -> f64 {
    let n = reference.len() as f64;
    reference.iter().zip(current).map(|(r, c)| c - r).sum::<f64>() / n
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}

// ---------------------------------------------------------------------------
// SpectralMetrics – the comparison bundle
// ---------------------------------------------------------------------------

/// Comparison metrics between a reference and a current spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralMetrics {
    pub correlation: f64,
    pub rms: f64,
    pub max_abs_diff: f64,
    /// Mean signed offset, `current − reference`.
    pub mean_diff: f64,
}

impl SpectralMetrics {
    /// Compute all metrics. Slices must be equal-length and non-empty.
    pub fn compute(reference: &[f64], current: &[f64]) -> Result<Self> {
        if reference.len() != current.len() {
            return Err(EngineError::ChannelCountMismatch {
                left: reference.len(),
                right: current.len(),
            });
        }
        if reference.is_empty() {
            return Err(EngineError::InsufficientData(
                "cannot compare empty spectra".into(),
            ));
        }
        Ok(SpectralMetrics {
            correlation: pearson(reference, current),
            rms: rms_diff(reference, current),
            max_abs_diff: max_abs_diff(reference, current),
            mean_diff: mean_diff(reference, current),
        })
    }

    /// Whether any metric is NaN (corrupt input).
    pub fn is_degenerate(&self) -> bool {
        self.correlation.is_nan()
            || self.rms.is_nan()
            || self.max_abs_diff.is_nan()
            || self.mean_diff.is_nan()
    }
}
