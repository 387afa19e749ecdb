use log::debug;
use serde::{Deserialize, Serialize};

use super::metrics::pearson;
use crate::error::{EngineError, Result};

/// Default search half-width, in channels.
pub const DEFAULT_MAX_SHIFT: usize = 5;

/// Default minimum correlation for a shift estimate to be meaningful.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.9;

/// Best offset found and its correlation.
///
/// A positive offset means the features of the current spectrum sit at
/// higher channel indices than in the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftResult {
    pub offset_channels: i64,
    pub confidence: f64,
}

impl ShiftResult {
    /// `|offset| > window`.
    pub fn is_significant(&self, window: usize) -> bool {
        self.offset_channels.unsigned_abs() > window as u64
    }
}

/// Outcome of a shift search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShiftDetection {
    Detected(ShiftResult),
    /// No candidate offset correlated above the minimum confidence.
    NoDetectableShift { confidence: f64 },
}

impl ShiftDetection {
    pub fn result(&self) -> Option<ShiftResult> {
        match self {
            ShiftDetection::Detected(r) => Some(*r),
            ShiftDetection::NoDetectableShift { .. } => None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ShiftDetection::Detected(r) => r.confidence,
            ShiftDetection::NoDetectableShift { confidence } => *confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// ShiftDetector
// ---------------------------------------------------------------------------

/// Normalized cross-correlation search over `[-max_shift, max_shift]`.
///
/// Fields are private so that every instance went through [`ShiftDetector::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawShiftDetector", into = "RawShiftDetector")]
pub struct ShiftDetector {
    max_shift: usize,
    min_confidence: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct RawShiftDetector {
    max_shift: usize,
    min_confidence: f64,
}

impl Default for RawShiftDetector {
    fn default() -> Self {
        ShiftDetector::default().into()
    }
}

impl TryFrom<RawShiftDetector> for ShiftDetector {
    type Error = EngineError;

    fn try_from(raw: RawShiftDetector) -> Result<Self> {
        ShiftDetector::new(raw.max_shift, raw.min_confidence)
    }
}

impl From<ShiftDetector> for RawShiftDetector {
    fn from(d: ShiftDetector) -> Self {
        RawShiftDetector {
            max_shift: d.max_shift,
            min_confidence: d.min_confidence,
        }
    }
}

impl Default for ShiftDetector {
    fn default() -> Self {
        ShiftDetector {
            max_shift: DEFAULT_MAX_SHIFT,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl ShiftDetector {
    /// `max_shift` must be at least 1; `min_confidence` must lie in (−1, 1].
    pub fn new(max_shift: usize, min_confidence: f64) -> Result<Self> {
        if max_shift == 0 {
            return Err(EngineError::InvalidConfig(
                "shift.max_shift must be >= 1".into(),
            ));
        }
        if !(min_confidence > -1.0 && min_confidence <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "shift.min_confidence {min_confidence} outside (-1, 1]"
            )));
        }
        Ok(ShiftDetector {
            max_shift,
            min_confidence,
        })
    }

    pub fn max_shift(&self) -> usize {
        self.max_shift
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Shortest spectrum the search accepts.
    pub fn required_channels(&self) -> usize {
        (2 * self.max_shift).max(2)
    }

    /// Candidate offsets, nearest-to-zero first, negative before positive.
    ///
    /// Scanning in this order and keeping only strict improvements breaks
    /// ties toward the smallest shift.
    fn candidates(&self) -> impl Iterator<Item = i64> {
        let max = self.max_shift as i64;
        std::iter::once(0).chain((1..=max).flat_map(|k| [-k, k]))
    }

    /// Pearson correlation of `reference[i]` with `current[i + offset]` over
    /// the overlapping channels.
    ///
    /// NaN when the slices differ in length or do not overlap.
    pub fn correlation_at(reference: &[f64], current: &[f64], offset: i64) -> f64 {
        if reference.len() != current.len() {
            return f64::NAN;
        }
        let n = reference.len() as i64;
        let lo = 0.max(-offset);
        let hi = n.min(n - offset);
        if hi - lo < 1 {
            return f64::NAN;
        }
        let r = &reference[lo as usize..hi as usize];
        let c = &current[(lo + offset) as usize..(hi + offset) as usize];
        pearson(r, c)
    }

    /// Estimate the offset of `current` relative to `reference`.
    pub fn detect(&self, reference: &[f64], current: &[f64]) -> Result<ShiftDetection> {
        if reference.len() != current.len() {
            return Err(EngineError::ChannelCountMismatch {
                left: reference.len(),
                right: current.len(),
            });
        }
        let required = self.required_channels();
        if reference.len() < required {
            return Err(EngineError::SpectrumTooShort {
                channels: reference.len(),
                required,
            });
        }

        let mut best: Option<(i64, f64)> = None;
        let mut saw_nan = false;
        for offset in self.candidates() {
            let corr = Self::correlation_at(reference, current, offset);
            if corr.is_nan() {
                saw_nan = true;
                continue;
            }
            if best.map_or(true, |(_, b)| corr > b) {
                best = Some((offset, corr));
            }
        }

        let detection = match best {
            Some((offset, confidence)) if confidence >= self.min_confidence && !saw_nan => {
                ShiftDetection::Detected(ShiftResult {
                    offset_channels: offset,
                    confidence,
                })
            }
            Some((_, confidence)) if !saw_nan => ShiftDetection::NoDetectableShift { confidence },
            _ => ShiftDetection::NoDetectableShift {
                confidence: f64::NAN,
            },
        };
        debug!("shift search ±{}: {detection:?}", self.max_shift);
        Ok(detection)
    }
}
