use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use super::metrics::{max_propagating, min_propagating, std_dev};
use super::validator::{StandardOutcome, ValidationResult};
use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// KitSummary
// ---------------------------------------------------------------------------

/// Kit-level statistics over a set of validated standards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitSummary {
    pub count_pass: usize,
    pub count_fail: usize,
    pub mean_correlation: f64,
    pub mean_rms: f64,
    /// Lowest correlation; ties broken by highest rms, then smallest id.
    pub worst_standard_id: String,
    /// Standards that could not be validated at all.
    pub errored_ids: Vec<String>,
}

impl KitSummary {
    pub fn total(&self) -> usize {
        self.count_pass + self.count_fail
    }

    pub fn all_passed(&self) -> bool {
        self.count_fail == 0 && self.errored_ids.is_empty()
    }
}

/// Orders NaN below every number so a corrupt standard ranks worst.
fn correlation_key(c: f64) -> f64 {
    if c.is_nan() {
        f64::NEG_INFINITY
    } else {
        c
    }
}

/// Orders NaN above every number.
fn rms_key(r: f64) -> f64 {
    if r.is_nan() {
        f64::INFINITY
    } else {
        r
    }
}

/// `Less` when `a` is worse than `b`.
fn worse_first(a: &ValidationResult, b: &ValidationResult) -> Ordering {
    correlation_key(a.correlation)
        .total_cmp(&correlation_key(b.correlation))
        .then_with(|| rms_key(b.rms).total_cmp(&rms_key(a.rms)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Summarise validated standards. Fails on an empty slice.
///
/// The result does not depend on the order of `results`.
pub fn summarize(results: &[ValidationResult]) -> Result<KitSummary> {
    summarize_refs(results.iter(), Vec::new())
}

/// Summarise a partial kit: failed outcomes are listed in `errored_ids` and
/// excluded from counts and means. Fails when nothing was validated.
pub fn summarize_outcomes(outcomes: &[StandardOutcome]) -> Result<KitSummary> {
    let mut errored: Vec<String> = outcomes
        .iter()
        .filter(|o| o.result().is_none())
        .map(|o| o.id().to_string())
        .collect();
    errored.sort();
    summarize_refs(outcomes.iter().filter_map(StandardOutcome::result), errored)
}

fn summarize_refs<'a, I>(results: I, errored_ids: Vec<String>) -> Result<KitSummary>
where
    I: Iterator<Item = &'a ValidationResult>,
{
    let results: Vec<&ValidationResult> = results.collect();
    let worst = results
        .iter()
        .copied()
        .min_by(|a, b| worse_first(a, b))
        .ok_or(EngineError::EmptyResultSet)?;

    let n = results.len() as f64;
    let count_pass = results.iter().filter(|r| r.passed()).count();
    let summary = KitSummary {
        count_pass,
        count_fail: results.len() - count_pass,
        mean_correlation: results.iter().map(|r| r.correlation).sum::<f64>() / n,
        mean_rms: results.iter().map(|r| r.rms).sum::<f64>() / n,
        worst_standard_id: worst.id.clone(),
        errored_ids,
    };
    debug!(
        "kit summary: {} pass / {} fail, worst '{}'",
        summary.count_pass, summary.count_fail, summary.worst_standard_id
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Descriptive statistics per metric
// ---------------------------------------------------------------------------

/// NaN in any standard's metric makes every field NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl MetricStatistics {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        MetricStatistics {
            min: min_propagating(values.iter().copied(), f64::INFINITY),
            max: max_propagating(values.iter().copied(), f64::NEG_INFINITY),
            mean: values.iter().sum::<f64>() / n,
            std: std_dev(values),
        }
    }
}

/// Min/max/mean/std of each metric across a kit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KitMetricStatistics {
    pub correlation: MetricStatistics,
    pub max_abs_diff: MetricStatistics,
    pub rms: MetricStatistics,
    pub mean_diff: MetricStatistics,
}

pub fn metric_statistics(results: &[ValidationResult]) -> Result<KitMetricStatistics> {
    if results.is_empty() {
        return Err(EngineError::EmptyResultSet);
    }
    let stats_of = |f: &dyn Fn(&ValidationResult) -> f64| {
        MetricStatistics::of(&results.iter().map(f).collect::<Vec<f64>>())
    };
    Ok(KitMetricStatistics {
        correlation: stats_of(&|r| r.correlation),
        max_abs_diff: stats_of(&|r| r.max_abs_diff),
        rms: stats_of(&|r| r.rms),
        mean_diff: stats_of(&|r| r.mean_diff),
    })
}
