use std::collections::BTreeMap;

use nir_validate::analysis::metrics::SpectralMetrics;
use nir_validate::analysis::region::{analyze_regions, region_metrics};
use nir_validate::synthetic::{shift_channels, standard_profiles};
use nir_validate::{
    summarize, CriticalRegion, EngineError, ShiftDetection, ShiftDetector, StandardValidator,
    Thresholds, ValidationResult, ValidationStatus,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn profile(index: usize, channels: usize) -> Vec<f64> {
    standard_profiles(index + 1, channels)[index].render(channels)
}

/// A result carrying only a correlation, judged against `min_correlation`.
fn judged(id: &str, correlation: f64, thresholds: &Thresholds) -> ValidationResult {
    let metrics = SpectralMetrics {
        correlation,
        rms: 0.001,
        max_abs_diff: 0.002,
        mean_diff: 0.0,
    };
    let checks = thresholds.check(&metrics);
    ValidationResult {
        id: id.to_string(),
        correlation,
        rms: metrics.rms,
        max_abs_diff: metrics.max_abs_diff,
        mean_diff: metrics.mean_diff,
        checks,
        shift: None,
        status: ValidationStatus::from_passed(checks.all_passed()),
        region_results: BTreeMap::new(),
    }
}

#[test]
fn identical_spectra_are_a_perfect_match() {
    let s = profile(2, 200);
    let strict = Thresholds::new(1.0, 0.0, 0.0).unwrap();
    let r = StandardValidator::new(strict).validate("STD-03", &s, &s).unwrap();
    assert_eq!(r.correlation, 1.0);
    assert_eq!(r.rms, 0.0);
    assert_eq!(r.max_abs_diff, 0.0);
    assert_eq!(r.mean_diff, 0.0);
    assert!(r.passed());
}

#[test]
fn constant_offset_keeps_correlation() {
    let reference = profile(0, 128);
    let current: Vec<f64> = reference.iter().map(|v| v + 0.004).collect();
    let m = SpectralMetrics::compute(&reference, &current).unwrap();
    assert!(approx_eq(m.correlation, 1.0, 1e-12));
    assert!(approx_eq(m.rms, 0.004, 1e-12));
    assert!(approx_eq(m.max_abs_diff, 0.004, 1e-12));
    assert!(approx_eq(m.mean_diff, 0.004, 1e-12));
}

#[test]
fn shift_round_trip() {
    let reference = profile(1, 256);
    let detector = ShiftDetector::default();
    for k in [-5_i64, -4, -2, 0, 1, 3, 5] {
        let current = shift_channels(&reference, k);
        match detector.detect(&reference, &current).unwrap() {
            ShiftDetection::Detected(r) => assert_eq!(r.offset_channels, k, "shift {k}"),
            other => panic!("shift {k}: {other:?}"),
        }
    }
}

#[test]
fn shift_outside_window_is_not_reported_as_inside() {
    let reference = profile(1, 256);
    let current = shift_channels(&reference, 9);
    let detection = ShiftDetector::new(3, 0.9)
        .unwrap()
        .detect(&reference, &current)
        .unwrap();
    if let Some(r) = detection.result() {
        assert!(r.offset_channels.abs() <= 3);
        assert!(!r.is_significant(3));
    }
}

#[test]
fn short_spectrum_cannot_be_searched() {
    let s = [0.1, 0.2, 0.3];
    assert!(matches!(
        ShiftDetector::default().detect(&s, &s),
        Err(EngineError::SpectrumTooShort { channels: 3, required: 10 })
    ));
}

#[test]
fn full_region_equals_whole_spectrum() {
    let reference = profile(3, 160);
    let current: Vec<f64> = reference
        .iter()
        .enumerate()
        .map(|(i, v)| v + 0.0001 * (i % 7) as f64)
        .collect();
    let whole = SpectralMetrics::compute(&reference, &current).unwrap();
    let full = CriticalRegion::full("all", 160).unwrap();
    assert_eq!(region_metrics(&reference, &current, &full).unwrap(), whole);

    let regions = vec![
        CriticalRegion::new("low", 0, 40).unwrap(),
        CriticalRegion::new("mid", 30, 110).unwrap(),
        CriticalRegion::new("high", 100, 160).unwrap(),
    ];
    let out = analyze_regions(&reference, &current, &regions).unwrap();
    for m in out.values() {
        assert!(m.max_abs_diff <= whole.max_abs_diff);
    }
}

#[test]
fn kit_of_three_literal_scenario() {
    let thresholds = Thresholds::new(0.995, 0.01, 0.015).unwrap();
    let results = vec![
        judged("A", 0.999, &thresholds),
        judged("B", 0.990, &thresholds),
        judged("C", 0.970, &thresholds),
    ];
    let summary = summarize(&results).unwrap();
    assert_eq!(summary.count_pass, 1);
    assert_eq!(summary.count_fail, 2);
    assert_eq!(summary.worst_standard_id, "C");
    assert!(approx_eq(summary.mean_correlation, 0.9863333333, 1e-9));
    assert!(!summary.all_passed());
}

#[test]
fn summary_ignores_input_order() {
    let thresholds = Thresholds::default();
    let mut results = vec![
        judged("A", 0.9999, &thresholds),
        judged("B", 0.9990, &thresholds),
        judged("C", 0.9997, &thresholds),
    ];
    let forward = summarize(&results).unwrap();
    results.reverse();
    let backward = summarize(&results).unwrap();
    assert_eq!(backward.worst_standard_id, "B");
    assert_eq!(backward.worst_standard_id, forward.worst_standard_id);
    assert_eq!(backward.count_pass, forward.count_pass);
    assert!(approx_eq(backward.mean_correlation, forward.mean_correlation, 1e-15));
    assert!(approx_eq(backward.mean_rms, forward.mean_rms, 1e-15));
}

#[test]
fn empty_kit_has_no_summary() {
    assert!(matches!(summarize(&[]), Err(EngineError::EmptyResultSet)));
}

#[test]
fn tightening_rms_never_adds_passes() {
    let reference = profile(0, 128);
    let offsets = [0.0005, 0.002, 0.004, 0.008];
    let count_passes = |max_rms: f64| {
        let v = StandardValidator::new(Thresholds::new(0.99, max_rms, 1.0).unwrap());
        offsets
            .iter()
            .filter(|&&o| {
                let current: Vec<f64> = reference.iter().map(|x| x + o).collect();
                v.validate("S", &reference, &current).unwrap().passed()
            })
            .count()
    };
    let loose = count_passes(0.01);
    let strict = count_passes(0.001);
    assert_eq!(loose, 4);
    assert_eq!(strict, 1);
    assert!(strict <= loose);
}
