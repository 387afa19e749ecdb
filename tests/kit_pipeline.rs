use nir_validate::analysis::metrics::rms_diff;
use nir_validate::data::filter::{by_ids, by_note};
use nir_validate::synthetic::{KitBuilder, SyntheticKit, NEW_LAMP, REFERENCE_LAMP};
use nir_validate::{
    aggregate, common_ids, compute_correction, summarize_outcomes, EngineConfig,
    MeasurementRecord, SpectrumTable, StandardOutcome,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn kit(shifted: Vec<(String, i64)>) -> SyntheticKit {
    KitBuilder {
        shifted,
        ..KitBuilder::default()
    }
    .build()
    .unwrap()
}

fn corrected(new: &SpectrumTable, kit_ids: &[String], reference: &SpectrumTable) -> SpectrumTable {
    let c = compute_correction(reference, new, kit_ids).unwrap();
    let records = new
        .records()
        .iter()
        .map(|rec| {
            MeasurementRecord::new(rec.id.clone(), c.apply_to_spectrum(&rec.spectrum).unwrap())
        })
        .collect();
    SpectrumTable::build(records).unwrap()
}

#[test]
fn lamps_split_from_one_export() {
    let kit = kit(Vec::new());
    let mut all = kit.reference.records().to_vec();
    all.extend_from_slice(kit.new.records());
    let export = SpectrumTable::build(all).unwrap();
    assert_eq!(export.notes().len(), 2);

    let reference = by_note(&export, REFERENCE_LAMP).unwrap();
    let new = by_note(&export, NEW_LAMP).unwrap();
    assert_eq!(reference.len(), kit.reference.len());
    assert_eq!(new.len(), kit.new.len());
    assert_eq!(common_ids(&reference, &new).len(), 6);
}

#[test]
fn correction_brings_new_lamp_closer() {
    let kit = kit(Vec::new());
    let ids: Vec<String> = common_ids(&kit.reference, &kit.new).into_iter().collect();
    let fixed = corrected(&kit.new, &ids, &kit.reference);

    let mean_rms = |table: &SpectrumTable| {
        ids.iter()
            .map(|id| {
                let r = aggregate(&kit.reference, id).unwrap();
                let n = aggregate(table, id).unwrap();
                rms_diff(&r, &n)
            })
            .sum::<f64>()
            / ids.len() as f64
    };
    let before = mean_rms(&kit.new);
    let after = mean_rms(&fixed);
    assert!(after <= before, "after {after} > before {before}");
    assert!(before > 0.01);
    assert!(after < 0.002);
}

#[test]
fn corrected_kit_passes_default_thresholds() {
    let kit = kit(Vec::new());
    let ids: Vec<String> = common_ids(&kit.reference, &kit.new).into_iter().collect();
    let fixed = corrected(&kit.new, &ids, &kit.reference);

    let config = EngineConfig::default();
    let validator = config.validator(kit.reference.channels()).unwrap();
    let outcomes = validator.validate_kit(&kit.reference, &fixed, &ids);
    let summary = summarize_outcomes(&outcomes).unwrap();
    assert_eq!(summary.count_pass, 6);
    assert!(summary.all_passed());
    assert!(summary.mean_correlation > 0.9995);

    for outcome in &outcomes {
        let r = outcome.result().unwrap();
        assert_eq!(r.region_results.len(), 3);
        assert_eq!(r.shift.map(|s| s.offset_channels), Some(0));
    }
}

#[test]
fn uncorrected_kit_fails_on_offset() {
    let kit = kit(Vec::new());
    let ids: Vec<String> = common_ids(&kit.reference, &kit.new).into_iter().collect();
    let validator = EngineConfig::default().validator(256).unwrap();
    let outcomes = validator.validate_kit(&kit.reference, &kit.new, &ids);
    for outcome in &outcomes {
        let r = outcome.result().unwrap();
        assert!(!r.passed());
        assert!(!r.checks.rms);
        // Lamp offset 0.01 plus a 0.00002/channel slope.
        assert!(approx_eq(r.mean_diff, 0.01 + 0.00002 * 127.5, 0.001));
    }
}

#[test]
fn shifted_standard_is_reported() {
    let kit = kit(vec![("STD-03".into(), 3)]);
    let validator = EngineConfig::default().validator(256).unwrap();
    let r = validator.validate_id(&kit.reference, &kit.new, "STD-03").unwrap();
    let shift = r.shift.unwrap();
    assert_eq!(shift.offset_channels, 3);
    assert!(shift.confidence > 0.99);

    let steady = validator.validate_id(&kit.reference, &kit.new, "STD-01").unwrap();
    assert_eq!(steady.shift.map(|s| s.offset_channels), Some(0));
}

#[test]
fn missing_standard_is_isolated() {
    let kit = kit(Vec::new());
    let new = by_ids(&kit.new, &["STD-01", "STD-03", "STD-04", "STD-05", "STD-06"]).unwrap();
    let all_ids: Vec<&str> = kit.reference.ids().collect();
    let matched: Vec<String> = common_ids(&kit.reference, &new).into_iter().collect();
    assert_eq!(matched.len(), 5);

    let fixed = corrected(&new, &matched, &kit.reference);
    let validator = EngineConfig::default().validator(256).unwrap();
    let outcomes = validator.validate_kit(&kit.reference, &fixed, &all_ids);
    assert_eq!(outcomes.len(), 6);
    assert!(matches!(&outcomes[1], StandardOutcome::Failed { id, .. } if id == "STD-02"));

    let summary = summarize_outcomes(&outcomes).unwrap();
    assert_eq!(summary.total(), 5);
    assert_eq!(summary.errored_ids, vec!["STD-02"]);
    assert!(!summary.all_passed());
}

#[test]
fn nothing_validated_is_an_error() {
    let kit = kit(Vec::new());
    let empty = by_note(&kit.new, "no-such-lamp").unwrap();
    let validator = EngineConfig::default().validator(256).unwrap();
    let outcomes = validator.validate_kit(&kit.reference, &empty, &["STD-01"]);
    assert!(summarize_outcomes(&outcomes).is_err());
}
