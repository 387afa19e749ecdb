use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use serde::Serialize;

use nir_validate::analysis::diagnostics::grade_rms;
use nir_validate::analysis::summary::metric_statistics;
use nir_validate::data::filter::by_note;
use nir_validate::synthetic::{KitBuilder, NEW_LAMP, REFERENCE_LAMP};
use nir_validate::{
    common_ids, compute_correction, summarize_outcomes, EngineConfig, MeasurementRecord,
    SpectrumTable, StandardOutcome,
};

/// One CSV row per standard.
#[derive(Serialize)]
struct ResultRow<'a> {
    id: &'a str,
    status: String,
    correlation: Option<f64>,
    rms: Option<f64>,
    max_abs_diff: Option<f64>,
    mean_diff: Option<f64>,
    grade: Option<String>,
    shift_channels: Option<i64>,
    error: Option<&'a str>,
}

fn row<'a>(outcome: &'a StandardOutcome, config: &EngineConfig) -> ResultRow<'a> {
    match outcome {
        StandardOutcome::Validated(r) => ResultRow {
            id: &r.id,
            status: r.status.to_string(),
            correlation: Some(r.correlation),
            rms: Some(r.rms),
            max_abs_diff: Some(r.max_abs_diff),
            mean_diff: Some(r.mean_diff),
            grade: Some(grade_rms(r.rms, &config.quality_tiers).to_string()),
            shift_channels: r.shift.map(|s| s.offset_channels),
            error: None,
        },
        StandardOutcome::Failed { id, reason } => ResultRow {
            id: id.as_str(),
            status: "ERROR".into(),
            correlation: None,
            rms: None,
            max_abs_diff: None,
            mean_diff: None,
            grade: None,
            shift_channels: None,
            error: Some(reason.as_str()),
        },
    }
}

fn write_csv(path: &Path, outcomes: &[StandardOutcome], config: &EngineConfig) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for outcome in outcomes {
        writer
            .serialize(row(outcome, config))
            .with_context(|| format!("writing row for '{}'", outcome.id()))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Apply the correction to every new-lamp record.
fn corrected_table(
    table: &SpectrumTable,
    correction: &nir_validate::CorrectionVector,
) -> Result<SpectrumTable> {
    let records = table
        .records()
        .iter()
        .map(|rec| {
            let spectrum = correction.apply_to_spectrum(&rec.spectrum)?;
            Ok(MeasurementRecord {
                id: rec.id.clone(),
                spectrum,
                note: rec.note.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SpectrumTable::build(records)?)
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "kit_results.csv".into()));
    let config = match args.next() {
        Some(path) => EngineConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("loading config {path}"))?,
        None => EngineConfig::default(),
    };

    // Both lamps measured into one export, as the instrument produces it.
    let kit = KitBuilder {
        shifted: vec![("STD-03".into(), 3)],
        ..KitBuilder::default()
    }
    .build()
    .context("building synthetic kit")?;
    let mut all = kit.reference.records().to_vec();
    all.extend_from_slice(kit.new.records());
    let export = SpectrumTable::build(all).context("merging lamp tables")?;

    let reference = by_note(&export, REFERENCE_LAMP)?;
    let new = by_note(&export, NEW_LAMP)?;
    let ids: Vec<String> = common_ids(&reference, &new).into_iter().collect();
    if ids.is_empty() {
        bail!("no standards measured with both lamps");
    }
    info!("{} standards measured with both lamps", ids.len());

    let correction = compute_correction(&reference, &new, &ids)?;
    let stats = correction.statistics();
    info!(
        "correction: max |c| = {:.5}, mean |c| = {:.5}, std = {:.5}",
        stats.max_abs, stats.mean_abs, stats.std
    );

    let corrected = corrected_table(&new, &correction)?;
    let validator = config.validator(reference.channels())?;
    let outcomes = validator.validate_kit(&reference, &corrected, &ids);

    let summary = summarize_outcomes(&outcomes)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let validated: Vec<_> = outcomes.iter().filter_map(|o| o.result().cloned()).collect();
    let metric_stats = metric_statistics(&validated)?;
    println!("{}", serde_json::to_string_pretty(&metric_stats)?);

    write_csv(&output, &outcomes, &config)?;
    println!(
        "Wrote {} standards ({} channels each) to {}",
        outcomes.len(),
        reference.channels(),
        output.display()
    );
    Ok(())
}
