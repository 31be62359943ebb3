use crate::models::{
    Aspect, BaselineComparison, Correlation, Dataset, DatasetMetrics, DialogueAspect,
    EvaluationReport, GranularityMetrics, SystemSpearman, TurnAspect,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output format options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

const ASPECT_WIDTH: usize = 18;

/// Print the evaluation report in the specified format
pub fn print_report(report: &EvaluationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Plain => print!("{}", render_plain(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
    }
    Ok(())
}

/// Serialize the report; undefined correlations become `null`
pub fn render_json(report: &EvaluationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Render every section of the report as plain-text tables
pub fn render_plain(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str(&render_granularity("Turn-level Aspects", &report.turn_level));
    out.push_str(&render_granularity("Dialogue-level Aspects", &report.dialogue_level));

    if let Some(systems) = &report.per_system {
        out.push_str(&render_per_system(systems));
    }
    if let Some(baselines) = &report.baselines {
        for dataset in Dataset::ORDER {
            out.push_str(&render_baselines(report, baselines, dataset));
        }
    }
    out
}

/// One row per aspect, one `Pearson/Spearman` column per dataset
pub fn render_granularity<A: Aspect>(title: &str, metrics: &GranularityMetrics<A>) -> String {
    let mut out = title_block(title);

    out.push_str(&format!("{:<width$}", "Aspect", width = ASPECT_WIDTH));
    for dataset in Dataset::ORDER {
        let header = format!("{} (P/S)", dataset.display_name());
        out.push_str(&format!(" {:>width$}", header, width = column_width(dataset)));
    }
    out.push('\n');

    let empty = DatasetMetrics::new();
    for aspect in A::ALL {
        let stats = metrics.get(aspect).unwrap_or(&empty);
        out.push_str(&format!("{:<width$}", aspect.name(), width = ASPECT_WIDTH));
        for dataset in Dataset::ORDER {
            let cell = stats.get(&dataset).copied().unwrap_or(Correlation::UNDEFINED);
            out.push_str(&format!(" {:>width$}", format_pair(&cell), width = column_width(dataset)));
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

fn render_per_system(systems: &[SystemSpearman]) -> String {
    let mut out = title_block("Per-system Spearman");
    if systems.is_empty() {
        out.push_str("No systems with matched predictions.\n\n");
        return out;
    }

    let system_width = systems
        .iter()
        .map(|s| s.system.len())
        .max()
        .unwrap_or(0)
        .max("System".len());
    let names: Vec<&str> = TurnAspect::ALL
        .iter()
        .map(|a| a.name())
        .chain(DialogueAspect::ALL.iter().map(|a| a.name()))
        .collect();

    out.push_str(&format!("{:<width$}", "System", width = system_width));
    for name in &names {
        out.push_str(&format!(" {:>width$}", name, width = name.len()));
    }
    out.push('\n');

    for system in systems {
        let values: Vec<f64> = system
            .turn_level
            .values()
            .chain(system.dialogue_level.values())
            .copied()
            .collect();
        out.push_str(&format!("{:<width$}", system.system, width = system_width));
        for (name, value) in names.iter().zip(values) {
            out.push_str(&format!(" {:>width$}", format_value(value), width = name.len()));
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

fn render_baselines(
    report: &EvaluationReport,
    baselines: &[BaselineComparison],
    dataset: Dataset,
) -> String {
    let mut out = String::new();
    let matching: Vec<&BaselineComparison> =
        baselines.iter().filter(|b| b.dataset == dataset).collect();

    if matching.is_empty() {
        out.push_str(&title_block(&format!("Baselines ({})", dataset.display_name())));
        out.push_str("No baselines are available for this dataset.\n\n");
        return out;
    }

    for baseline in matching {
        let title = format!("Baselines ({}): {}", dataset.display_name(), baseline.baseline);
        out.push_str(&title_block(&title));
        out.push_str(&comparison_row("Aspect", "Run (P/S)", "Baseline (P/S)"));
        comparison_rows(&mut out, &report.turn_level, &baseline.turn_level, dataset);
        comparison_rows(&mut out, &report.dialogue_level, &baseline.dialogue_level, dataset);
        out.push('\n');
    }
    out
}

fn comparison_rows<A: Aspect>(
    out: &mut String,
    run: &GranularityMetrics<A>,
    baseline: &BTreeMap<A, Correlation>,
    dataset: Dataset,
) {
    for aspect in A::ALL {
        let ours = run
            .get(aspect)
            .and_then(|m| m.get(&dataset))
            .copied()
            .unwrap_or(Correlation::UNDEFINED);
        let theirs = baseline.get(aspect).copied().unwrap_or(Correlation::UNDEFINED);
        out.push_str(&comparison_row(
            aspect.name(),
            &format_pair(&ours),
            &format_pair(&theirs),
        ));
    }
}

fn comparison_row(aspect: &str, run: &str, baseline: &str) -> String {
    format!(
        "{:<width$} {:>18} {:>18}\n",
        aspect,
        run,
        baseline,
        width = ASPECT_WIDTH
    )
}

fn title_block(title: &str) -> String {
    format!("{}\n{}\n", title, "=".repeat(title.chars().count()))
}

fn column_width(dataset: Dataset) -> usize {
    match dataset {
        Dataset::Redial => 18,
        Dataset::OpenDialKg => 22,
    }
}

fn format_pair(correlation: &Correlation) -> String {
    format!(
        "{}/{}",
        format_value(correlation.pearson),
        format_value(correlation.spearman)
    )
}

/// Three decimals, `nan` when undefined
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.3}", value)
    }
}
