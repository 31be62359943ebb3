use crate::baseline::parse_baselines;
use crate::config::Config;
use crate::index::{build_gold_indices, build_prediction_indices};
use crate::metrics::{evaluate_granularity, per_system_spearman};
use crate::models::{EvaluationReport, ScoreIndices};
use crate::output::OutputFormat;
use crate::records::{self, read_json};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Main runner that orchestrates loading, joining and scoring
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.config.output
    }

    /// Score a run file against a gold file
    pub fn run(&self, run_file: &Path, eval_file: &Path) -> Result<EvaluationReport> {
        let gold = records::load_gold(eval_file)?;
        let run = records::load_run(run_file)?;

        let gold_indices = build_gold_indices(&gold)
            .with_context(|| format!("Invalid gold file: {}", eval_file.display()))?;
        let pred_indices = build_prediction_indices(&run)
            .with_context(|| format!("Invalid run file: {}", run_file.display()))?;
        log_index_sizes("gold", &gold_indices);
        log_index_sizes("predictions", &pred_indices);

        let report = self.evaluate(&gold_indices, &pred_indices)?;
        self.store_results_if_configured(&report)?;

        Ok(report)
    }

    /// Compute every report section enabled by the configuration
    pub fn evaluate(&self, gold: &ScoreIndices, preds: &ScoreIndices) -> Result<EvaluationReport> {
        let turn_level = evaluate_granularity(&gold.turn, &preds.turn)?;
        let dialogue_level = evaluate_granularity(&gold.dialogue, &preds.dialogue)?;

        let per_system = if self.config.per_system {
            Some(per_system_spearman(gold, preds)?)
        } else {
            None
        };

        let baselines = match &self.config.baseline_file {
            Some(path) => {
                let raw: Value = read_json(path, "baseline")?;
                let comparisons = parse_baselines(&raw)
                    .with_context(|| format!("Invalid baseline file: {}", path.display()))?;
                info!(path = %path.display(), baselines = comparisons.len(), "loaded baselines");
                Some(comparisons)
            }
            None => None,
        };

        Ok(EvaluationReport {
            turn_level,
            dialogue_level,
            per_system,
            baselines,
        })
    }

    /// Store the report as JSON if a storage path is configured
    fn store_results_if_configured(&self, report: &EvaluationReport) -> Result<()> {
        if let Some(path) = &self.config.storage_path {
            self.store_results(report, path)?;
        }
        Ok(())
    }

    fn store_results(&self, report: &EvaluationReport, path: &Path) -> Result<()> {
        let json_content = self.serialize_results(report)?;
        self.ensure_directory_exists(path)?;
        self.write_results_file(path, &json_content)?;
        info!(path = %path.display(), "report stored");

        Ok(())
    }

    fn serialize_results(&self, report: &EvaluationReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
    }

    /// Ensure the directory for the results file exists
    fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }

    fn write_results_file(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write results to: {}", path.display()))
    }
}

fn log_index_sizes(source: &str, indices: &ScoreIndices) {
    info!(
        source,
        turns = indices.turn.len(),
        dialogues = indices.dialogue.len(),
        "built score indices"
    );
}
