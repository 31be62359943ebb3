use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the path of an optional TOML config file
pub const CONFIG_ENV_VAR: &str = "CRS_EVAL_CONFIG";

/// File name of the gold annotations next to the run directory
pub const DEFAULT_EVAL_FILE_NAME: &str = "crs_arena_eval.json";

/// Settings that the command line does not expose
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Report format printed to stdout
    #[serde(default)]
    pub output: OutputFormat,
    /// Gold file used when none is given on the command line
    #[serde(default)]
    pub eval_file: Option<PathBuf>,
    /// Optional path to also store the report as JSON
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// Optional published baseline correlations to compare against
    #[serde(default)]
    pub baseline_file: Option<PathBuf>,
    /// Include the per-system Spearman breakdown
    #[serde(default)]
    pub per_system: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Load the file named by `CRS_EVAL_CONFIG`, or defaults when it is unset
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Gold file to score against: explicit argument, then config, then the
    /// conventional sibling of the run file's directory
    pub fn resolve_eval_file(&self, explicit: Option<&Path>, run_file: &Path) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(path) = &self.eval_file {
            return path.clone();
        }
        default_eval_file(run_file)
    }
}

/// `dataset/run/face_run.json` resolves to `dataset/crs_arena_eval.json`
pub fn default_eval_file(run_file: &Path) -> PathBuf {
    let run_dir = run_file.parent().unwrap_or_else(|| Path::new(""));
    match run_dir.parent() {
        Some(dataset_dir) => dataset_dir.join(DEFAULT_EVAL_FILE_NAME),
        None => run_dir.join("..").join(DEFAULT_EVAL_FILE_NAME),
    }
}
