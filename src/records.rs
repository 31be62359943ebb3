use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// One annotated conversation from the gold file
#[derive(Debug, Clone, Deserialize)]
pub struct GoldDialogue {
    pub conv_id: String,
    /// Aggregated dialogue-level annotations
    #[serde(default)]
    pub dial_level_aggregated: Option<Map<String, Value>>,
    #[serde(default)]
    pub dialogue: Vec<GoldTurn>,
}

/// One utterance of a gold conversation
#[derive(Debug, Clone, Deserialize)]
pub struct GoldTurn {
    #[serde(default)]
    pub role: Option<String>,
    /// Only read for assistant turns
    #[serde(default)]
    pub turn_ind: Value,
    #[serde(default)]
    pub turn_level_aggregated: Option<Map<String, Value>>,
}

/// Predictions for one conversation from the run file
#[derive(Debug, Clone, Deserialize)]
pub struct RunDialogue {
    pub conv_id: String,
    #[serde(default)]
    pub dial_level_pred: Option<Map<String, Value>>,
    #[serde(default)]
    pub turns: Option<Vec<RunTurn>>,
}

/// Predictions for one assistant turn
#[derive(Debug, Clone, Deserialize)]
pub struct RunTurn {
    pub turn_ind: Value,
    #[serde(default)]
    pub turn_level_pred: Option<Map<String, Value>>,
}

/// Load the gold annotation file
pub fn load_gold(path: &Path) -> Result<Vec<GoldDialogue>> {
    let dialogues: Vec<GoldDialogue> = read_json(path, "gold")?;
    info!(path = %path.display(), dialogues = dialogues.len(), "loaded gold annotations");
    Ok(dialogues)
}

/// Load a combined run file
pub fn load_run(path: &Path) -> Result<Vec<RunDialogue>> {
    let dialogues: Vec<RunDialogue> = read_json(path, "run")?;
    info!(path = %path.display(), dialogues = dialogues.len(), "loaded run predictions");
    Ok(dialogues)
}

pub fn read_json<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", kind, path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} JSON: {}", kind, path.display()))
}
