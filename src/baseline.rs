use crate::error::{EvalError, EvalResult};
use crate::models::{Aspect, BaselineComparison, Correlation, Dataset, DialogueAspect};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Spelling of `dialogue_overall` used by published baseline tables
const LEGACY_DIALOGUE_OVERALL: &str = "dialog_overall";

/// Extract published baseline correlations, per dataset then baseline name.
///
/// Datasets absent from the file contribute nothing. Missing or non-numeric
/// values become NaN.
pub fn parse_baselines(raw: &Value) -> EvalResult<Vec<BaselineComparison>> {
    let root = raw
        .as_object()
        .ok_or_else(|| EvalError::BaselineLayout("expected an object at the top level".to_string()))?;

    let mut comparisons = Vec::new();
    for dataset in Dataset::ORDER {
        let Some(section) = root.get(dataset.baseline_key()) else {
            continue;
        };
        let section = section.as_object().ok_or_else(|| {
            EvalError::BaselineLayout(format!("{} is not an object", dataset.baseline_key()))
        })?;

        let mut names: Vec<&String> = section.keys().collect();
        names.sort();
        for name in names {
            let metrics = section[name].as_object().ok_or_else(|| {
                EvalError::BaselineLayout(format!(
                    "{}.{} is not an object",
                    dataset.baseline_key(),
                    name
                ))
            })?;
            comparisons.push(BaselineComparison {
                dataset,
                baseline: name.clone(),
                turn_level: correlations_for(metrics),
                dialogue_level: correlations_for(metrics),
            });
        }
    }

    Ok(comparisons)
}

fn correlations_for<A: Aspect>(metrics: &Map<String, Value>) -> BTreeMap<A, Correlation> {
    A::ALL
        .iter()
        .map(|aspect| {
            let entry = metrics.get(aspect.name()).or_else(|| {
                if aspect.name() == DialogueAspect::DialogueOverall.name() {
                    metrics.get(LEGACY_DIALOGUE_OVERALL)
                } else {
                    None
                }
            });
            let correlation = Correlation {
                pearson: read_metric(entry, "pearson_r"),
                spearman: read_metric(entry, "spearman_rho"),
            };
            (*aspect, correlation)
        })
        .collect()
}

fn read_metric(entry: Option<&Value>, field: &str) -> f64 {
    entry
        .and_then(|e| e.get(field))
        .and_then(Value::as_f64)
        .unwrap_or(f64::NAN)
}
