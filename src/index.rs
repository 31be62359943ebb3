use crate::error::{EvalError, EvalResult};
use crate::models::{
    ASSISTANT_ROLE, AnnotationKey, Aspect, AspectScoreMap, DialogueAspect, ScoreIndices, TurnAspect,
};
use crate::records::{GoldDialogue, RunDialogue};
use serde_json::{Map, Value};

/// Build turn and dialogue lookups from gold annotations.
///
/// Only assistant turns are indexed. Null gold values are kept as NaN, so
/// the dataset cell they join into correlates to NaN.
pub fn build_gold_indices(dialogues: &[GoldDialogue]) -> EvalResult<ScoreIndices> {
    let mut indices = ScoreIndices::default();

    for dialogue in dialogues {
        let conv_id = &dialogue.conv_id;
        let dial_scores =
            extract_scores::<DialogueAspect>(dialogue.dial_level_aggregated.as_ref(), conv_id, true)?;
        indices.dialogue.insert(conv_id.clone(), dial_scores);

        for turn in &dialogue.dialogue {
            if turn.role.as_deref() != Some(ASSISTANT_ROLE) {
                continue;
            }
            let turn_ind = coerce_turn_index(&turn.turn_ind, conv_id)?;
            let turn_scores =
                extract_scores::<TurnAspect>(turn.turn_level_aggregated.as_ref(), conv_id, true)?;
            indices
                .turn
                .insert(AnnotationKey::new(conv_id.as_str(), turn_ind), turn_scores);
        }
    }

    Ok(indices)
}

/// Build turn and dialogue lookups from a run file.
///
/// Aspect keys outside the known sets are dropped without error.
pub fn build_prediction_indices(dialogues: &[RunDialogue]) -> EvalResult<ScoreIndices> {
    let mut indices = ScoreIndices::default();

    for dialogue in dialogues {
        let conv_id = &dialogue.conv_id;
        for turn in dialogue.turns.iter().flatten() {
            let turn_ind = coerce_turn_index(&turn.turn_ind, conv_id)?;
            let turn_scores =
                extract_scores::<TurnAspect>(turn.turn_level_pred.as_ref(), conv_id, false)?;
            indices
                .turn
                .insert(AnnotationKey::new(conv_id.as_str(), turn_ind), turn_scores);
        }

        let dial_scores =
            extract_scores::<DialogueAspect>(dialogue.dial_level_pred.as_ref(), conv_id, false)?;
        indices.dialogue.insert(conv_id.clone(), dial_scores);
    }

    Ok(indices)
}

/// Keep recognized aspects of a raw score map, coercing their values
fn extract_scores<A: Aspect>(
    raw: Option<&Map<String, Value>>,
    conv_id: &str,
    null_as_nan: bool,
) -> EvalResult<AspectScoreMap<A>> {
    let mut scores = AspectScoreMap::new();
    let Some(raw) = raw else {
        return Ok(scores);
    };

    for (name, value) in raw {
        let Some(aspect) = A::from_name(name) else {
            continue;
        };
        let score = if null_as_nan && value.is_null() {
            f64::NAN
        } else {
            coerce_score(value, name, conv_id)?
        };
        scores.insert(aspect, score);
    }

    Ok(scores)
}

/// Convert a score to f64: numbers, numeric strings and booleans are accepted
pub fn coerce_score(value: &Value, field: &str, conv_id: &str) -> EvalResult<f64> {
    let coerced = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };

    coerced.ok_or_else(|| coercion_error(field, conv_id, "float", value))
}

/// Convert a turn index to an integer; fractional numbers truncate toward zero
pub fn coerce_turn_index(value: &Value, conv_id: &str) -> EvalResult<i64> {
    let coerced = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    };

    coerced.ok_or_else(|| coercion_error("turn_ind", conv_id, "integer", value))
}

fn coercion_error(field: &str, conv_id: &str, expected: &'static str, value: &Value) -> EvalError {
    EvalError::Coercion {
        field: field.to_string(),
        conv_id: conv_id.to_string(),
        expected,
        value: value.to_string(),
    }
}
