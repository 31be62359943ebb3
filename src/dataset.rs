use crate::error::{EvalError, EvalResult};
use crate::models::Dataset;

/// Dataset label of a conversation: the second underscore-delimited segment
pub fn dataset_label(conv_id: &str) -> EvalResult<&str> {
    conv_id
        .split('_')
        .nth(1)
        .ok_or_else(|| EvalError::MalformedConvId(conv_id.to_string()))
}

/// Known dataset of a conversation, `None` for labels outside the report
pub fn classify(conv_id: &str) -> EvalResult<Option<Dataset>> {
    dataset_label(conv_id).map(Dataset::from_label)
}

/// System id of a conversation: its first two segments, e.g. `barcor_redial`
pub fn system_id(conv_id: &str) -> EvalResult<String> {
    let mut segments = conv_id.split('_');
    match (segments.next(), segments.next()) {
        (Some(system), Some(dataset)) => Ok(format!("{}_{}", system, dataset)),
        _ => Err(EvalError::MalformedConvId(conv_id.to_string())),
    }
}
