use thiserror::Error;

/// Failures that abort an evaluation run
#[derive(Debug, Error)]
pub enum EvalError {
    /// Conversation id has fewer than two underscore-delimited segments
    #[error("Unexpected conv_id format: {0}")]
    MalformedConvId(String),

    /// A value could not be converted to the numeric type its field requires
    #[error("Cannot coerce {field} of {conv_id} to {expected}: {value}")]
    Coercion {
        field: String,
        conv_id: String,
        expected: &'static str,
        value: String,
    },

    /// Baseline file does not have the expected nesting
    #[error("Invalid baseline layout: {0}")]
    BaselineLayout(String),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
