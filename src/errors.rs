use thiserror::Error;

/// Fatal conditions raised while sizing a unit.
///
/// Recoverable conditions (domain clamping, stage disabling) are never raised as errors; they are
/// recorded as [`crate::core::diagnostics::SizingMessage`] values instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Lookup table '{curve}' has axes of lengths {axis_lengths:?} ({expected} points) but {actual} output values")]
    ShapeMismatch {
        curve: String,
        axis_lengths: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("Lookup table '{curve}' has {dimensions} independent variables, only 2 are supported")]
    UnsupportedDimension { curve: String, dimensions: usize },
    #[error("Curve '{curve}' has form {form}, expected one of {allowed}")]
    UnsupportedCurveForm {
        curve: String,
        form: String,
        allowed: String,
    },
    #[error("The sizing run did not complete successfully: {0}")]
    ExternalRunFailure(String),
}

impl SizingError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        SizingError::Configuration(message.into())
    }
}

#[derive(Debug, Error)]
pub enum RetrofitError {
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error("Error identified while sizing unit '{unit}': {source}")]
    FailureInSizing {
        unit: String,
        #[source]
        source: SizingError,
    },
    #[error("Aborting sizing of the model: {0}")]
    ModelAborted(SizingError),
}

impl RetrofitError {
    pub(crate) fn in_unit(unit: &str, source: SizingError) -> Self {
        RetrofitError::FailureInSizing {
            unit: unit.to_string(),
            source,
        }
    }
}
