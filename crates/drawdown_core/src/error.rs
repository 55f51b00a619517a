use thiserror::Error;

/// Errors raised while planning a period's withdrawals.
///
/// A plan that cannot be fully funded is not an error: it comes back with
/// `meets_target == false` and a positive shortfall.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpendingError {
    /// A mandatory input was not supplied
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An input was supplied but is outside its valid range
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Arithmetic could not be carried out on otherwise valid inputs
    #[error("calculation failed: {0}")]
    Calculation(String),
}

impl SpendingError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        SpendingError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpendingError>;
