use crate::validate::ValidationError;

/// Crate-wide result type for intake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Intake errors. Both variants are caller faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport payload could not be minimally parsed.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// The event parsed but violates a validation rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedInput {
            message: message.to_string(),
        }
    }
}
