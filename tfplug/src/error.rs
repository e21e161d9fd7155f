//! Errors raised while reading or writing attribute values

#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Invalid path navigation: {0}")]
    InvalidPath(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TfplugError>;

impl TfplugError {
    /// True when a lookup failed because the attribute is absent
    pub fn is_missing(&self) -> bool {
        matches!(self, TfplugError::AttributeNotFound(_))
    }
}
