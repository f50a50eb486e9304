//! Error types for extension operations.

use arbor_types::Hash64;

/// Errors that can occur in the extension lifecycle and state codec.
#[derive(Debug, thiserror::Error)]
pub enum ExtError {
    /// A state value could not be applied to an extension.
    #[error("invalid extension state for {type_name}: {reason}")]
    InvalidState {
        type_name: &'static str,
        reason: String,
    },

    /// A copy was attempted between extensions of different types.
    #[error("extension type mismatch: {expected} vs {actual}")]
    TypeMismatch { expected: Hash64, actual: Hash64 },

    /// JSON (de)serialization of extension state failed.
    #[error("extension state codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Convenience alias for extension results.
pub type ExtResult<T> = Result<T, ExtError>;
