//! Error types for release descriptor values.
//!
//! Each variant names the rejected input and the constraint it violated.

use thiserror::Error;

/// Errors arising from invalid release descriptor values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// A version string is not a dotted numeric version of the accepted shape.
    #[error("invalid SDK version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A checksum is not a recognised hex digest.
    #[error("invalid checksum \"{value}\": {reason}")]
    InvalidChecksum {
        /// The rejected checksum string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A download URL template lacks the required placeholder.
    #[error("invalid URL template \"{value}\": {reason}")]
    InvalidUrlTemplate {
        /// The rejected template.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
