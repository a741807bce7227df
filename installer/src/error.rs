//! Error types for the provisioning pipeline.
//!
//! Every variant is fatal: the pipeline aborts on the first error and the
//! CLI reports it with a non-zero exit status. Where the operator can do
//! something about it, the message says what.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::config::ConfigError;
use crate::provisioner::Stage;
use crate::release::error::ReleaseError;
use crate::release::version::SdkVersion;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while provisioning the SDK.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A release descriptor value is invalid.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The archive could not be downloaded.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The downloaded archive does not match the configured checksum.
    #[error(
        "the downloaded SDK {version} doesn't match the checksum '{expected}' (got '{actual}'); \
         the transfer was corrupted or the configured checksum is wrong"
    )]
    ChecksumMismatch {
        /// The SDK version being provisioned.
        version: SdkVersion,
        /// The configured checksum.
        expected: String,
        /// The digest of the downloaded file.
        actual: String,
    },

    /// The archive could not be extracted.
    #[error("failed to unpack {archive}: {source}")]
    Extraction {
        /// Path to the archive being extracted.
        archive: Utf8PathBuf,
        /// The underlying extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// An output directory is left over from a previous build.
    #[error("output directory {path} already exists; run the build in a clean directory")]
    OutputDirectoryExists {
        /// The pre-existing directory.
        path: Utf8PathBuf,
    },

    /// The unpacked SDK tree is not where it should be.
    #[error("unpacked SDK tree not found at {path}; run the build step first")]
    UnpackedTreeMissing {
        /// Where the tree was expected.
        path: Utf8PathBuf,
    },

    /// Wrapper script generation failed.
    #[error("wrapper script generation failed: {0}")]
    ScriptGeneration(String),

    /// A pipeline step was invoked in the wrong stage.
    #[error("cannot {step} while the pipeline is {stage}")]
    OutOfOrder {
        /// The step that was requested.
        step: &'static str,
        /// The stage the pipeline was in.
        stage: Stage,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using [`ProvisionError`].
pub type Result<T> = std::result::Result<T, ProvisionError>;
