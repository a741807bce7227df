//! GAE SDK installer library.
//!
//! This crate provisions the Google App Engine Python SDK at build time: it
//! resolves where to download a release, fetches the archive (or reuses a
//! cached copy whose checksum matches), unpacks it, and generates wrapper
//! scripts for the bundled tools. It is used by the `gae-installer` CLI
//! binary and can be driven programmatically through [`provisioner`].
//!
//! # Modules
//!
//! - [`artefact`] - Archive cache, HTTP download, and zip extraction
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration and command-line overrides
//! - [`error`] - Error types for the provisioning pipeline
//! - [`fetch`] - Fetch-or-reuse of the checksum-verified archive
//! - [`output`] - Progress output and manifest formatting
//! - [`provisioner`] - The ordered provisioning pipeline and host hooks
//! - [`release`] - SDK version, checksum, and download URL templates
//! - [`unpack`] - Extraction into the output directories and marker files
//! - [`wrapper`] - Wrapper script generation

pub mod artefact;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod provisioner;
pub mod release;
pub mod unpack;
pub mod wrapper;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
