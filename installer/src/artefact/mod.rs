//! SDK archive handling: the local cache, HTTP download, and extraction.
//!
//! # Sub-modules
//!
//! - [`cache`] - Deterministic cache path, lookup, and atomic commit (`ArchiveCache`).
//! - [`download`] - Fetcher trait and HTTP implementation (`ArchiveFetcher`).
//! - [`extraction`] - Zip extraction with path traversal protection (`ArchiveExtractor`).

pub mod cache;
pub mod download;
pub mod extraction;
