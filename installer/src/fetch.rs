//! Fetch-or-reuse: make sure a checksum-verified archive sits in the cache.
//!
//! A cached archive whose digest matches is reused without touching the
//! network. Otherwise the primary URL is downloaded into a staging file; if
//! the server answers with something that is not a zip (the release moved to
//! the deprecated tier) the fallback URL is tried once. The staged download
//! is verified before it replaces the cache entry, so a mismatch never
//! leaves an invalid archive behind.

use crate::artefact::cache::{ArchiveCache, CacheLookup};
use crate::artefact::download::{ArchiveFetcher, DownloadError};
use crate::error::{ProvisionError, Result};
use crate::output::{Verbosity, write_progress};
use crate::release::ReleaseDescriptor;
use crate::release::source::SourceUrls;
use camino::Utf8PathBuf;
use std::io::Write;
use tempfile::NamedTempFile;

/// Where the verified archive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOrigin {
    /// A previously cached download was reused.
    Cache,
    /// Downloaded from the primary ("featured") location.
    Primary {
        /// The URL that served the archive.
        url: String,
    },
    /// Downloaded from the fallback ("deprecated") location.
    Fallback {
        /// The URL that served the archive.
        url: String,
    },
}

impl ArchiveOrigin {
    /// Return true when no network access was needed.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cache)
    }
}

/// A local archive whose digest matches the release checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedArchive {
    /// Path of the archive in the cache.
    pub path: Utf8PathBuf,
    /// The verified digest.
    pub digest: String,
    /// Where the archive came from.
    pub origin: ArchiveOrigin,
}

/// Inputs to [`fetch_or_reuse`].
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// The release being provisioned.
    pub release: &'a ReleaseDescriptor,
    /// Resolved download locations.
    pub urls: &'a SourceUrls,
    /// The cache entry for this release.
    pub cache: &'a ArchiveCache,
    /// Progress verbosity.
    pub verbosity: Verbosity,
}

/// Reuse the cached archive if valid, otherwise download and verify it.
///
/// # Errors
///
/// Returns [`ProvisionError::Download`] when a request fails or the fallback
/// answers with a non-success status, [`ProvisionError::ChecksumMismatch`]
/// when the downloaded archive does not match, and [`ProvisionError::Io`]
/// for cache I/O failures.
pub fn fetch_or_reuse(
    request: &FetchRequest<'_>,
    fetcher: &dyn ArchiveFetcher,
    stderr: &mut dyn Write,
) -> Result<VerifiedArchive> {
    let FetchRequest {
        release,
        cache,
        verbosity,
        ..
    } = *request;

    match cache.lookup(release.checksum())? {
        CacheLookup::Valid { digest } => {
            write_progress(stderr, verbosity, format!("SDK zip found at {}", cache.path()));
            write_progress(stderr, verbosity, "Checksum OK");
            log::info!("reusing cached archive {}", cache.path());
            return Ok(VerifiedArchive {
                path: cache.path().to_owned(),
                digest,
                origin: ArchiveOrigin::Cache,
            });
        }
        CacheLookup::Stale { actual } => {
            write_progress(stderr, verbosity, format!("SDK zip found at {}", cache.path()));
            write_progress(
                stderr,
                verbosity,
                format!(
                    "SDK zip checksum doesn't match {}!",
                    release.checksum()
                ),
            );
            log::debug!("cached archive digest {actual} is stale");
        }
        CacheLookup::Miss => log::debug!("no cached archive at {}", cache.path()),
    }

    download_and_verify(request, fetcher, stderr)
}

fn download_and_verify(
    request: &FetchRequest<'_>,
    fetcher: &dyn ArchiveFetcher,
    stderr: &mut dyn Write,
) -> Result<VerifiedArchive> {
    let FetchRequest {
        release,
        urls,
        cache,
        verbosity,
    } = *request;
    let version = release.version();

    write_progress(
        stderr,
        verbosity,
        format!(
            "Downloading SDK {version} from {} to {}",
            urls.primary,
            cache.path()
        ),
    );
    write_progress(stderr, verbosity, "Please be patient, this can take a while...");

    let (staged, origin) = download_primary_or_fallback(request, fetcher, stderr)?;

    let checksum = release.checksum();
    let digest = checksum.digest_file(staged.path())?;
    if !checksum.matches(&digest) {
        // Dropping `staged` deletes the temporary file.
        return Err(ProvisionError::ChecksumMismatch {
            version: version.clone(),
            expected: checksum.to_string(),
            actual: digest,
        });
    }
    write_progress(stderr, verbosity, "Checksum OK");

    cache.commit(staged)?;
    write_progress(stderr, verbosity, "Download OK");

    Ok(VerifiedArchive {
        path: cache.path().to_owned(),
        digest,
        origin,
    })
}

fn download_primary_or_fallback(
    request: &FetchRequest<'_>,
    fetcher: &dyn ArchiveFetcher,
    stderr: &mut dyn Write,
) -> Result<(NamedTempFile, ArchiveOrigin)> {
    let FetchRequest {
        release,
        urls,
        cache,
        verbosity,
    } = *request;

    let staged = cache.staging_file()?;
    let response = fetcher.fetch(&urls.primary, staged.path())?;
    if response.is_archive() {
        if !response.is_success() {
            return Err(DownloadError::Status {
                url: urls.primary.clone(),
                status: response.status,
            }
            .into());
        }
        return Ok((
            staged,
            ArchiveOrigin::Primary {
                url: urls.primary.clone(),
            },
        ));
    }
    drop(staged);

    log::info!(
        "primary URL answered {} with content type {:?}; trying the deprecated location",
        response.status,
        response.content_type
    );
    let version = release.version();
    write_progress(stderr, verbosity, format!("SDK {version} is deprecated!"));
    write_progress(
        stderr,
        verbosity,
        format!("Downloading deprecated SDK {version} from {}", urls.fallback),
    );

    let staged = cache.staging_file()?;
    let response = fetcher.fetch(&urls.fallback, staged.path())?;
    if !response.is_success() {
        return Err(DownloadError::Status {
            url: urls.fallback.clone(),
            status: response.status,
        }
        .into());
    }
    Ok((
        staged,
        ArchiveOrigin::Fallback {
            url: urls.fallback.clone(),
        },
    ))
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
