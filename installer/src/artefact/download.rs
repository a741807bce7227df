//! Archive download over HTTP(S).
//!
//! Provides a trait-based abstraction for fetching the SDK archive so the
//! fetch-or-reuse step can be exercised without network access.

use std::path::Path;
use std::time::Duration;

/// Default timeout for a whole download, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// MIME types the object store uses for zip payloads.
const ARCHIVE_CONTENT_TYPES: &[&str] = &["application/zip", "application/x-zip-compressed"];

/// Status line and declared content type of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if present.
    pub content_type: Option<String>,
}

impl FetchedResponse {
    /// Return true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return true when the declared content type is a zip archive.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        is_archive_content_type(self.content_type.as_deref())
    }
}

/// Trait for fetching a URL into a local file.
///
/// Implementations write the response body to `dest` whatever the status,
/// and report the status and content type so the caller can decide whether
/// the payload is usable.
///
/// # Examples
///
/// ```
/// use gae_installer::artefact::download::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, HttpFetcher};
///
/// let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT, DEFAULT_MAX_REDIRECTS);
/// // Use fetcher.fetch(url, dest) in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Fetch `url` and write the body to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be completed or the body
    /// cannot be written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedResponse, DownloadError>;
}

/// Errors arising from archive downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request failed before a response was received.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("download failed for {url}: HTTP status {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Build a fetcher with a global timeout and a redirect limit.
    ///
    /// Status codes are not turned into errors; they are reported in the
    /// [`FetchedResponse`] so the caller can apply the fallback rule.
    #[must_use]
    pub fn new(timeout: Duration, max_redirects: u32) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .max_redirects(max_redirects)
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedResponse, DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        log::debug!("GET {url} -> {status} ({content_type:?})");

        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().into_reader(), &mut file).map_err(|e| {
            DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        })?;
        file.sync_all()?;

        Ok(FetchedResponse {
            status,
            content_type,
        })
    }
}

/// Return true when `content_type` names a zip payload.
///
/// Parameters such as `; charset=binary` and letter case are ignored.
#[must_use]
pub fn is_archive_content_type(content_type: Option<&str>) -> bool {
    let Some(value) = content_type else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim();
    ARCHIVE_CONTENT_TYPES
        .iter()
        .any(|known| essence.eq_ignore_ascii_case(known))
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(status) => DownloadError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
