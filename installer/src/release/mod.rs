//! Release descriptor: the SDK version, its checksum, and where to fetch it.
//!
//! # Sub-modules
//!
//! - [`checksum`] - Checksum newtype and whole-file digests (`Checksum`).
//! - [`error`] - Validation errors for release values.
//! - [`source`] - URL templates and source resolution (`SourceUrls`).
//! - [`version`] - SDK version newtype (`SdkVersion`).

pub mod checksum;
pub mod error;
pub mod source;
pub mod version;

use checksum::Checksum;
use source::{SourceUrls, UrlTemplate, resolve_source};
use version::SdkVersion;

/// Immutable description of the SDK release to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    version: SdkVersion,
    checksum: Checksum,
    primary: UrlTemplate,
    fallback: UrlTemplate,
}

impl ReleaseDescriptor {
    /// Create a descriptor that uses the default object-store locations.
    #[must_use]
    pub fn new(version: SdkVersion, checksum: Checksum) -> Self {
        Self {
            version,
            checksum,
            primary: UrlTemplate::default_primary(),
            fallback: UrlTemplate::default_fallback(),
        }
    }

    /// Replace the primary and fallback URL templates.
    #[must_use]
    pub fn with_templates(mut self, primary: UrlTemplate, fallback: UrlTemplate) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    /// Return the SDK version.
    #[must_use]
    pub fn version(&self) -> &SdkVersion {
        &self.version
    }

    /// Return the expected archive checksum.
    #[must_use]
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// Resolve the concrete download URLs for this release.
    #[must_use]
    pub fn resolve_source(&self) -> SourceUrls {
        resolve_source(&self.version, &self.primary, &self.fallback)
    }

    /// File name of the cached archive for this release.
    ///
    /// # Examples
    ///
    /// ```
    /// use gae_installer::release::ReleaseDescriptor;
    /// use gae_installer::release::checksum::Checksum;
    /// use gae_installer::release::version::SdkVersion;
    ///
    /// let descriptor = ReleaseDescriptor::new(
    ///     SdkVersion::parse("1.9.6").unwrap(),
    ///     Checksum::parse(&"0".repeat(32)).unwrap(),
    /// );
    /// assert_eq!(
    ///     descriptor.archive_file_name("google_appengine"),
    ///     "google_appengine_1.9.6.zip"
    /// );
    /// ```
    #[must_use]
    pub fn archive_file_name(&self, package_dir: &str) -> String {
        format!("{package_dir}_{}.zip", self.version)
    }
}
