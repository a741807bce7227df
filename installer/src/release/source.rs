//! Download URL resolution.
//!
//! The object store serves current SDK releases from a "featured" folder and
//! moves older ones into a "deprecated" folder keyed by the compact version.
//! Both locations are described by templates with `{version}` and
//! `{compact_version}` placeholders.

use super::error::{ReleaseError, Result};
use super::version::SdkVersion;
use std::fmt;

/// Placeholder replaced with the dotted SDK version.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Placeholder replaced with the SDK version without separators.
pub const COMPACT_VERSION_PLACEHOLDER: &str = "{compact_version}";

/// Default template for the featured storage tier.
pub const DEFAULT_PRIMARY_TEMPLATE: &str =
    "https://storage.googleapis.com/appengine-sdks/featured/google_appengine_{version}.zip";

/// Default template for the deprecated storage tier.
pub const DEFAULT_FALLBACK_TEMPLATE: &str = "https://storage.googleapis.com/appengine-sdks/deprecated/{compact_version}/google_appengine_{version}.zip";

/// A validated download URL template.
///
/// # Examples
///
/// ```
/// use gae_installer::release::source::UrlTemplate;
/// use gae_installer::release::version::SdkVersion;
///
/// let template = UrlTemplate::parse("https://example.test/{compact_version}/sdk_{version}.zip").unwrap();
/// let version = SdkVersion::parse("1.9.6").unwrap();
/// assert_eq!(template.render(&version), "https://example.test/196/sdk_1.9.6.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Validate a template string.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidUrlTemplate`] when the template is
    /// blank or lacks the `{version}` placeholder.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ReleaseError::InvalidUrlTemplate {
                value: value.to_owned(),
                reason: "template is empty".to_owned(),
            });
        }
        if !trimmed.contains(VERSION_PLACEHOLDER) {
            return Err(ReleaseError::InvalidUrlTemplate {
                value: value.to_owned(),
                reason: format!("missing {VERSION_PLACEHOLDER} placeholder"),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The featured-tier template used when none is configured.
    #[must_use]
    pub fn default_primary() -> Self {
        Self(DEFAULT_PRIMARY_TEMPLATE.to_owned())
    }

    /// The deprecated-tier template used when none is configured.
    #[must_use]
    pub fn default_fallback() -> Self {
        Self(DEFAULT_FALLBACK_TEMPLATE.to_owned())
    }

    /// Substitute the version placeholders.
    #[must_use]
    pub fn render(&self, version: &SdkVersion) -> String {
        self.0
            .replace(COMPACT_VERSION_PLACEHOLDER, &version.compact())
            .replace(VERSION_PLACEHOLDER, version.as_str())
    }

    /// Return the raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The concrete URLs to try for one SDK version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrls {
    /// Featured location, always tried first.
    pub primary: String,
    /// Deprecated location, tried only after the primary serves a
    /// non-archive payload.
    pub fallback: String,
}

/// Resolve the primary and fallback URLs for `version`.
#[must_use]
pub fn resolve_source(
    version: &SdkVersion,
    primary: &UrlTemplate,
    fallback: &UrlTemplate,
) -> SourceUrls {
    SourceUrls {
        primary: primary.render(version),
        fallback: fallback.render(version),
    }
}
