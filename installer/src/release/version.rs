//! SDK version newtype.
//!
//! The SDK is published under dotted numeric versions with two or three
//! components (`1.9`, `1.9.6`). Installer releases may append a packaging
//! revision (`1.9.6.1`); [`SdkVersion::from_release`] strips it.

use super::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

const MIN_COMPONENTS: usize = 2;
const MAX_COMPONENTS: usize = 3;
const RELEASE_COMPONENTS: usize = 4;

/// A validated SDK version string.
///
/// # Examples
///
/// ```
/// use gae_installer::release::version::SdkVersion;
///
/// let version = SdkVersion::parse("1.9.6").unwrap();
/// assert_eq!(version.compact(), "196");
///
/// let from_release = SdkVersion::from_release("1.9.6.1").unwrap();
/// assert_eq!(from_release, version);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SdkVersion(String);

impl SdkVersion {
    /// Parse an SDK version with two or three numeric components.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidVersion`] when a component is empty or
    /// non-numeric, or the component count is outside the accepted range.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let count = count_components(trimmed)?;
        if !(MIN_COMPONENTS..=MAX_COMPONENTS).contains(&count) {
            return Err(invalid(
                value,
                format!("expected {MIN_COMPONENTS} or {MAX_COMPONENTS} components, got {count}"),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Derive the SDK version from a full installer release version.
    ///
    /// A four-component release carries a packaging revision as its last
    /// component, which is dropped. Shorter releases are the SDK version.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidVersion`] when the release string is
    /// malformed or has more than four components.
    pub fn from_release(release: &str) -> Result<Self> {
        let trimmed = release.trim();
        let count = count_components(trimmed)?;
        if count == RELEASE_COMPONENTS {
            let sdk_part = trimmed
                .rsplit_once('.')
                .map_or(trimmed, |(head, _revision)| head);
            return Self::parse(sdk_part);
        }
        Self::parse(trimmed)
    }

    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the version with its separators removed (`1.9.6` → `196`).
    ///
    /// The deprecated storage tier keys its folders by this form.
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.replace('.', "")
    }
}

impl FromStr for SdkVersion {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for SdkVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate every dotted component and return how many there are.
fn count_components(value: &str) -> Result<usize> {
    if value.is_empty() {
        return Err(invalid(value, "version is empty".to_owned()));
    }
    let mut count = 0;
    for component in value.split('.') {
        if component.is_empty() {
            return Err(invalid(value, "empty component".to_owned()));
        }
        if let Some(bad) = component.chars().find(|c| !c.is_ascii_digit()) {
            return Err(invalid(value, format!("non-numeric character '{bad}'")));
        }
        count += 1;
    }
    Ok(count)
}

fn invalid(value: &str, reason: String) -> ReleaseError {
    ReleaseError::InvalidVersion {
        value: value.to_owned(),
        reason,
    }
}
