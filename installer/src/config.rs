//! Installer configuration.
//!
//! Settings are read from a TOML file (by default `gae-installer.toml` in the
//! working directory) and then overridden by command-line flags. The raw file
//! shape ([`ConfigFile`]) is deserialised with `serde`; [`ProvisionConfig`] is
//! the validated form the pipeline consumes.

use crate::artefact::cache::ArchiveCache;
use crate::artefact::download::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use crate::release::ReleaseDescriptor;
use crate::release::checksum::Checksum;
use crate::release::error::ReleaseError;
use crate::release::source::UrlTemplate;
use crate::release::version::SdkVersion;
use crate::wrapper::ScriptSettings;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "gae-installer.toml";

/// Directory inside the archive that holds the SDK.
pub const DEFAULT_PACKAGE_DIR: &str = "google_appengine";

/// Sub-directory of the user cache directory used for downloads.
const CACHE_SUBDIR: &str = "gae-installer";

/// Errors arising while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration {path}: {reason}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// A required setting was supplied neither in the file nor on the command line.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// Two settings contradict each other or a value is unusable.
    #[error("invalid settings: {0}")]
    Invalid(String),

    /// A release value failed validation.
    #[error(transparent)]
    Release(#[from] ReleaseError),
}

/// Raw `[release]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSection {
    /// SDK version with two or three components.
    pub version: Option<String>,
    /// Installer release version; its packaging revision is stripped.
    pub release_version: Option<String>,
    /// Expected archive checksum (MD5 or SHA-256 hex).
    pub checksum: Option<String>,
    /// Primary URL template.
    pub primary_url: Option<String>,
    /// Fallback URL template.
    pub fallback_url: Option<String>,
}

/// Raw `[cache]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    /// Directory holding downloaded archives.
    pub dir: Option<Utf8PathBuf>,
}

/// Raw `[network]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSection {
    /// Timeout for a whole download, in seconds.
    pub timeout_secs: u64,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Raw `[output]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Directory the SDK is unpacked into.
    pub lib_dir: Utf8PathBuf,
    /// Second unpack directory used when duplication is enabled.
    pub legacy_lib_dir: Option<Utf8PathBuf>,
    /// Duplicate the unpacked tree for legacy module resolution.
    pub duplicate_for_legacy_resolution: bool,
    /// Directory the wrapper scripts are written to.
    pub scripts_dir: Utf8PathBuf,
    /// Name of the SDK directory inside the archive.
    pub package_dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            lib_dir: Utf8PathBuf::from("build/lib"),
            legacy_lib_dir: None,
            duplicate_for_legacy_resolution: false,
            scripts_dir: Utf8PathBuf::from("build/scripts"),
            package_dir: DEFAULT_PACKAGE_DIR.to_owned(),
        }
    }
}

/// The configuration file as written on disk.
///
/// # Examples
///
/// ```
/// use gae_installer::config::ConfigFile;
///
/// let file = ConfigFile::parse(r#"
/// [release]
/// version = "1.9.6"
/// checksum = "888a66d8b2c7a1f3e2b9c0d4e5f61c04"
/// "#).unwrap();
/// assert_eq!(file.release.version.as_deref(), Some("1.9.6"));
/// assert_eq!(file.output.package_dir, "google_appengine");
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// The `[release]` table.
    pub release: ReleaseSection,
    /// The `[cache]` table.
    pub cache: CacheSection,
    /// The `[network]` table.
    pub network: NetworkSection,
    /// The `[output]` table.
    pub output: OutputSection,
    /// The `[scripts]` table.
    pub scripts: ScriptSettings,
}

impl ConfigFile {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Self::parse_at(contents, Utf8Path::new("<inline>"))
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is invalid.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse_at(&contents, path)
    }

    fn parse_at(contents: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Apply command-line overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(version) = &overrides.sdk_version {
            self.release.version = Some(version.clone());
            self.release.release_version = None;
        }
        if let Some(release) = &overrides.release_version {
            self.release.release_version = Some(release.clone());
            self.release.version = None;
        }
        if let Some(checksum) = &overrides.checksum {
            self.release.checksum = Some(checksum.clone());
        }
        if let Some(dir) = &overrides.cache_dir {
            self.cache.dir = Some(dir.clone());
        }
        if let Some(dir) = &overrides.lib_dir {
            self.output.lib_dir = dir.clone();
        }
        if let Some(dir) = &overrides.legacy_lib_dir {
            self.output.legacy_lib_dir = Some(dir.clone());
        }
        if overrides.duplicate_output {
            self.output.duplicate_for_legacy_resolution = true;
        }
        if let Some(dir) = &overrides.scripts_dir {
            self.output.scripts_dir = dir.clone();
        }
        self
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// SDK version.
    pub sdk_version: Option<String>,
    /// Installer release version.
    pub release_version: Option<String>,
    /// Expected archive checksum.
    pub checksum: Option<String>,
    /// Archive cache directory.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Primary unpack directory.
    pub lib_dir: Option<Utf8PathBuf>,
    /// Legacy unpack directory.
    pub legacy_lib_dir: Option<Utf8PathBuf>,
    /// Force duplication of the unpacked tree.
    pub duplicate_output: bool,
    /// Wrapper script directory.
    pub scripts_dir: Option<Utf8PathBuf>,
}

/// HTTP client limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Timeout for a whole download.
    pub timeout: Duration,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

/// The one or two directories the archive is unpacked into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    primary: Utf8PathBuf,
    legacy: Option<Utf8PathBuf>,
}

impl OutputTargets {
    /// Unpack into `primary` only.
    #[must_use]
    pub fn single(primary: Utf8PathBuf) -> Self {
        Self {
            primary,
            legacy: None,
        }
    }

    /// Unpack into `primary` and duplicate into `legacy`.
    #[must_use]
    pub fn duplicated(primary: Utf8PathBuf, legacy: Utf8PathBuf) -> Self {
        Self {
            primary,
            legacy: Some(legacy),
        }
    }

    /// The directory the scripts are discovered from.
    #[must_use]
    pub fn primary(&self) -> &Utf8Path {
        &self.primary
    }

    /// The duplicate directory, when enabled.
    #[must_use]
    pub fn legacy(&self) -> Option<&Utf8Path> {
        self.legacy.as_deref()
    }

    /// Iterate over every target directory, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        std::iter::once(self.primary.as_path()).chain(self.legacy.as_deref())
    }
}

/// Validated output layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Unpack directories.
    pub targets: OutputTargets,
    /// Wrapper script directory.
    pub scripts_dir: Utf8PathBuf,
    /// Name of the SDK directory inside the archive.
    pub package_dir: String,
}

/// Validated configuration consumed by the provisioning pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// The release to provision.
    pub release: ReleaseDescriptor,
    /// Directory holding downloaded archives.
    pub cache_dir: Utf8PathBuf,
    /// HTTP client limits.
    pub network: NetworkSettings,
    /// Output layout.
    pub output: OutputSettings,
    /// Wrapper script rules.
    pub scripts: ScriptSettings,
}

impl ProvisionConfig {
    /// Validate a raw configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the version or checksum is
    /// absent, [`ConfigError::Release`] when a release value is malformed,
    /// and [`ConfigError::Invalid`] for inconsistent output or script
    /// settings.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let release = resolve_release(&file.release)?;
        let output = resolve_output(file.output)?;
        validate_scripts(&file.scripts)?;

        let cache_dir = file.cache.dir.unwrap_or_else(default_cache_dir);
        let network = NetworkSettings {
            timeout: Duration::from_secs(file.network.timeout_secs),
            max_redirects: file.network.max_redirects,
        };

        Ok(Self {
            release,
            cache_dir,
            network,
            output,
            scripts: file.scripts,
        })
    }

    /// The cache entry for this release's archive.
    #[must_use]
    pub fn archive_cache(&self) -> ArchiveCache {
        ArchiveCache::new(
            &self.cache_dir,
            &self.release.archive_file_name(&self.output.package_dir),
        )
    }
}

/// Load configuration from `path` (or the default file when present) and
/// apply `overrides`.
///
/// An explicitly named file must exist; the default file is optional.
///
/// # Errors
///
/// Returns any [`ConfigError`] raised while reading or validating.
pub fn load_config(
    path: Option<&Utf8Path>,
    overrides: &ConfigOverrides,
) -> Result<ProvisionConfig, ConfigError> {
    let file = match path {
        Some(explicit) => ConfigFile::load(explicit)?,
        None => {
            let default_path = Utf8Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                ConfigFile::load(default_path)?
            } else {
                log::debug!("no {DEFAULT_CONFIG_FILE} found; using built-in defaults");
                ConfigFile::default()
            }
        }
    };
    ProvisionConfig::from_file(file.with_overrides(overrides))
}

/// Default archive cache directory.
///
/// Uses the per-user cache directory from `directories-next` (for example
/// `~/.cache` on Linux) with a `gae-installer` sub-directory, falling back to
/// the system temporary directory.
#[must_use]
pub fn default_cache_dir() -> Utf8PathBuf {
    directories_next::BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::try_from(dirs.cache_dir().to_path_buf()).ok())
        .map(|dir| dir.join(CACHE_SUBDIR))
        .or_else(|| Utf8PathBuf::try_from(std::env::temp_dir()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(CACHE_SUBDIR))
}

fn resolve_release(section: &ReleaseSection) -> Result<ReleaseDescriptor, ConfigError> {
    let version = match (&section.version, &section.release_version) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Invalid(
                "set either release.version or release.release_version, not both".to_owned(),
            ));
        }
        (Some(version), None) => SdkVersion::parse(version)?,
        (None, Some(release)) => SdkVersion::from_release(release)?,
        (None, None) => return Err(ConfigError::Missing("release.version")),
    };
    let checksum = section
        .checksum
        .as_deref()
        .ok_or(ConfigError::Missing("release.checksum"))?;
    let checksum = Checksum::parse(checksum)?;

    let primary = section
        .primary_url
        .as_deref()
        .map(UrlTemplate::parse)
        .transpose()?
        .unwrap_or_else(UrlTemplate::default_primary);
    let fallback = section
        .fallback_url
        .as_deref()
        .map(UrlTemplate::parse)
        .transpose()?
        .unwrap_or_else(UrlTemplate::default_fallback);

    Ok(ReleaseDescriptor::new(version, checksum).with_templates(primary, fallback))
}

fn resolve_output(section: OutputSection) -> Result<OutputSettings, ConfigError> {
    if !is_single_component(&section.package_dir) {
        return Err(ConfigError::Invalid(format!(
            "output.package_dir must be a single directory name, got \"{}\"",
            section.package_dir
        )));
    }

    let targets = match (section.duplicate_for_legacy_resolution, section.legacy_lib_dir) {
        (true, None) => return Err(ConfigError::Missing("output.legacy_lib_dir")),
        (true, Some(legacy)) if legacy == section.lib_dir => {
            return Err(ConfigError::Invalid(
                "output.legacy_lib_dir must differ from output.lib_dir".to_owned(),
            ));
        }
        (true, Some(legacy)) => OutputTargets::duplicated(section.lib_dir, legacy),
        (false, legacy) => {
            if let Some(ignored) = legacy {
                log::debug!("ignoring legacy_lib_dir {ignored}: duplication is disabled");
            }
            OutputTargets::single(section.lib_dir)
        }
    };

    Ok(OutputSettings {
        targets,
        scripts_dir: section.scripts_dir,
        package_dir: section.package_dir,
    })
}

fn validate_scripts(settings: &ScriptSettings) -> Result<(), ConfigError> {
    if settings.extension.is_empty() || settings.extension.starts_with('.') {
        return Err(ConfigError::Invalid(
            "scripts.extension must be non-empty and given without a leading dot".to_owned(),
        ));
    }
    if !is_single_component(&settings.locator_name) {
        return Err(ConfigError::Invalid(
            "scripts.locator_name must be a plain file name".to_owned(),
        ));
    }
    if settings.interpreter.trim().is_empty() {
        return Err(ConfigError::Missing("scripts.interpreter"));
    }
    Ok(())
}

fn is_single_component(name: &str) -> bool {
    let mut components = Utf8Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(camino::Utf8Component::Normal(_)), None)
    )
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
