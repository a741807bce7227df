//! Output formatting for the installer CLI.
//!
//! Progress goes to stderr through [`write_progress`] so that stdout carries
//! only the script manifest, which the host packaging tool consumes.

use crate::config::ProvisionConfig;
use crate::wrapper::WrapperScript;
use std::fmt::Display;
use std::io::Write;

/// How much progress output to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Step-level progress.
    #[default]
    Normal,
    /// Step-level progress plus per-file detail.
    Verbose,
}

impl Verbosity {
    /// Derive the verbosity from the `--quiet` flag and `-v` count.
    ///
    /// # Examples
    ///
    /// ```
    /// use gae_installer::output::Verbosity;
    ///
    /// assert_eq!(Verbosity::from_flags(true, 0), Verbosity::Quiet);
    /// assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
    /// assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Verbose);
    /// ```
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose > 0 {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Return true when step-level progress should be shown.
    #[must_use]
    pub fn shows_progress(self) -> bool {
        self != Self::Quiet
    }

    /// Return true when per-file detail should be shown.
    #[must_use]
    pub fn shows_detail(self) -> bool {
        self == Self::Verbose
    }
}

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Write a progress line unless running quietly.
pub fn write_progress(stderr: &mut dyn Write, verbosity: Verbosity, message: impl Display) {
    if verbosity.shows_progress() {
        write_stderr_line(stderr, message);
    }
}

/// Write a per-file detail line when running verbosely.
pub fn write_detail(stderr: &mut dyn Write, verbosity: Verbosity, message: impl Display) {
    if verbosity.shows_detail() {
        write_stderr_line(stderr, message);
    }
}

/// Format the script manifest as one path per line.
#[must_use]
pub fn format_human(scripts: &[WrapperScript]) -> String {
    scripts
        .iter()
        .map(|script| script.path.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the script manifest as a JSON array of `{name, path}` objects.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn format_json(scripts: &[WrapperScript]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(scripts)
}

/// Format the resolved configuration for `--dry-run`.
#[must_use]
pub fn dry_run_text(config: &ProvisionConfig) -> String {
    let release = &config.release;
    let urls = release.resolve_source();
    let mut lines = vec![
        "Dry run - no files will be modified".to_owned(),
        String::new(),
        format!("SDK version: {}", release.version()),
        format!(
            "Checksum: {} ({})",
            release.checksum(),
            release.checksum().algorithm()
        ),
        format!("Primary URL: {}", urls.primary),
        format!("Fallback URL: {}", urls.fallback),
        format!("Cached archive: {}", config.archive_cache().path()),
    ];
    for dir in config.output.targets.iter() {
        lines.push(format!("Output directory: {dir}"));
    }
    lines.push(format!("Package directory: {}", config.output.package_dir));
    lines.push(format!("Scripts directory: {}", config.output.scripts_dir));
    lines.join("\n")
}
