//! CLI argument definitions for the GAE SDK installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::ConfigOverrides;
use crate::output::Verbosity;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Provision the Google App Engine Python SDK.
#[derive(Parser, Debug)]
#[command(name = "gae-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Provision the Google App Engine Python SDK.\n\n",
    "Downloads the SDK archive for the configured version (reusing a cached copy ",
    "when its checksum matches), unpacks it into the output directory, and writes ",
    "a wrapper script for every bundled command-line tool.\n\n",
    "Settings are read from gae-installer.toml in the working directory when ",
    "present; command-line flags take precedence.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and generate scripts in one go:\n",
    "    $ gae-installer --sdk-version 1.9.6 --checksum <md5>\n\n",
    "  Run the build hook, then collect scripts as JSON:\n",
    "    $ gae-installer build\n",
    "    $ gae-installer scripts --json\n\n",
    "  Show the download URLs and cache path:\n",
    "    $ gae-installer resolve\n\n",
    "  Preview without touching the filesystem:\n",
    "    $ gae-installer --dry-run",
))]
pub struct Cli {
    /// Subcommand to execute (defaults to `install`).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build and generate scripts (default when no subcommand given).
    Install,

    /// Resolve, fetch or reuse, and unpack the SDK.
    Build,

    /// Generate wrapper scripts from an unpacked SDK and print their paths.
    Scripts(ScriptsArgs),

    /// Print the download URLs and cache path.
    Resolve,
}

/// Arguments for the scripts command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptsArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file [default: gae-installer.toml if present].
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// SDK version to install, e.g. 1.9.6.
    #[arg(long, value_name = "VERSION", global = true, conflicts_with = "release_version")]
    pub sdk_version: Option<String>,

    /// Installer release version; a fourth packaging component is dropped.
    #[arg(long, value_name = "VERSION", global = true)]
    pub release_version: Option<String>,

    /// Expected archive checksum (MD5 or SHA-256 hex).
    #[arg(long, value_name = "HEX", global = true)]
    pub checksum: Option<String>,

    /// Directory holding downloaded archives [default: user cache directory].
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Directory the SDK is unpacked into.
    #[arg(long, value_name = "DIR", global = true)]
    pub lib_dir: Option<Utf8PathBuf>,

    /// Second unpack directory used with --duplicate-output.
    #[arg(long, value_name = "DIR", global = true)]
    pub legacy_lib_dir: Option<Utf8PathBuf>,

    /// Also unpack into the legacy directory.
    #[arg(long, global = true)]
    pub duplicate_output: bool,

    /// Directory the wrapper scripts are written to.
    #[arg(long, value_name = "DIR", global = true)]
    pub scripts_dir: Option<Utf8PathBuf>,

    /// Show configuration and exit without downloading or writing files.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase output verbosity (repeatable).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Return the subcommand to run, defaulting to [`Command::Install`].
    #[must_use]
    pub fn selected_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Install)
    }
}

impl GlobalArgs {
    /// Collect the configuration overrides given on the command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use gae_installer::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["gae-installer", "--sdk-version", "1.9.6"]);
    /// let overrides = cli.global.overrides();
    /// assert_eq!(overrides.sdk_version.as_deref(), Some("1.9.6"));
    /// assert!(overrides.checksum.is_none());
    /// ```
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            sdk_version: self.sdk_version.clone(),
            release_version: self.release_version.clone(),
            checksum: self.checksum.clone(),
            cache_dir: self.cache_dir.clone(),
            lib_dir: self.lib_dir.clone(),
            legacy_lib_dir: self.legacy_lib_dir.clone(),
            duplicate_output: self.duplicate_output,
            scripts_dir: self.scripts_dir.clone(),
        }
    }

    /// Return the progress verbosity selected by `--quiet` and `-v`.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbosity)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
