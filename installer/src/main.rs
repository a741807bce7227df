//! GAE SDK installer CLI entrypoint.
//!
//! This binary provisions the Google App Engine Python SDK: it fetches (or
//! reuses) the checksum-verified archive, unpacks it, and writes wrapper
//! scripts. Progress goes to stderr; stdout carries only the script manifest
//! or the resolved locations.

use clap::Parser;
use gae_installer::artefact::download::HttpFetcher;
use gae_installer::artefact::extraction::ZipExtractor;
use gae_installer::cli::{Cli, Command};
use gae_installer::config::{ProvisionConfig, load_config};
use gae_installer::error::{ProvisionError, Result};
use gae_installer::output::{
    dry_run_text, format_human, format_json, write_progress, write_stderr_line,
};
use gae_installer::provisioner::Provisioner;
use gae_installer::wrapper::WrapperScript;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let config = load_config(cli.global.config.as_deref(), &cli.global.overrides())?;
    let verbosity = cli.global.verbosity();

    // Dry-run mode: show what would be done without side effects
    if cli.global.dry_run {
        write_stderr_line(stderr, dry_run_text(&config));
        return Ok(());
    }

    let fetcher = HttpFetcher::new(config.network.timeout, config.network.max_redirects);
    let mut provisioner = Provisioner::new(&config, &fetcher, &ZipExtractor, verbosity);

    match cli.selected_command() {
        Command::Install => {
            let scripts = provisioner.run(stderr)?;
            print_manifest(&scripts, false, stdout)
        }
        Command::Build => {
            let tree = provisioner.build(stderr)?;
            write_progress(stderr, verbosity, format!("SDK unpacked at {}", tree.root()));
            Ok(())
        }
        Command::Scripts(args) => {
            provisioner.adopt_unpacked()?;
            let scripts = provisioner.collect_scripts(stderr)?;
            print_manifest(&scripts, args.json, stdout)
        }
        Command::Resolve => print_resolved(&config, stdout),
    }
}

/// Prints the generated scripts, one path per line or as JSON.
fn print_manifest(scripts: &[WrapperScript], json: bool, stdout: &mut dyn Write) -> Result<()> {
    let text = if json {
        format_json(scripts).map_err(|e| ProvisionError::WriteFailed {
            source: std::io::Error::other(e),
        })?
    } else {
        format_human(scripts)
    };
    writeln!(stdout, "{text}").map_err(|source| ProvisionError::WriteFailed { source })
}

/// Prints the download URLs and the cache path.
fn print_resolved(config: &ProvisionConfig, stdout: &mut dyn Write) -> Result<()> {
    let urls = config.release.resolve_source();
    writeln!(
        stdout,
        "primary: {}\nfallback: {}\ncache: {}",
        urls.primary,
        urls.fallback,
        config.archive_cache().path()
    )
    .map_err(|source| ProvisionError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
