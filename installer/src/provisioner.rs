//! The provisioning pipeline.
//!
//! [`Provisioner`] walks the four steps in order (resolve the source,
//! fetch or reuse the archive, unpack it, generate the wrapper scripts) and
//! owns each step's output. The host packaging tool calls it twice: the build
//! hook ([`Provisioner::build`]) and the collect-scripts hook
//! ([`Provisioner::collect_scripts`]). [`Provisioner::run`] does both.
//!
//! Steps must be called in order; calling one early or late, or after a
//! failure, returns [`ProvisionError::OutOfOrder`].

use crate::artefact::download::ArchiveFetcher;
use crate::artefact::extraction::ArchiveExtractor;
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::fetch::{FetchRequest, VerifiedArchive, fetch_or_reuse};
use crate::output::{Verbosity, write_progress};
use crate::release::source::SourceUrls;
use crate::unpack::{UnpackedTree, unpack};
use crate::wrapper::{WrapperScript, generate_scripts};
use std::fmt;
use std::io::Write;

/// Where the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has run yet.
    Start,
    /// Download URLs are known.
    SourceResolved,
    /// A checksum-verified archive is in the cache.
    ArchiveVerified,
    /// The archive is unpacked into the output directories.
    Unpacked,
    /// Wrapper scripts are written.
    ScriptsGenerated,
    /// The script manifest has been handed back.
    Done,
    /// A step failed; nothing further may run.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::SourceResolved => "source resolved",
            Self::ArchiveVerified => "archive verified",
            Self::Unpacked => "unpacked",
            Self::ScriptsGenerated => "scripts generated",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs the provisioning steps against injected network and extraction
/// implementations.
///
/// # Examples
///
/// ```no_run
/// use gae_installer::artefact::download::HttpFetcher;
/// use gae_installer::artefact::extraction::ZipExtractor;
/// use gae_installer::config::{ConfigOverrides, load_config};
/// use gae_installer::output::Verbosity;
/// use gae_installer::provisioner::Provisioner;
///
/// let config = load_config(None, &ConfigOverrides::default())?;
/// let fetcher = HttpFetcher::new(config.network.timeout, config.network.max_redirects);
/// let mut provisioner = Provisioner::new(&config, &fetcher, &ZipExtractor, Verbosity::Normal);
/// let scripts = provisioner.run(&mut std::io::stderr())?;
/// for script in scripts {
///     println!("{}", script.path);
/// }
/// # Ok::<(), gae_installer::error::ProvisionError>(())
/// ```
pub struct Provisioner<'a> {
    config: &'a ProvisionConfig,
    fetcher: &'a dyn ArchiveFetcher,
    extractor: &'a dyn ArchiveExtractor,
    verbosity: Verbosity,
    stage: Stage,
    sources: Option<SourceUrls>,
    archive: Option<VerifiedArchive>,
    tree: Option<UnpackedTree>,
}

impl<'a> Provisioner<'a> {
    /// Create a pipeline in the [`Stage::Start`] stage.
    #[must_use]
    pub fn new(
        config: &'a ProvisionConfig,
        fetcher: &'a dyn ArchiveFetcher,
        extractor: &'a dyn ArchiveExtractor,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            verbosity,
            stage: Stage::Start,
            sources: None,
            archive: None,
            tree: None,
        }
    }

    /// Return the current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Resolve the primary and fallback download URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless in [`Stage::Start`].
    pub fn resolve_source(&mut self) -> Result<&SourceUrls> {
        self.require("resolve the source", Stage::Start)?;
        let urls = self.config.release.resolve_source();
        log::debug!("primary URL {}, fallback URL {}", urls.primary, urls.fallback);
        self.stage = Stage::SourceResolved;
        Ok(self.sources.insert(urls))
    }

    /// Reuse the cached archive or download and verify a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless in
    /// [`Stage::SourceResolved`], or any error from
    /// [`crate::fetch::fetch_or_reuse`].
    pub fn fetch_or_reuse(&mut self, stderr: &mut dyn Write) -> Result<&VerifiedArchive> {
        self.require("fetch the archive", Stage::SourceResolved)?;
        let Some(urls) = self.sources.as_ref() else {
            return Err(self.out_of_order("fetch the archive"));
        };
        let cache = self.config.archive_cache();
        let request = FetchRequest {
            release: &self.config.release,
            urls,
            cache: &cache,
            verbosity: self.verbosity,
        };
        let result = fetch_or_reuse(&request, self.fetcher, stderr);
        let archive = self.track(result, Stage::ArchiveVerified)?;
        Ok(self.archive.insert(archive))
    }

    /// Unpack the verified archive into the output directories.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless in
    /// [`Stage::ArchiveVerified`], or any error from [`crate::unpack::unpack`].
    pub fn unpack(&mut self, stderr: &mut dyn Write) -> Result<&UnpackedTree> {
        self.require("unpack", Stage::ArchiveVerified)?;
        let Some(archive) = self.archive.as_ref() else {
            return Err(self.out_of_order("unpack"));
        };
        let result = unpack(
            &archive.path,
            &self.config.output,
            self.extractor,
            self.verbosity,
            stderr,
        );
        let tree = self.track(result, Stage::Unpacked)?;
        Ok(self.tree.insert(tree))
    }

    /// Adopt a tree unpacked by an earlier `build` invocation.
    ///
    /// This lets the collect-scripts hook run in a separate process.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless in [`Stage::Start`], and
    /// [`ProvisionError::UnpackedTreeMissing`] if no tree is on disk.
    pub fn adopt_unpacked(&mut self) -> Result<&UnpackedTree> {
        self.require("adopt the unpacked tree", Stage::Start)?;
        let result = UnpackedTree::open(&self.config.output);
        let tree = self.track(result, Stage::Unpacked)?;
        Ok(self.tree.insert(tree))
    }

    /// Write the locator and wrapper scripts.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless in [`Stage::Unpacked`],
    /// or [`ProvisionError::ScriptGeneration`] if a script cannot be written.
    pub fn generate_scripts(&mut self, stderr: &mut dyn Write) -> Result<Vec<WrapperScript>> {
        self.require("generate scripts", Stage::Unpacked)?;
        let Some(tree) = self.tree.as_ref() else {
            return Err(self.out_of_order("generate scripts"));
        };
        let result = generate_scripts(
            &tree.root(),
            &self.config.output.scripts_dir,
            &self.config.scripts,
        );
        let scripts = self.track(result, Stage::ScriptsGenerated)?;
        for script in &scripts {
            write_progress(
                stderr,
                self.verbosity,
                format!("Generating script file: {}", script.path),
            );
        }
        Ok(scripts)
    }

    /// The build hook: resolve, fetch or reuse, and unpack.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any step.
    pub fn build(&mut self, stderr: &mut dyn Write) -> Result<UnpackedTree> {
        self.resolve_source()?;
        self.fetch_or_reuse(stderr)?;
        let tree = self.unpack(stderr)?;
        Ok(tree.clone())
    }

    /// The collect-scripts hook: generate the scripts and return them in
    /// order, locator first.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::OutOfOrder`] unless the tree is unpacked or
    /// adopted, or any script generation error.
    pub fn collect_scripts(&mut self, stderr: &mut dyn Write) -> Result<Vec<WrapperScript>> {
        let scripts = self.generate_scripts(stderr)?;
        self.stage = Stage::Done;
        Ok(scripts)
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any step.
    pub fn run(&mut self, stderr: &mut dyn Write) -> Result<Vec<WrapperScript>> {
        self.build(stderr)?;
        self.collect_scripts(stderr)
    }

    fn require(&self, step: &'static str, expected: Stage) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(self.out_of_order(step))
        }
    }

    fn out_of_order(&self, step: &'static str) -> ProvisionError {
        ProvisionError::OutOfOrder {
            step,
            stage: self.stage,
        }
    }

    fn track<T>(&mut self, result: Result<T>, next: Stage) -> Result<T> {
        match result {
            Ok(value) => {
                self.stage = next;
                Ok(value)
            }
            Err(err) => {
                log::debug!("pipeline failed in stage {}: {err}", self.stage);
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Provisioner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("stage", &self.stage)
            .field("verbosity", &self.verbosity)
            .field("sources", &self.sources)
            .field("archive", &self.archive)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;
