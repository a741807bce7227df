//! Unpacking the verified archive into the output directories.
//!
//! Each target directory must not exist beforehand: a leftover tree from an
//! earlier build would mix files from two releases. After extraction a
//! `<package_dir>.pth` marker is written beside the package so the Python
//! path machinery picks the SDK up.

use crate::artefact::extraction::ArchiveExtractor;
use crate::config::OutputSettings;
use crate::error::{ProvisionError, Result};
use crate::output::{Verbosity, write_detail, write_progress};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// The SDK as laid out on disk after unpacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedTree {
    /// The primary unpack directory.
    pub lib_dir: Utf8PathBuf,
    /// Additional directories holding an identical copy.
    pub mirrors: Vec<Utf8PathBuf>,
    /// Name of the SDK directory inside each target.
    pub package_dir: String,
}

impl UnpackedTree {
    /// Path of the SDK package in the primary directory.
    #[must_use]
    pub fn root(&self) -> Utf8PathBuf {
        self.lib_dir.join(&self.package_dir)
    }

    /// Adopt a tree unpacked by an earlier invocation.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::UnpackedTreeMissing`] if the package
    /// directory is absent.
    pub fn open(output: &OutputSettings) -> Result<Self> {
        let tree = Self::from_settings(output);
        let root = tree.root();
        if !root.is_dir() {
            return Err(ProvisionError::UnpackedTreeMissing { path: root });
        }
        Ok(tree)
    }

    fn from_settings(output: &OutputSettings) -> Self {
        Self {
            lib_dir: output.targets.primary().to_owned(),
            mirrors: output.targets.legacy().map(Utf8Path::to_owned).into_iter().collect(),
            package_dir: output.package_dir.clone(),
        }
    }
}

/// Extract `archive` into every configured target and write the markers.
///
/// All targets are checked before anything is extracted. If any target
/// fails, every target created by this call is removed so a rerun starts
/// clean.
///
/// # Errors
///
/// Returns [`ProvisionError::OutputDirectoryExists`] if a target already
/// exists, [`ProvisionError::Extraction`] if the archive cannot be unpacked,
/// [`ProvisionError::UnpackedTreeMissing`] if the archive lacks the package
/// directory, and [`ProvisionError::Io`] for filesystem failures.
pub fn unpack(
    archive: &Utf8Path,
    output: &OutputSettings,
    extractor: &dyn ArchiveExtractor,
    verbosity: Verbosity,
    stderr: &mut dyn Write,
) -> Result<UnpackedTree> {
    if let Some(existing) = output.targets.iter().find(|dir| dir.exists()) {
        return Err(ProvisionError::OutputDirectoryExists {
            path: existing.to_owned(),
        });
    }

    let mut created = Vec::new();
    for target in output.targets.iter() {
        write_progress(stderr, verbosity, format!("Extracting {archive} to {target}"));
        created.push(target);
        let result = unpack_into(
            archive,
            target,
            &output.package_dir,
            extractor,
            verbosity,
            stderr,
        );
        if let Err(err) = result {
            for dir in created {
                discard_partial(dir);
            }
            return Err(err);
        }
    }

    Ok(UnpackedTree::from_settings(output))
}

fn unpack_into(
    archive: &Utf8Path,
    target: &Utf8Path,
    package_dir: &str,
    extractor: &dyn ArchiveExtractor,
    verbosity: Verbosity,
    stderr: &mut dyn Write,
) -> Result<()> {
    std::fs::create_dir_all(target)?;
    let files = extractor
        .extract(archive.as_std_path(), target.as_std_path())
        .map_err(|source| ProvisionError::Extraction {
            archive: archive.to_owned(),
            source,
        })?;
    for file in &files {
        write_detail(stderr, verbosity, format!("  {file}"));
    }
    log::debug!("extracted {} files into {target}", files.len());

    let root = target.join(package_dir);
    if !root.is_dir() {
        return Err(ProvisionError::UnpackedTreeMissing { path: root });
    }
    write_marker(target, package_dir)?;
    Ok(())
}

fn discard_partial(target: &Utf8Path) {
    if let Err(e) = std::fs::remove_dir_all(target) {
        log::warn!("failed to remove partially unpacked {target}: {e}");
    }
}

/// Write `<target>/<package_dir>.pth` naming the package directory.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_marker(target: &Utf8Path, package_dir: &str) -> std::io::Result<Utf8PathBuf> {
    let path = target.join(format!("{package_dir}.pth"));
    std::fs::write(&path, format!("{package_dir}\n"))?;
    Ok(path)
}

#[cfg(test)]
#[path = "unpack_tests.rs"]
mod tests;
