//! Local archive cache.
//!
//! The cache holds at most one archive per release at a deterministic path.
//! [`ArchiveCache::lookup`] inspects it and [`CacheLookup::action`] decides
//! what to do, keeping the I/O apart from the decision. Replacements are
//! staged in a temporary file beside the cache path and renamed into place
//! only once verified.

use crate::release::checksum::Checksum;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tempfile::NamedTempFile;

/// Prefix of temporary download files inside the cache directory.
const STAGING_PREFIX: &str = ".download-";

/// What the cache holds for the requested release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// No archive is cached.
    Miss,
    /// A cached archive matches the expected checksum.
    Valid {
        /// The computed digest.
        digest: String,
    },
    /// A cached archive exists but its checksum differs.
    Stale {
        /// The computed digest of the stale file.
        actual: String,
    },
}

/// The step taken for a given [`CacheLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Use the cached archive without network access.
    Reuse,
    /// Download a fresh archive.
    Download,
}

impl CacheLookup {
    /// Decide whether the cached archive can be reused.
    ///
    /// # Examples
    ///
    /// ```
    /// use gae_installer::artefact::cache::{CacheAction, CacheLookup};
    ///
    /// assert_eq!(CacheLookup::Miss.action(), CacheAction::Download);
    /// let stale = CacheLookup::Stale { actual: "00".to_owned() };
    /// assert_eq!(stale.action(), CacheAction::Download);
    /// ```
    #[must_use]
    pub fn action(&self) -> CacheAction {
        match self {
            Self::Valid { .. } => CacheAction::Reuse,
            Self::Miss | Self::Stale { .. } => CacheAction::Download,
        }
    }
}

/// Location of the cached archive for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCache {
    dir: Utf8PathBuf,
    path: Utf8PathBuf,
}

impl ArchiveCache {
    /// Create a cache entry for `file_name` inside `dir`.
    #[must_use]
    pub fn new(dir: &Utf8Path, file_name: &str) -> Self {
        Self {
            dir: dir.to_owned(),
            path: dir.join(file_name),
        }
    }

    /// Return the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Return the deterministic archive path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Inspect the cached archive against `checksum`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if an existing archive cannot be read.
    pub fn lookup(&self, checksum: &Checksum) -> io::Result<CacheLookup> {
        if !self.path.is_file() {
            return Ok(CacheLookup::Miss);
        }
        let digest = checksum.digest_file(self.path.as_std_path())?;
        if checksum.matches(&digest) {
            Ok(CacheLookup::Valid { digest })
        } else {
            Ok(CacheLookup::Stale { actual: digest })
        }
    }

    /// Create an empty temporary file in the cache directory.
    ///
    /// The file is deleted when dropped unless passed to [`Self::commit`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub fn staging_file(&self) -> io::Result<NamedTempFile> {
        fs::create_dir_all(&self.dir)?;
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".zip")
            .tempfile_in(&self.dir)
    }

    /// Atomically move a verified staging file over the cache path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the rename fails.
    pub fn commit(&self, staged: NamedTempFile) -> io::Result<()> {
        staged.persist(&self.path).map_err(|e| e.error)?;
        log::debug!("cached archive at {}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_MD5: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";

    fn cache_in(temp: &tempfile::TempDir) -> ArchiveCache {
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        ArchiveCache::new(&dir.join("cache"), "google_appengine_1.9.6.zip")
    }

    fn checksum() -> Checksum {
        Checksum::parse(HELLO_MD5).expect("valid checksum")
    }

    #[test]
    fn missing_archive_is_a_miss() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        assert_eq!(cache.lookup(&checksum()).expect("lookup"), CacheLookup::Miss);
    }

    #[test]
    fn matching_archive_is_valid() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        fs::create_dir_all(cache.dir()).expect("create cache dir");
        fs::write(cache.path(), b"hello world").expect("write archive");

        let lookup = cache.lookup(&checksum()).expect("lookup");
        assert_eq!(lookup.action(), CacheAction::Reuse);
    }

    #[test]
    fn mismatching_archive_is_stale() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        fs::create_dir_all(cache.dir()).expect("create cache dir");
        fs::write(cache.path(), b"truncated").expect("write archive");

        let lookup = cache.lookup(&checksum()).expect("lookup");
        assert!(matches!(lookup, CacheLookup::Stale { .. }));
        assert_eq!(lookup.action(), CacheAction::Download);
    }

    #[test]
    fn directory_at_cache_path_is_a_miss() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        fs::create_dir_all(cache.path()).expect("create directory");
        assert_eq!(cache.lookup(&checksum()).expect("lookup"), CacheLookup::Miss);
    }

    #[test]
    fn commit_replaces_existing_archive() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        fs::create_dir_all(cache.dir()).expect("create cache dir");
        fs::write(cache.path(), b"old").expect("write archive");

        let mut staged = cache.staging_file().expect("staging file");
        staged.write_all(b"hello world").expect("write staged");
        cache.commit(staged).expect("commit");

        assert_eq!(fs::read(cache.path()).expect("read"), b"hello world");
    }

    #[test]
    fn dropped_staging_file_leaves_no_trace() {
        let temp = tempfile::tempdir().expect("temp dir");
        let cache = cache_in(&temp);
        let staged = cache.staging_file().expect("staging file");
        let staged_path = staged.path().to_path_buf();
        drop(staged);

        assert!(!staged_path.exists());
        assert!(!cache.path().exists());
    }
}
