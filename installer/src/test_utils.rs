//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use crate::artefact::download::{ArchiveFetcher, DownloadError, FetchedResponse};
use crate::config::{ConfigFile, ProvisionConfig};
use camino::Utf8Path;
use sha2::Digest;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

/// Top-level tools in the fixture SDK, in sorted order.
pub const FIXTURE_TOOLS: &[&str] = &["appcfg", "dev_appserver", "endpointscfg"];

/// Build an in-memory zip archive from `(name, body)` pairs.
///
/// Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    for (name, body) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add directory");
        } else {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(body).expect("write entry");
        }
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Build a small SDK archive laid out like the real distribution.
///
/// The package directory holds [`FIXTURE_TOOLS`] as `.py` scripts, the
/// excluded test runner, a private helper, a non-script file, and a nested
/// library module.
pub fn sdk_zip(package_dir: &str) -> Vec<u8> {
    let mut names = vec![format!("{package_dir}/")];
    names.extend(FIXTURE_TOOLS.iter().map(|tool| format!("{package_dir}/{tool}.py")));
    names.push(format!("{package_dir}/run_tests.py"));
    names.push(format!("{package_dir}/_python_runtime.py"));
    names.push(format!("{package_dir}/VERSION"));
    names.push(format!("{package_dir}/google/__init__.py"));
    names.push(format!("{package_dir}/google/appengine/__init__.py"));
    names.push(format!("{package_dir}/lib/yaml/__init__.py"));

    let entries: Vec<(&str, &[u8])> = names
        .iter()
        .map(|name| (name.as_str(), b"# fixture\n".as_slice()))
        .collect();
    zip_bytes(&entries)
}

/// Hex MD5 of `bytes`.
pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::Md5::digest(bytes))
}

/// Hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", sha2::Sha256::digest(bytes))
}

/// Build a validated configuration rooted at `base`.
///
/// Cache, output and scripts directories all live below `base`; the default
/// URL templates are kept so tests can assert on the resolved URLs.
pub fn test_config(base: &Utf8Path, version: &str, checksum: &str) -> ProvisionConfig {
    let toml = format!(
        r#"
[release]
version = "{version}"
checksum = "{checksum}"

[cache]
dir = "{base}/cache"

[output]
lib_dir = "{base}/build/lib"
legacy_lib_dir = "{base}/build/lib.legacy"
scripts_dir = "{base}/build/scripts"
"#
    );
    let file = ConfigFile::parse(&toml).expect("valid test config");
    ProvisionConfig::from_file(file).expect("resolvable test config")
}

/// A canned response for [`ScriptedFetcher`].
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    /// HTTP status to report.
    pub status: u16,
    /// Content type to report.
    pub content_type: Option<String>,
    /// Body written to the destination file.
    pub body: Vec<u8>,
}

impl ScriptedResponse {
    /// A 200 response carrying a zip payload.
    pub fn archive(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some("application/zip".to_owned()),
            body,
        }
    }

    /// A 200 HTML page, as the featured tier serves for moved releases.
    pub fn html_page() -> Self {
        Self {
            status: 200,
            content_type: Some("text/html; charset=UTF-8".to_owned()),
            body: b"<html>moved</html>".to_vec(),
        }
    }

    /// A response with the given status and no body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: Some("text/html".to_owned()),
            body: Vec::new(),
        }
    }
}

/// An [`ArchiveFetcher`] that replays canned responses and records the URLs
/// it was asked for.
///
/// Each call consumes the next response; running out panics.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    responses: RefCell<VecDeque<ScriptedResponse>>,
    requested: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    /// Creates a fetcher that replays `responses` in order.
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requested: RefCell::new(Vec::new()),
        }
    }

    /// The URLs requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }

    /// Asserts that every canned response has been consumed.
    ///
    /// # Panics
    ///
    /// Panics if responses remain.
    pub fn assert_finished(&self) {
        assert!(
            self.responses.borrow().is_empty(),
            "expected no further fetches"
        );
    }
}

impl ArchiveFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedResponse, DownloadError> {
        self.requested.borrow_mut().push(url.to_owned());
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("unexpected fetch");
        std::fs::write(dest, &response.body)?;
        Ok(FetchedResponse {
            status: response.status,
            content_type: response.content_type,
        })
    }
}
