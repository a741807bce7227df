//! Archive checksum parsing and whole-file digest computation.
//!
//! Releases publish either an MD5 digest (32 hex characters) or a SHA-256
//! digest (64 hex characters). The algorithm is selected by digest length.

use super::error::{ReleaseError, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

const MD5_HEX_LEN: usize = 32;
const SHA256_HEX_LEN: usize = 64;

/// Digest algorithm implied by a checksum's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// 128-bit MD5, as published alongside historical SDK releases.
    Md5,
    /// 256-bit SHA-256.
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// A validated, lowercase hex checksum.
///
/// # Examples
///
/// ```
/// use gae_installer::release::checksum::{Checksum, DigestAlgorithm};
///
/// let checksum = Checksum::parse("888A66D8B2C7A1F3E2B9C0D4E5F61C04").unwrap();
/// assert_eq!(checksum.algorithm(), DigestAlgorithm::Md5);
/// assert_eq!(checksum.as_str(), "888a66d8b2c7a1f3e2b9c0d4e5f61c04");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl Checksum {
    /// Parse a hex digest, selecting the algorithm by its length.
    ///
    /// Surrounding whitespace is ignored and uppercase hex is normalised.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::InvalidChecksum`] for non-hex characters or a
    /// length matching neither supported algorithm.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ReleaseError::InvalidChecksum {
                value: value.to_owned(),
                reason: format!("non-hex character '{bad}'"),
            });
        }
        let algorithm = match trimmed.len() {
            MD5_HEX_LEN => DigestAlgorithm::Md5,
            SHA256_HEX_LEN => DigestAlgorithm::Sha256,
            other => {
                return Err(ReleaseError::InvalidChecksum {
                    value: value.to_owned(),
                    reason: format!(
                        "expected {MD5_HEX_LEN} (MD5) or {SHA256_HEX_LEN} (SHA-256) hex characters, got {other}"
                    ),
                });
            }
        };
        Ok(Self {
            algorithm,
            hex: trimmed.to_ascii_lowercase(),
        })
    }

    /// Return the digest algorithm.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Return the expected digest as lowercase hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Compute the digest of the file at `path` with this checksum's algorithm.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn digest_file(&self, path: &Path) -> io::Result<String> {
        match self.algorithm {
            DigestAlgorithm::Md5 => hex_digest::<Md5>(path),
            DigestAlgorithm::Sha256 => hex_digest::<Sha256>(path),
        }
    }

    /// Return whether a computed hex digest equals the expected one.
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        self.hex.eq_ignore_ascii_case(actual)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

/// Stream the whole file through `D` and return the lowercase hex digest.
fn hex_digest<D>(path: &Path) -> io::Result<String>
where
    D: Digest + io::Write,
    sha2::digest::Output<D>: fmt::LowerHex,
{
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
