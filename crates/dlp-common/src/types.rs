//! Common types used across DLP

use crate::error::DlpError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ChecksumAlgorithm {
    /// MD5, the digest both upstream datasets are pinned with
    #[default]
    Md5,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Length of the hex-encoded digest
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
            ChecksumAlgorithm::Sha512 => 128,
        }
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "md5"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
            ChecksumAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = DlpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(ChecksumAlgorithm::Sha512),
            _ => Err(DlpError::config(format!("Invalid checksum algorithm: {}", s))),
        }
    }
}

impl TryFrom<String> for ChecksumAlgorithm {
    type Error = DlpError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Static description of a remote dataset.
///
/// Built once at start-up and never mutated afterwards; components receive it
/// by reference (or behind an `Arc`) rather than reading shared globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Short stable key (e.g. "dogs"), used for config overrides and stage names
    pub key: String,

    /// Where the dataset is fetched from
    pub source_url: String,

    /// Hex digest the stored artifact must hash to
    pub expected_checksum: String,

    /// Algorithm `expected_checksum` was computed with
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,

    /// Destination of the stored artifact
    pub local_path: PathBuf,

    /// Human readable name used in log messages
    pub label: String,
}

impl ResourceDescriptor {
    pub fn new(
        key: impl Into<String>,
        source_url: impl Into<String>,
        expected_checksum: impl Into<String>,
        local_path: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_url: source_url.into(),
            expected_checksum: expected_checksum.into().to_lowercase(),
            algorithm: ChecksumAlgorithm::default(),
            local_path: local_path.into(),
            label: label.into(),
        }
    }

    /// Use a different digest algorithm
    pub fn with_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Check that the expected checksum is well-formed hex of the right length
    pub fn validate(&self) -> crate::Result<()> {
        let digest = &self.expected_checksum;
        if digest.len() != self.algorithm.hex_len() || hex::decode(digest).is_err() {
            return Err(DlpError::config(format!(
                "Resource '{}' has an invalid {} checksum: '{}'",
                self.key, self.algorithm, digest
            )));
        }
        Ok(())
    }
}
