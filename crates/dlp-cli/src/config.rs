//! Configuration management for DLP
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `DLP_CONFIG`, or `dlp.toml` when present)
//! 3. `DLP_*` environment variables
//! 4. command-line flags (applied by [`crate::Cli`])
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//! target_dir = "target"
//!
//! [analysis]
//! program = "Rscript"
//! args = ["./analyze-dog-data.R"]
//! fail_on_nonzero = false
//!
//! [http]
//! timeout_secs = 600
//!
//! [resources.dogs]
//! url = "https://mirror.example.org/rows.csv"
//! checksum = "f214985644c8b2ade4f8cdc30667aa3e"
//! ```

use crate::analysis::AnalysisCommand;
use dlp_common::{ChecksumAlgorithm, DlpError, ResourceDescriptor, Result};
use dlp_ingest::fetch::{HttpOptions, DEFAULT_USER_AGENT};
use dlp_ingest::resources::{self, ResourceSet, DOGS_KEY, XWALK_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "dlp.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub analysis: AnalysisConfig,
    pub http: HttpConfig,
    /// Per-resource overrides keyed by resource key ("dogs", "xwalk")
    pub resources: BTreeMap<String, ResourceOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Downloaded and derived artifacts
    pub data_dir: PathBuf,
    /// Reserved for analysis output
    pub target_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            target_dir: PathBuf::from("target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Fail the analyze stage when the program exits non-zero
    pub fail_on_nonzero: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let command = AnalysisCommand::default();
        Self {
            program: command.program,
            args: command.args,
            fail_on_nonzero: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// No timeout when unset; a stalled server then blocks the download forever
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceOverride {
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub algorithm: Option<ChecksumAlgorithm>,
}

impl ResourceOverride {
    fn apply(&self, descriptor: &mut ResourceDescriptor) {
        if let Some(ref url) = self.url {
            descriptor.source_url = url.clone();
        }
        if let Some(ref checksum) = self.checksum {
            descriptor.expected_checksum = checksum.to_lowercase();
        }
        if let Some(algorithm) = self.algorithm {
            descriptor.algorithm = algorithm;
        }
    }
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            },
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DlpError::config(format!("cannot read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| DlpError::config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DlpError::config(format!("invalid config: {}", e)))
    }

    /// Apply `DLP_*` environment variables
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Variables: `DLP_DATA_DIR`, `DLP_TARGET_DIR`, `DLP_ANALYSIS_PROGRAM`,
    /// `DLP_HTTP_TIMEOUT_SECS`.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup("DLP_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("DLP_TARGET_DIR") {
            self.paths.target_dir = PathBuf::from(dir);
        }

        if let Some(program) = lookup("DLP_ANALYSIS_PROGRAM") {
            self.analysis.program = program;
        }

        if let Some(secs) = lookup("DLP_HTTP_TIMEOUT_SECS") {
            let secs = secs.trim().parse().map_err(|_| {
                DlpError::config(format!("DLP_HTTP_TIMEOUT_SECS must be a number of seconds, got '{}'", secs))
            })?;
            self.http.timeout_secs = Some(secs);
        }

        Ok(self)
    }

    /// Built-in resources with this configuration's paths and overrides applied
    pub fn resource_set(&self) -> Result<ResourceSet> {
        if let Some(unknown) = self
            .resources
            .keys()
            .find(|key| key.as_str() != DOGS_KEY && key.as_str() != XWALK_KEY)
        {
            return Err(DlpError::config(format!(
                "unknown resource '{}' (expected '{}' or '{}')",
                unknown, DOGS_KEY, XWALK_KEY
            )));
        }

        let mut dogs = resources::dog_licenses(&self.paths.data_dir);
        let mut xwalk = resources::zip_borough_crosswalk(&self.paths.data_dir);
        if let Some(o) = self.resources.get(DOGS_KEY) {
            o.apply(&mut dogs);
        }
        if let Some(o) = self.resources.get(XWALK_KEY) {
            o.apply(&mut xwalk);
        }

        ResourceSet::from_descriptors(dogs, xwalk)
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: self.http.timeout_secs.map(Duration::from_secs),
            user_agent: self
                .http
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    pub fn analysis_command(&self) -> AnalysisCommand {
        AnalysisCommand::new(self.analysis.program.clone(), self.analysis.args.clone())
    }
}
