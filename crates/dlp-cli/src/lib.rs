//! DLP CLI Library
//!
//! Command-line driver for the NYC dog-license data pipeline.
//!
//! # Overview
//!
//! - **Setup**: create the `data/` and `target/` directories (`dlp setup`)
//! - **Download**: fetch the dog-license CSV and derive the zip/borough
//!   crosswalk, skipping anything already present (`dlp download`)
//! - **Check**: verify both artifacts against their expected digests (`dlp check`)
//! - **Analyze**: run the external analysis program (`dlp analyze`)
//! - **Clean**: remove the generated directories (`dlp clean`)
//!
//! Without a subcommand `dlp` runs setup, download, check and analyze in order.

pub mod analysis;
pub mod config;
pub mod pipeline;
pub mod stage;

pub use config::Config;
pub use dlp_common::{DlpError, Result};
pub use pipeline::{Pipeline, PipelineContext, Target};
pub use stage::{Outcome, Stage};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DLP - NYC dog-license data pipeline
#[derive(Parser, Debug)]
#[command(name = "dlp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target to run; `default` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./dlp.toml when present)
    #[arg(long, env = "DLP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for downloaded and derived data
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory reserved for analysis output
    #[arg(long, global = true)]
    pub target_dir: Option<PathBuf>,

    /// Fail when the analysis program exits non-zero
    #[arg(long, global = true)]
    pub strict_analysis: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Create the data and target directories
    Setup,

    /// Download both datasets unless already present
    Download,

    /// Verify the checksums of the downloaded datasets
    Check,

    /// Run the external analysis program
    Analyze,

    /// Remove the data and target directories
    ///
    /// Deletes both directories recursively without asking.
    Clean,

    /// Run setup, download, check and analyze in order
    Default,
}

impl From<Commands> for Target {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Setup => Target::Setup,
            Commands::Download => Target::Download,
            Commands::Check => Target::Check,
            Commands::Analyze => Target::Analyze,
            Commands::Clean => Target::Clean,
            Commands::Default => Target::Default,
        }
    }
}

impl Cli {
    pub fn target(&self) -> Target {
        self.command.map(Target::from).unwrap_or(Target::Default)
    }

    /// Resolve the configuration: file, then environment, then these flags
    pub fn resolve_config(&self) -> Result<Config> {
        let config = Config::load(self.config.as_deref())?.with_env_overrides()?;
        Ok(self.apply_flags(config))
    }

    fn apply_flags(&self, mut config: Config) -> Config {
        if let Some(ref dir) = self.data_dir {
            config.paths.data_dir = dir.clone();
        }
        if let Some(ref dir) = self.target_dir {
            config.paths.target_dir = dir.clone();
        }
        if self.strict_analysis {
            config.analysis.fail_on_nonzero = true;
        }
        config
    }
}
