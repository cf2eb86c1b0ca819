//! External analysis invocation
//!
//! The statistical analysis is an opaque program. It runs in the foreground
//! with the caller's stdin/stdout/stderr, reads `data/`, and may write to
//! `target/`. Its exit status is captured in an [`AnalysisReport`] so the
//! caller decides whether a non-zero exit is fatal.

use async_trait::async_trait;
use dlp_common::{DlpError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tracing::{debug, info};

/// Program and arguments for the analysis step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl AnalysisCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for AnalysisCommand {
    fn default() -> Self {
        Self::new("Rscript", vec!["./analyze-dog-data.R".to_string()])
    }
}

impl std::fmt::Display for AnalysisCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How the analysis process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisReport {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl AnalysisReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the analysis program
#[async_trait]
pub trait AnalysisInvoker: Send + Sync {
    async fn invoke(&self, command: &AnalysisCommand) -> Result<AnalysisReport>;
}

/// Launches the analysis as a child process and waits for it
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

#[async_trait]
impl AnalysisInvoker for ProcessInvoker {
    async fn invoke(&self, command: &AnalysisCommand) -> Result<AnalysisReport> {
        run_external_analysis(command).await
    }
}

/// Run `command` synchronously with inherited stdio and report its exit code
pub async fn run_external_analysis(command: &AnalysisCommand) -> Result<AnalysisReport> {
    info!(command = %command, "Running analysis");

    let status = tokio::process::Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| DlpError::analysis(format!("failed to launch '{}': {}", command, e)))?;

    let report = AnalysisReport {
        exit_code: status.code(),
    };
    debug!(exit_code = ?report.exit_code, "Analysis exited");
    Ok(report)
}
