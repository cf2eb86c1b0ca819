//! DLP CLI - Main entry point

use clap::Parser;
use dlp_cli::{Cli, Pipeline, PipelineContext};
use dlp_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("dlp")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {:#}", e);
            log_config
        },
    };

    // The pipeline still runs without a subscriber
    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    let pipeline = match cli
        .resolve_config()
        .and_then(|config| PipelineContext::from_config(&config))
    {
        Ok(ctx) => Pipeline::new(ctx),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let outcome = pipeline.run(cli.target()).await;

    if outcome.is_failure() {
        for failure in outcome.failures() {
            eprintln!("Error: {}", failure);
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
