//! Progress indicators for downloads
//!
//! Spinners draw to stderr and hide themselves when it is not a terminal,
//! so every state change is mirrored to the log as well.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{error, info};

/// Spinner for one in-flight download
pub struct DownloadProgress {
    bar: ProgressBar,
    label: String,
}

impl DownloadProgress {
    /// Show `downloading <label>` until finished
    pub fn start(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("downloading {}", label));
        bar.enable_steady_tick(Duration::from_millis(100));
        info!("downloading {}", label);

        Self {
            bar,
            label: label.to_string(),
        }
    }

    pub fn succeed(self, bytes: usize) {
        self.bar
            .finish_with_message(format!("✔ downloaded {} ({})", self.label, format_bytes(bytes as u64)));
        info!(bytes, "downloaded {}", self.label);
    }

    pub fn fail(self, reason: &dyn std::fmt::Display) {
        self.bar
            .abandon_with_message(format!("✖ failure downloading {}: {}", self.label, reason));
        error!(error = %reason, "failure downloading {}", self.label);
    }
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
