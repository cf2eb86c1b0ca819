//! DLP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the dog-license data pipeline.
//!
//! # Overview
//!
//! This crate provides common functionality used across all DLP workspace members:
//!
//! - **Error Handling**: The pipeline error type and result alias
//! - **Checksums**: Content digests used for integrity verification
//! - **Types**: Resource descriptors and checksum algorithms
//! - **Logging**: Subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use dlp_common::checksum::compute_checksum;
//! use dlp_common::types::ChecksumAlgorithm;
//!
//! let digest = compute_checksum(b"zip,boro\n", ChecksumAlgorithm::Md5);
//! assert_eq!(digest.len(), 32);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DlpError, Result};
pub use types::{ChecksumAlgorithm, ResourceDescriptor};
