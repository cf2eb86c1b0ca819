//! Checksum utilities for artifact verification

use crate::error::{DlpError, Result};
use crate::types::ChecksumAlgorithm;
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;

/// Compute the lowercase hex digest of `data`
pub fn compute_checksum(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => format!("{:x}", md5::compute(data)),
        ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        ChecksumAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// Case-insensitive digest comparison
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Verify that `data` (stored at `path`) hashes to `expected`
pub fn verify_checksum(
    path: impl AsRef<Path>,
    data: &[u8],
    expected: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<()> {
    let actual = compute_checksum(data, algorithm);
    if digests_match(expected, &actual) {
        Ok(())
    } else {
        Err(DlpError::integrity(path, expected.to_lowercase(), actual))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_checksum_md5() {
        assert_eq!(
            compute_checksum(b"hello world", ChecksumAlgorithm::Md5),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            compute_checksum(b"", ChecksumAlgorithm::Md5),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_compute_checksum_sha256() {
        assert_eq!(
            compute_checksum(b"hello world", ChecksumAlgorithm::Sha256),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_verify_checksum_is_case_insensitive() {
        let result = verify_checksum(
            "data/x",
            b"hello world",
            "5EB63BBBE01EEED093CB22BB8F5ACDC3",
            ChecksumAlgorithm::Md5,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_checksum_failure() {
        let result = verify_checksum(
            "data/x",
            b"hello world",
            "00000000000000000000000000000000",
            ChecksumAlgorithm::Md5,
        );
        match result {
            Err(DlpError::Integrity { expected, actual, .. }) => {
                assert_eq!(expected, "00000000000000000000000000000000");
                assert_eq!(actual, "5eb63bbbe01eeed093cb22bb8f5acdc3");
            },
            other => panic!("expected integrity error, got {:?}", other),
        }
    }
}
