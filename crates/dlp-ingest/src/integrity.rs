//! Checksum verification of stored artifacts
//!
//! Verification only reads the stored bytes, so it can run any number of
//! times and concurrently with checks of other resources.

use crate::store::ContentStore;
use dlp_common::checksum::verify_checksum;
use dlp_common::{ResourceDescriptor, Result};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityChecker {
    store: ContentStore,
}

impl IntegrityChecker {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    /// Fail with [`DlpError::Integrity`](dlp_common::DlpError::Integrity) unless the
    /// artifact at `descriptor.local_path` hashes to `descriptor.expected_checksum`
    pub async fn verify(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        let bytes = self.store.read(&descriptor.local_path).await?;

        match verify_checksum(
            &descriptor.local_path,
            &bytes,
            &descriptor.expected_checksum,
            descriptor.algorithm,
        ) {
            Ok(()) => {
                info!(
                    resource = %descriptor.key,
                    algorithm = %descriptor.algorithm,
                    "hash of {} is as expected",
                    descriptor.label
                );
                Ok(())
            },
            Err(e) => {
                error!(resource = %descriptor.key, error = %e, "unexpected change in {}", descriptor.label);
                Err(e)
            },
        }
    }
}
