//! DLP Ingest Library
//!
//! Acquisition and verification of the pipeline's remote datasets.
//!
//! # Components
//!
//! - **store**: the only writer of downloaded artifacts
//! - **fetch**: single-shot HTTP retrieval of bytes or HTML documents
//! - **document** / **extract**: HTML querying and table extraction
//! - **download**: skip-if-present acquisition of one resource
//! - **integrity**: checksum verification of stored artifacts
//! - **resources**: the built-in dataset catalogue
//!
//! # Example
//!
//! ```no_run
//! use dlp_ingest::{download, fetch::HttpFetcher, resources::ResourceSet, store::ContentStore};
//!
//! #[tokio::main]
//! async fn main() -> dlp_common::Result<()> {
//!     let resources = ResourceSet::builtin("./data")?;
//!     let store = ContentStore::new();
//!     let fetcher = HttpFetcher::new(Default::default())?;
//!     for resource in resources.iter() {
//!         download::download(resource, &store, &fetcher).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod integrity;
pub mod progress;
pub mod resources;
pub mod store;

pub use document::Document;
pub use extract::{Extractor, Table, ZipBoroughExtractor};
pub use fetch::{Fetcher, HttpFetcher, HttpOptions};
pub use integrity::IntegrityChecker;
pub use resources::{Acquisition, Resource, ResourceSet};
pub use store::ContentStore;
