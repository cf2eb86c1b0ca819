//! The datasets the pipeline acquires
//!
//! Two resources are built in: the NYC dog licensing dataset, stored exactly
//! as fetched, and a zip code to borough crosswalk scraped from an HTML page.

use crate::extract::{Extractor, ZipBoroughExtractor};
use dlp_common::{DlpError, ResourceDescriptor, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub const DOGS_KEY: &str = "dogs";
pub const DOGS_URL: &str = "https://data.cityofnewyork.us/api/views/nu7n-tubp/rows.csv";
pub const DOGS_MD5: &str = "f214985644c8b2ade4f8cdc30667aa3e";
pub const DOGS_FILE: &str = "dogs.csv";
pub const DOGS_LABEL: &str = "Dog License Data from NYC Open Portal";

pub const XWALK_KEY: &str = "xwalk";
pub const XWALK_URL: &str = "https://www.nycbynatives.com/nyc_info/new_york_city_zip_codes.php";
pub const XWALK_MD5: &str = "02bd1d96a157e20c0268a0d2351fefcf";
pub const XWALK_FILE: &str = "zip-boro-xwalk.csv";
pub const XWALK_LABEL: &str = "Zip <-> Borough data from nycbynatives.com";

/// Descriptor for the dog licensing dataset stored under `data_dir`
pub fn dog_licenses(data_dir: impl AsRef<Path>) -> ResourceDescriptor {
    ResourceDescriptor::new(
        DOGS_KEY,
        DOGS_URL,
        DOGS_MD5,
        data_dir.as_ref().join(DOGS_FILE),
        DOGS_LABEL,
    )
}

/// Descriptor for the zip/borough crosswalk stored under `data_dir`
pub fn zip_borough_crosswalk(data_dir: impl AsRef<Path>) -> ResourceDescriptor {
    ResourceDescriptor::new(
        XWALK_KEY,
        XWALK_URL,
        XWALK_MD5,
        data_dir.as_ref().join(XWALK_FILE),
        XWALK_LABEL,
    )
}

/// How a resource's stored bytes are produced
#[derive(Debug, Clone)]
pub enum Acquisition {
    /// Store the response body as-is
    Raw,
    /// Parse the response as HTML and store the extracted table
    Extracted(Arc<dyn Extractor>),
}

/// A descriptor paired with its acquisition mode
#[derive(Debug, Clone)]
pub struct Resource {
    pub descriptor: Arc<ResourceDescriptor>,
    pub acquisition: Acquisition,
}

impl Resource {
    pub fn raw(descriptor: ResourceDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            acquisition: Acquisition::Raw,
        }
    }

    pub fn extracted(descriptor: ResourceDescriptor, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            acquisition: Acquisition::Extracted(extractor),
        }
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }
}

/// Validated, ordered collection of resources
#[derive(Debug, Clone)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    /// Build a set; keys and local paths must be unique and checksums well-formed
    pub fn new(resources: Vec<Resource>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut paths = HashSet::new();

        for resource in &resources {
            let descriptor = &resource.descriptor;
            descriptor.validate()?;

            if !keys.insert(descriptor.key.clone()) {
                return Err(DlpError::config(format!(
                    "Duplicate resource key '{}'",
                    descriptor.key
                )));
            }
            if !paths.insert(descriptor.local_path.clone()) {
                return Err(DlpError::config(format!(
                    "Resources share the local path '{}'",
                    descriptor.local_path.display()
                )));
            }
        }

        Ok(Self { resources })
    }

    /// The two built-in datasets, in download order
    pub fn builtin(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_descriptors(dog_licenses(&data_dir), zip_borough_crosswalk(&data_dir))
    }

    /// Pair (possibly overridden) descriptors with their built-in acquisition modes
    pub fn from_descriptors(dogs: ResourceDescriptor, xwalk: ResourceDescriptor) -> Result<Self> {
        Self::new(vec![
            Resource::raw(dogs),
            Resource::extracted(xwalk, Arc::new(ZipBoroughExtractor::new())),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.key() == key)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
