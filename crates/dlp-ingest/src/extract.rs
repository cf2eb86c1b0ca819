//! Table extraction from fetched documents
//!
//! An [`Extractor`] turns a [`Document`] into a [`Table`], which is stored as
//! comma-delimited text. Extractors depend on a third-party page layout, so
//! every layout assumption they make is checked and reported as an
//! extraction error rather than producing a silently misaligned table.

use crate::document::Document;
use dlp_common::{DlpError, Result};

/// Header row followed by data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize as CSV with `\n` line endings, header first
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(&self.header)
            .map_err(|e| DlpError::extraction(format!("failed to write header: {}", e)))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| DlpError::extraction(format!("failed to write row: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| DlpError::extraction(format!("failed to finish table: {}", e)))
    }
}

/// Transform from a fetched document to tabular output
pub trait Extractor: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn extract(&self, document: &Document) -> Result<Table>;
}

/// One zip code and the borough it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipBorough {
    pub zip: String,
    pub borough: String,
}

/// Extracts the zip/borough crosswalk from the nycbynatives.com zip code page.
///
/// The page lays pairs out side by side: zip in columns 1 and 4, borough in
/// columns 2 and 5. Both column sets are collected in document order and the
/// Nth zip is paired with the Nth borough.
#[derive(Debug, Clone)]
pub struct ZipBoroughExtractor {
    zip_selector: String,
    borough_selector: String,
}

impl Default for ZipBoroughExtractor {
    fn default() -> Self {
        Self {
            zip_selector: "td:nth-child(1), td:nth-child(4)".to_string(),
            borough_selector: "td:nth-child(2), td:nth-child(5)".to_string(),
        }
    }
}

impl ZipBoroughExtractor {
    pub const HEADER: [&'static str; 2] = ["zip", "boro"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily pair zip cells with borough cells, trimming both
    pub fn rows(&self, document: &Document) -> Result<impl Iterator<Item = ZipBorough>> {
        let zips = document.select_text(&self.zip_selector)?;
        let boroughs = document.select_text(&self.borough_selector)?;

        if zips.len() != boroughs.len() {
            return Err(DlpError::extraction(format!(
                "column layout changed at {}: found {} zip cells but {} borough cells",
                document.url(),
                zips.len(),
                boroughs.len()
            )));
        }

        Ok(zips
            .into_iter()
            .zip(boroughs)
            .map(|(zip, borough)| ZipBorough {
                zip: zip.trim().to_string(),
                borough: borough.trim().to_string(),
            }))
    }
}

impl Extractor for ZipBoroughExtractor {
    fn name(&self) -> &str {
        "zip-borough"
    }

    fn extract(&self, document: &Document) -> Result<Table> {
        let mut table = Table::new(&Self::HEADER);
        for pair in self.rows(document)? {
            table.push(vec![pair.zip, pair.borough]);
        }
        Ok(table)
    }
}
