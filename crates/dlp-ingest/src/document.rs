//! Fetched HTML documents

use dlp_common::{DlpError, Result};
use scraper::{Html, Selector};

/// An HTML page retrieved by a [`Fetcher`](crate::fetch::Fetcher).
///
/// The raw markup is kept as text and parsed on demand, so a `Document` can
/// be moved across tasks freely.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    html: String,
}

impl Document {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Decode a response body as UTF-8, replacing invalid sequences with U+FFFD
    pub fn from_bytes(url: &str, body: Vec<u8>) -> Self {
        let html = match String::from_utf8(body) {
            Ok(html) => html,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Self::new(url, html)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Text content of every element matching `css`, in document order
    pub fn select_text(&self, css: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(css)
            .map_err(|e| DlpError::extraction(format!("invalid selector '{}': {}", css, e)))?;
        let parsed = Html::parse_document(&self.html);

        Ok(parsed
            .select(&selector)
            .map(|element| element.text().collect::<String>())
            .collect())
    }
}
