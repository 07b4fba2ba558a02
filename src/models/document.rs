//! Document model representing one ADAMS search result from either source.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::DownloadResult;
use crate::sources::{AdamsSource, SourceError};
use crate::utils::{validate_accession_number, ValidationError};

/// A validated, upper-cased ADAMS accession number (e.g. `ML12345A678`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessionNumber(String);

impl AccessionNumber {
    /// Parse and normalize an accession number
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        validate_accession_number(value).map(Self)
    }

    /// Find the first accession number embedded in free text such as a URL
    pub fn find_in(text: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(?i)\b(ML[0-9A-Z]{6,12})\b").expect("accession pattern is valid")
        });

        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Self::parse(m.as_str()).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The six-character folder ADAMS files the PDF under (`ML1234` for `ML12345A678`)
    pub fn folder(&self) -> &str {
        &self.0[..6]
    }

    /// File name used for downloaded copies
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.0)
    }
}

impl fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccessionNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccessionNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccessionNumber> for String {
    fn from(value: AccessionNumber) -> Self {
        value.0
    }
}

/// Which adapter produced a document. Primary results win merge conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// The ADAMS Public Search API
    Primary,
    /// Google Custom Search scoped to the NRC web domain
    Secondary,
}

impl DocumentSource {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentSource::Primary => "ADAMS API",
            DocumentSource::Secondary => "Google",
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One search result.
///
/// Documents are built by a source adapter from a single response record and are
/// not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document title
    pub title: String,

    /// Accession number, when the record carried a well-formed one
    pub accession_number: Option<AccessionNumber>,

    /// Document date
    pub document_date: Option<NaiveDate>,

    /// Free-text document category (e.g. "Inspection Report")
    pub document_type: Option<String>,

    /// Direct download link reported by the source
    pub download_url: Option<String>,

    /// Adapter that produced this record
    pub source: DocumentSource,

    /// Date the document was added to ADAMS (as reported)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,

    /// Docket numbers (comma-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docket_number: Option<String>,

    /// Author names (comma-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// Estimated page count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    /// Search snippet (secondary results only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Document {
    /// Create a new document with the required fields
    pub fn new(title: impl Into<String>, source: DocumentSource) -> Self {
        Self {
            title: title.into(),
            accession_number: None,
            document_date: None,
            document_type: None,
            download_url: None,
            source,
            added_date: None,
            docket_number: None,
            author_name: None,
            page_count: None,
            snippet: None,
        }
    }

    /// Download this document's PDF into `directory` as `<ACCESSION>.pdf`.
    ///
    /// Fails with a descriptive error if the document has no accession number.
    pub async fn download(
        &self,
        source: &AdamsSource,
        directory: &Path,
    ) -> Result<DownloadResult, SourceError> {
        let accession = self.accession_number.as_ref().ok_or_else(|| {
            SourceError::InvalidRequest(format!(
                "Document '{}' has no accession number; cannot download",
                self.title
            ))
        })?;

        source
            .download(accession, self.download_url.as_deref(), directory)
            .await
    }
}

/// Builder for constructing Document objects
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new(title: impl Into<String>, source: DocumentSource) -> Self {
        Self {
            document: Document::new(title, source),
        }
    }

    pub fn accession_number(mut self, accession: AccessionNumber) -> Self {
        self.document.accession_number = Some(accession);
        self
    }

    pub fn document_date(mut self, date: Option<NaiveDate>) -> Self {
        self.document.document_date = date;
        self
    }

    pub fn document_type(mut self, document_type: Option<String>) -> Self {
        self.document.document_type = document_type.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn download_url(mut self, url: Option<String>) -> Self {
        self.document.download_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn added_date(mut self, added: Option<String>) -> Self {
        self.document.added_date = added.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn docket_number(mut self, docket: Option<String>) -> Self {
        self.document.docket_number = docket.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn author_name(mut self, author: Option<String>) -> Self {
        self.document.author_name = author.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn page_count(mut self, pages: Option<u32>) -> Self {
        self.document.page_count = pages;
        self
    }

    pub fn snippet(mut self, snippet: Option<String>) -> Self {
        self.document.snippet = snippet.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

/// Parse the date formats ADAMS uses across its JSON and XML APIs.
///
/// Accepts `2024-01-15`, `2024-01-15T08:30:00` (with optional fraction/zone
/// suffix) and `01/15/2024` (optionally followed by a time).
pub fn parse_document_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }

    // Anything longer that still starts with an ISO date, e.g. "2024-01-15T08:30:00.000Z"
    if let Some(prefix) = value.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let us_date = value.split_whitespace().next().unwrap_or(value);
    NaiveDate::parse_from_str(us_date, "%m/%d/%Y").ok()
}
