//! Search request and response models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{AccessionNumber, Document};
use crate::utils::{
    check_range, validate_query, ValidationError, DAYS_BACK_RANGE, MAX_PAGES_RANGE, TOP_N_RANGE,
};

/// Relative "added to ADAMS" window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddedPeriod {
    Today,
    ThisWeek,
    ThisMonth,
}

impl AddedPeriod {
    /// First day included in the window, relative to `today`.
    ///
    /// Weeks start on Monday.
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            AddedPeriod::Today => today,
            AddedPeriod::ThisWeek => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            AddedPeriod::ThisMonth => today.with_day(1).unwrap_or(today),
        }
    }
}

impl FromStr for AddedPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(AddedPeriod::Today),
            "this_week" | "week" => Ok(AddedPeriod::ThisWeek),
            "this_month" | "month" => Ok(AddedPeriod::ThisMonth),
            other => Err(ValidationError::InvalidArgument(format!(
                "added_period must be one of today, this_week, this_month (got '{}')",
                other
            ))),
        }
    }
}

/// Optional metadata filters applied by the primary source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact document type, e.g. "Inspection Report"
    pub document_type: Option<String>,

    /// Docket number prefix, e.g. "05000373"
    pub docket_number: Option<String>,

    /// Earliest document date (inclusive)
    pub date_from: Option<NaiveDate>,

    /// Latest document date (inclusive)
    pub date_to: Option<NaiveDate>,

    /// Additional APS property filters (property name -> substring)
    pub properties: BTreeMap<String, String>,
}

impl SearchFilters {
    pub fn has_date_range(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }
}

/// A validated hybrid search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,

    /// Maximum number of primary result pages to fetch
    pub max_pages: usize,

    /// Maximum number of merged results to return
    pub top_n: usize,

    /// Whether to also query the secondary source
    pub use_secondary: bool,

    /// Metadata filters
    pub filters: SearchFilters,

    /// Only documents added within this window
    pub added_period: Option<AddedPeriod>,

    /// Only documents added within the last N days
    pub days_back: Option<u32>,
}

impl SearchRequest {
    /// Create a request with default paging (1 page, top 5, secondary enabled)
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_pages: 1,
            top_n: 5,
            use_secondary: true,
            filters: SearchFilters::default(),
            added_period: None,
            days_back: None,
        }
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn use_secondary(mut self, enabled: bool) -> Self {
        self.use_secondary = enabled;
        self
    }

    pub fn document_type(mut self, document_type: impl Into<String>) -> Self {
        self.filters.document_type = Some(document_type.into());
        self
    }

    pub fn docket_number(mut self, docket: impl Into<String>) -> Self {
        self.filters.docket_number = Some(docket.into());
        self
    }

    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.filters.date_from = from;
        self.filters.date_to = to;
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.properties.insert(name.into(), value.into());
        self
    }

    pub fn added_period(mut self, period: AddedPeriod) -> Self {
        self.added_period = Some(period);
        self
    }

    pub fn days_back(mut self, days: u32) -> Self {
        self.days_back = Some(days);
        self
    }

    /// Check every field and normalize the query.
    ///
    /// Returns the first violation found; nothing is clamped.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.query = validate_query(&self.query)?;
        check_range("max_pages", self.max_pages as i64, MAX_PAGES_RANGE)?;
        check_range("top_n", self.top_n as i64, TOP_N_RANGE)?;

        if let Some(days) = self.days_back {
            check_range("days_back", i64::from(days), DAYS_BACK_RANGE)?;
        }

        if let (Some(from), Some(to)) = (self.filters.date_from, self.filters.date_to) {
            if from > to {
                return Err(ValidationError::InvalidDateRange { from, to });
            }
        }

        Ok(self)
    }
}

/// Why the secondary source contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    /// No credentials configured
    Unconfigured,
    /// Provider reported quota or rate-limit exhaustion
    QuotaExceeded,
    /// Any other failure (transport, HTTP error, unparseable body)
    NetworkError,
}

impl fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DegradationReason::Unconfigured => "unconfigured",
            DegradationReason::QuotaExceeded => "quota_exceeded",
            DegradationReason::NetworkError => "network_error",
        };
        f.write_str(s)
    }
}

/// Outcome of the secondary source for one hybrid search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SecondaryStatus {
    /// Not requested by the caller
    Disabled,
    /// Queried successfully (possibly with zero hits)
    Ok,
    /// Requested but degraded to an empty result
    Degraded(DegradationReason),
}

/// Documents returned by one adapter plus any non-fatal warnings
#[derive(Debug, Clone, Default)]
pub struct SourceResults {
    pub documents: Vec<Document>,
    pub warnings: Vec<String>,
}

impl SourceResults {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Merged hybrid search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Merged, deduplicated results (primary first)
    pub results: Vec<Document>,

    /// Number of results returned
    pub returned: usize,

    /// Results contributed by the primary source after merging
    pub primary_count: usize,

    /// Results contributed by the secondary source after merging
    pub secondary_count: usize,

    /// Non-fatal problems encountered while searching
    pub warnings: Vec<String>,

    /// What happened to the secondary source
    pub secondary_status: SecondaryStatus,
}

impl SearchOutcome {
    pub fn new(
        results: Vec<Document>,
        warnings: Vec<String>,
        secondary_status: SecondaryStatus,
    ) -> Self {
        let primary_count = results
            .iter()
            .filter(|d| d.source == crate::models::DocumentSource::Primary)
            .count();
        let returned = results.len();

        Self {
            secondary_count: returned - primary_count,
            returned,
            primary_count,
            results,
            warnings,
            secondary_status,
        }
    }
}

/// Result of a download operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Accession number of the downloaded document
    pub accession_number: AccessionNumber,

    /// Where the PDF was saved
    pub path: String,

    /// Number of bytes written
    pub size_bytes: u64,

    /// URL the PDF was fetched from
    pub url: String,
}

/// Result of one item in a batch download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub accession_number: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn success(result: &DownloadResult) -> Self {
        Self {
            accession_number: result.accession_number.to_string(),
            success: true,
            path: Some(result.path.clone()),
            size_bytes: Some(result.size_bytes),
            error: None,
        }
    }

    pub fn failure(accession_number: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            accession_number: accession_number.into(),
            success: false,
            path: None,
            size_bytes: None,
            error: Some(error.into()),
        }
    }
}

/// Result of a batch download operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDownloadResult {
    /// Individual download results, in request order
    pub results: Vec<BatchItemResult>,

    /// Total number of successful downloads
    pub successful: usize,

    /// Total number of failed downloads
    pub failed: usize,

    /// Total bytes downloaded
    pub total_bytes: u64,
}

impl BatchDownloadResult {
    pub fn new(results: Vec<BatchItemResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        let total_bytes = results.iter().filter_map(|r| r.size_bytes).sum();

        Self {
            results,
            successful,
            failed,
            total_bytes,
        }
    }

    /// Check if all downloads succeeded (and there was at least one)
    pub fn is_all_success(&self) -> bool {
        !self.results.is_empty() && self.failed == 0
    }
}

/// Text extracted from a PDF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSummary {
    /// Extracted text, at most `max_chars` characters
    pub text: String,

    /// Number of pages in the document
    pub total_pages: usize,

    /// Characters in the full normalized text
    pub total_chars: usize,

    /// Characters in `text`
    pub extracted_chars: usize,

    /// Path of the PDF that was read
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentBuilder, DocumentSource};

    #[test]
    fn test_search_request_defaults() {
        let request = SearchRequest::new("reactor").validate().unwrap();
        assert_eq!(request.max_pages, 1);
        assert_eq!(request.top_n, 5);
        assert!(request.use_secondary);
    }

    #[test]
    fn test_search_request_trims_query() {
        let request = SearchRequest::new("  steam generator  ").validate().unwrap();
        assert_eq!(request.query, "steam generator");
    }

    #[test]
    fn test_search_request_rejects_out_of_range() {
        let err = SearchRequest::new("reactor")
            .max_pages(11)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "max_pages",
                ..
            }
        ));

        assert!(SearchRequest::new("reactor").top_n(0).validate().is_err());
        assert!(SearchRequest::new("reactor").top_n(51).validate().is_err());
        assert!(SearchRequest::new("reactor").days_back(0).validate().is_err());
    }

    #[test]
    fn test_search_request_rejects_inverted_dates() {
        let from = NaiveDate::from_ymd_opt(2024, 6, 1);
        let to = NaiveDate::from_ymd_opt(2024, 1, 1);
        let err = SearchRequest::new("reactor")
            .date_range(from, to)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_added_period_start_date() {
        // 2024-05-15 is a Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(AddedPeriod::Today.start_date(today), today);
        assert_eq!(
            AddedPeriod::ThisWeek.start_date(today),
            NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
        );
        assert_eq!(
            AddedPeriod::ThisMonth.start_date(today),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_added_period_parse() {
        assert_eq!("today".parse::<AddedPeriod>().unwrap(), AddedPeriod::Today);
        assert_eq!(
            "This_Week".parse::<AddedPeriod>().unwrap(),
            AddedPeriod::ThisWeek
        );
        assert!("yesterday".parse::<AddedPeriod>().is_err());
    }

    #[test]
    fn test_search_outcome_counts() {
        let results = vec![
            DocumentBuilder::new("A", DocumentSource::Primary).build(),
            DocumentBuilder::new("B", DocumentSource::Primary).build(),
            DocumentBuilder::new("C", DocumentSource::Secondary).build(),
        ];
        let outcome = SearchOutcome::new(results, vec![], SecondaryStatus::Ok);
        assert_eq!(outcome.returned, 3);
        assert_eq!(outcome.primary_count, 2);
        assert_eq!(outcome.secondary_count, 1);
    }

    #[test]
    fn test_secondary_status_serialization() {
        let json = serde_json::to_value(SecondaryStatus::Degraded(
            DegradationReason::QuotaExceeded,
        ))
        .unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "quota_exceeded");

        let json = serde_json::to_value(SecondaryStatus::Disabled).unwrap();
        assert_eq!(json["status"], "disabled");
    }

    #[test]
    fn test_batch_download_result() {
        let ok = DownloadResult {
            accession_number: AccessionNumber::parse("ML12345A678").unwrap(),
            path: "downloads/ML12345A678.pdf".to_string(),
            size_bytes: 1024,
            url: "https://www.nrc.gov/docs/ML1234/ML12345A678.pdf".to_string(),
        };
        let batch = BatchDownloadResult::new(vec![
            BatchItemResult::success(&ok),
            BatchItemResult::failure("ML99999Z999", "not found"),
        ]);

        assert_eq!(batch.successful, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.total_bytes, 1024);
        assert!(!batch.is_all_success());
    }
}
