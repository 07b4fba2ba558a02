//! Tool handlers for the ADAMS tools.
//!
//! Arguments are validated here, before any network or filesystem access.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use super::tools::{ToolError, ToolHandler};
use crate::config::{Config, PdfConfig};
use crate::models::{
    AccessionNumber, AddedPeriod, BatchDownloadResult, BatchItemResult, SearchRequest,
};
use crate::sources::{AdamsSource, GoogleSource, HybridSearch, Source, SourceError};
use crate::utils::{
    check_range, ensure_within, extract_text_blocking, parse_date, HttpClient, ValidationError,
    DAYS_BACK_RANGE, MAX_BATCH_SIZE, MAX_CHARS_RANGE, MAX_PAGES_RANGE, TOP_N_RANGE,
};

const DEFAULT_MAX_PAGES: i64 = 1;
const DEFAULT_TOP_N: i64 = 5;

/// Everything the tool handlers share
#[derive(Debug, Clone)]
pub struct ToolContext {
    adams: Arc<AdamsSource>,
    hybrid: HybridSearch,
    downloads_dir: PathBuf,
    default_max_chars: usize,
    restrict_to_downloads: bool,
}

impl ToolContext {
    /// Context searching `adams` as the primary source and `secondary` alongside it
    pub fn new(adams: Arc<AdamsSource>, secondary: Arc<dyn Source>) -> Self {
        let pdf = PdfConfig::default();
        Self {
            hybrid: HybridSearch::new(adams.clone(), secondary),
            adams,
            downloads_dir: PathBuf::from("./downloads"),
            default_max_chars: pdf.default_max_chars,
            restrict_to_downloads: pdf.restrict_to_downloads,
        }
    }

    /// Build the production sources from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let http = Arc::new(HttpClient::new(
            Duration::from_secs(config.adams.timeout_secs),
            config.rate_limits.quota(),
        )?);

        let adams = Arc::new(AdamsSource::from_config(http.clone(), config));
        let google = GoogleSource::from_config(http, config);
        if !google.is_configured() {
            tracing::info!("Google credentials not set; secondary search disabled");
        }

        Ok(Self::new(adams, Arc::new(google))
            .with_downloads_dir(&config.downloads.directory)
            .with_pdf_config(&config.pdf))
    }

    pub fn with_downloads_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.downloads_dir = directory.into();
        self
    }

    pub fn with_pdf_config(mut self, pdf: &PdfConfig) -> Self {
        self.default_max_chars = pdf.default_max_chars;
        self.restrict_to_downloads = pdf.restrict_to_downloads;
        self
    }

    pub fn adams(&self) -> &AdamsSource {
        &self.adams
    }

    pub fn hybrid(&self) -> &HybridSearch {
        &self.hybrid
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    fn directory_arg(&self, args: &Value) -> Result<PathBuf, ValidationError> {
        Ok(optional_str(args, "directory")?
            .map(PathBuf::from)
            .unwrap_or_else(|| self.downloads_dir.clone()))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use crate::models::DocumentSource;
        use crate::sources::MockSource;

        let http = Arc::new(HttpClient::new(crate::utils::DEFAULT_TIMEOUT, None).unwrap());
        let adams = AdamsSource::new(http).with_base_url("http://127.0.0.1:9/search");
        Self::new(
            Arc::new(adams),
            Arc::new(MockSource::new(DocumentSource::Secondary)),
        )
    }
}

fn invalid(message: String) -> ValidationError {
    ValidationError::InvalidArgument(message)
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, ValidationError> {
    match args.get(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(invalid(format!("Missing '{}' parameter", field))),
        Some(_) => Err(invalid(format!("'{}' must be a string", field))),
    }
}

/// A string argument; empty strings count as absent
fn optional_str<'a>(args: &'a Value, field: &str) -> Result<Option<&'a str>, ValidationError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(_) => Err(invalid(format!("'{}' must be a string", field))),
    }
}

fn optional_int(args: &Value, field: &str) -> Result<Option<i64>, ValidationError> {
    let Some(value) = args.get(field).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .map(Some)
        .ok_or_else(|| invalid(format!("'{}' must be an integer", field)))
}

fn optional_bool(args: &Value, field: &str) -> Result<Option<bool>, ValidationError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(format!("'{}' must be a boolean", field))),
    }
}

fn property_filters(args: &Value) -> Result<Map<String, Value>, ValidationError> {
    match args.get("filters") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(invalid("'filters' must be an object".to_string())),
    }
}

/// Turn tool arguments into a validated [`SearchRequest`]
pub fn parse_search_args(args: &Value) -> Result<SearchRequest, ValidationError> {
    let query = required_str(args, "query")?;

    let max_pages = check_range(
        "max_pages",
        optional_int(args, "max_pages")?.unwrap_or(DEFAULT_MAX_PAGES),
        MAX_PAGES_RANGE,
    )?;

    // `max_results` is accepted as an alias for `top_n`
    let top_n = match optional_int(args, "top_n")? {
        Some(n) => n,
        None => optional_int(args, "max_results")?.unwrap_or(DEFAULT_TOP_N),
    };
    let top_n = check_range("top_n", top_n, TOP_N_RANGE)?;

    let mut request = SearchRequest::new(query)
        .max_pages(max_pages as usize)
        .top_n(top_n as usize)
        .use_secondary(optional_bool(args, "use_google")?.unwrap_or(true));

    if let Some(document_type) = optional_str(args, "document_type")? {
        request = request.document_type(document_type);
    }
    if let Some(docket) = optional_str(args, "docket_number")? {
        request = request.docket_number(docket);
    }

    let date_from = optional_str(args, "date_from")?
        .map(|s| parse_date("date_from", s))
        .transpose()?;
    let date_to = optional_str(args, "date_to")?
        .map(|s| parse_date("date_to", s))
        .transpose()?;
    if date_from.is_some() || date_to.is_some() {
        request = request.date_range(date_from, date_to);
    }

    if let Some(period) = optional_str(args, "added_period")? {
        request = request.added_period(period.parse::<AddedPeriod>()?);
    }
    if let Some(days) = optional_int(args, "days_back")? {
        let days = check_range("days_back", days, DAYS_BACK_RANGE)?;
        request = request.days_back(days as u32);
    }

    for (name, value) in property_filters(args)? {
        let value = value
            .as_str()
            .ok_or_else(|| invalid(format!("filter '{}' must be a string", name)))?;
        if !value.trim().is_empty() {
            request = request.property(name, value.trim());
        }
    }

    request.validate()
}

/// Handler for `search_adams`
#[derive(Debug)]
pub struct SearchHandler {
    pub context: Arc<ToolContext>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let request = parse_search_args(&args)?;
        let outcome = self.context.hybrid.search(request).await?;
        Ok(serde_json::to_value(outcome)?)
    }
}

/// Handler for `download_adams`
#[derive(Debug)]
pub struct DownloadHandler {
    pub context: Arc<ToolContext>,
}

#[async_trait::async_trait]
impl ToolHandler for DownloadHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let accession = AccessionNumber::parse(required_str(&args, "accession_number")?)?;
        let directory = self.context.directory_arg(&args)?;

        let result = self
            .context
            .adams
            .download_accession(&accession, &directory)
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Handler for `download_adams_batch`
#[derive(Debug)]
pub struct DownloadBatchHandler {
    pub context: Arc<ToolContext>,
}

#[async_trait::async_trait]
impl ToolHandler for DownloadBatchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let items = match args.get("accession_numbers") {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => {
                return Err(invalid("Missing 'accession_numbers' parameter".to_string()).into())
            }
            Some(_) => return Err(invalid("'accession_numbers' must be an array".to_string()).into()),
        };

        if items.is_empty() {
            return Err(invalid("'accession_numbers' cannot be empty".to_string()).into());
        }
        if items.len() > MAX_BATCH_SIZE {
            return Err(ValidationError::TooManyItems {
                count: items.len(),
                max: MAX_BATCH_SIZE,
            }
            .into());
        }

        let directory = self.context.directory_arg(&args)?;
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            let Some(raw) = item.as_str() else {
                results.push(BatchItemResult::failure(
                    item.to_string(),
                    "accession number must be a string",
                ));
                continue;
            };

            let accession = match AccessionNumber::parse(raw) {
                Ok(accession) => accession,
                Err(e) => {
                    results.push(BatchItemResult::failure(raw, e.to_string()));
                    continue;
                }
            };

            match self.context.adams.download_accession(&accession, &directory).await {
                Ok(result) => results.push(BatchItemResult::success(&result)),
                Err(e) => results.push(BatchItemResult::failure(accession.as_str(), e.to_string())),
            }
        }

        let batch = BatchDownloadResult::new(results);
        if batch.is_all_success() {
            tracing::info!("Batch download finished: all {} succeeded", batch.successful);
        } else {
            tracing::warn!(
                "Batch download finished: {} succeeded, {} failed",
                batch.successful,
                batch.failed
            );
        }
        Ok(serde_json::to_value(batch)?)
    }
}

/// Handler for `get_document`
#[derive(Debug)]
pub struct GetDocumentHandler {
    pub context: Arc<ToolContext>,
}

#[async_trait::async_trait]
impl ToolHandler for GetDocumentHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let accession = AccessionNumber::parse(required_str(&args, "accession_number")?)?;

        match self.context.adams.get_document(&accession).await? {
            Some(document) => Ok(serde_json::to_value(document)?),
            None => Err(ToolError::NotFound(format!(
                "Document {} not found in ADAMS",
                accession
            ))),
        }
    }
}

/// Handler for `summarize_pdf`
#[derive(Debug)]
pub struct SummarizePdfHandler {
    pub context: Arc<ToolContext>,
}

#[async_trait::async_trait]
impl ToolHandler for SummarizePdfHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let path = PathBuf::from(required_str(&args, "path")?);
        let max_chars = match optional_int(&args, "max_chars")? {
            Some(n) => n,
            None => self.context.default_max_chars as i64,
        };
        let max_chars = check_range("max_chars", max_chars, MAX_CHARS_RANGE)?;

        if self.context.restrict_to_downloads {
            ensure_within(&path, &self.context.downloads_dir)?;
        }

        let summary = extract_text_blocking(path, max_chars as usize).await?;
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::PdfExtractError;
    use serde_json::json;

    #[test]
    fn test_parse_search_defaults() {
        let request = parse_search_args(&json!({ "query": "  steam generator " })).unwrap();
        assert_eq!(request.query, "steam generator");
        assert_eq!(request.max_pages, 1);
        assert_eq!(request.top_n, 5);
        assert!(request.use_secondary);
        assert!(request.added_period.is_none());
    }

    #[test]
    fn test_parse_search_full() {
        let request = parse_search_args(&json!({
            "query": "reactor vessel",
            "max_pages": 3,
            "top_n": 20,
            "use_google": false,
            "document_type": "Inspection Report",
            "docket_number": "05000",
            "date_from": "2020-01-01",
            "date_to": "2020-12-31",
            "added_period": "this_week",
            "days_back": 30,
            "filters": { "AuthorName": "Smith" }
        }))
        .unwrap();

        assert_eq!(request.max_pages, 3);
        assert_eq!(request.top_n, 20);
        assert!(!request.use_secondary);
        assert_eq!(
            request.filters.document_type.as_deref(),
            Some("Inspection Report")
        );
        assert_eq!(request.filters.docket_number.as_deref(), Some("05000"));
        assert!(request.filters.has_date_range());
        assert_eq!(request.added_period, Some(AddedPeriod::ThisWeek));
        assert_eq!(request.days_back, Some(30));
        assert_eq!(
            request.filters.properties.get("AuthorName").map(String::as_str),
            Some("Smith")
        );
    }

    #[test]
    fn test_max_results_alias() {
        let request = parse_search_args(&json!({ "query": "reactor", "max_results": 12 })).unwrap();
        assert_eq!(request.top_n, 12);

        let request =
            parse_search_args(&json!({ "query": "reactor", "max_results": 12, "top_n": 3 }))
                .unwrap();
        assert_eq!(request.top_n, 3);
    }

    #[test]
    fn test_parse_search_rejects_bad_arguments() {
        assert_eq!(
            parse_search_args(&json!({ "query": "" })).unwrap_err(),
            ValidationError::EmptyQuery
        );
        assert!(parse_search_args(&json!({})).is_err());
        assert!(parse_search_args(&json!({ "query": 42 })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "max_pages": 0 })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "max_pages": -1 })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "top_n": 51 })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "top_n": "ten" })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "use_google": "yes" })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "date_from": "01/02/2020" })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "added_period": "yesterday" })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "days_back": 0 })).is_err());
        assert!(parse_search_args(&json!({ "query": "reactor", "filters": ["a"] })).is_err());
        assert!(parse_search_args(&json!({
            "query": "reactor",
            "date_from": "2021-01-01",
            "date_to": "2020-01-01"
        }))
        .is_err());
    }

    #[test]
    fn test_integral_floats_are_accepted() {
        let request = parse_search_args(&json!({ "query": "reactor", "top_n": 7.0 })).unwrap();
        assert_eq!(request.top_n, 7);
        assert!(parse_search_args(&json!({ "query": "reactor", "top_n": 7.5 })).is_err());
    }

    #[tokio::test]
    async fn test_download_rejects_malformed_accession() {
        let handler = DownloadHandler {
            context: Arc::new(ToolContext::for_tests()),
        };
        let err = handler
            .execute(json!({ "accession_number": "XY123" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let handler = DownloadBatchHandler {
            context: Arc::new(ToolContext::for_tests()),
        };

        let err = handler
            .execute(json!({ "accession_numbers": [] }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        let too_many: Vec<String> = (0..51).map(|i| format!("ML24001A{:03}", i)).collect();
        let err = handler
            .execute(json!({ "accession_numbers": too_many }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ValidationError::TooManyItems { count: 51, max: 50 })
        ));
    }

    #[tokio::test]
    async fn test_batch_reports_invalid_items_individually() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DownloadBatchHandler {
            context: Arc::new(ToolContext::for_tests()),
        };

        let value = handler
            .execute(json!({
                "accession_numbers": ["bogus", 17],
                "directory": dir.path().to_str().unwrap()
            }))
            .await
            .unwrap();

        assert_eq!(value["successful"], 0);
        assert_eq!(value["failed"], 2);
        assert_eq!(value["results"][0]["success"], false);
        assert_eq!(value["results"][1]["accession_number"], "17");
    }

    #[tokio::test]
    async fn test_summarize_missing_file() {
        let handler = SummarizePdfHandler {
            context: Arc::new(ToolContext::for_tests()),
        };
        let err = handler
            .execute(json!({ "path": "missing.pdf" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[tokio::test]
    async fn test_summarize_rejects_out_of_range_max_chars() {
        let handler = SummarizePdfHandler {
            context: Arc::new(ToolContext::for_tests()),
        };
        let err = handler
            .execute(json!({ "path": "missing.pdf", "max_chars": 50 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(ValidationError::OutOfRange { .. })));
    }

    #[tokio::test]
    async fn test_summarize_restricted_to_downloads() {
        let downloads = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let outside = elsewhere.path().join("report.pdf");
        std::fs::write(&outside, b"%PDF-1.4").unwrap();

        let context = ToolContext::for_tests()
            .with_downloads_dir(downloads.path())
            .with_pdf_config(&PdfConfig {
                default_max_chars: 2000,
                restrict_to_downloads: true,
            });
        let handler = SummarizePdfHandler {
            context: Arc::new(context),
        };

        let err = handler
            .execute(json!({ "path": outside.to_str().unwrap() }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Pdf(PdfExtractError::OutsideRoot { .. })));
    }
}
