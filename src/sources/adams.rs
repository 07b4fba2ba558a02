//! ADAMS Public Search API (APS) source.
//!
//! Searches are `POST`ed to the APS search endpoint one page at a time. The
//! endpoint normally answers with JSON; responses from the legacy web-based API
//! (WBA) arrive as XML and are parsed as well. This source also looks up single
//! documents by accession number and downloads their PDFs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate};
use futures_util::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::models::{
    parse_document_date, AccessionNumber, Document, DocumentBuilder, DocumentSource,
    DownloadResult, SearchRequest, SourceResults,
};
use crate::sources::{Source, SourceError};
use crate::utils::{validate_url, with_retry, HttpClient, RetryConfig};

/// Production search endpoint
const DEFAULT_BASE_URL: &str = "https://adams-api.nrc.gov/aps/api/search";
/// Canonical PDF location
const DEFAULT_DOCS_BASE_URL: &str = "https://www.nrc.gov/docs";
/// PDF mirror
const DEFAULT_MIRROR_BASE_URL: &str = "https://pbadupws.nrc.gov/docs";
/// Results per APS page
const DEFAULT_PAGE_SIZE: usize = 100;
/// Downloads larger than this are rejected
const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;
/// Subscription key header
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Documents dated before this year live in the legacy library
const LEGACY_LIBRARY_CUTOFF_YEAR: i32 = 1999;

/// APS text filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextOperator {
    Starts,
    Equals,
    Contains,
}

impl TextOperator {
    fn as_str(&self) -> &'static str {
        match self {
            TextOperator::Starts => "starts",
            TextOperator::Equals => "equals",
            TextOperator::Contains => "contains",
        }
    }
}

/// One APS filter object
#[derive(Debug, Clone, PartialEq, Serialize)]
struct ApsFilter {
    field: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<&'static str>,
}

impl ApsFilter {
    fn text(field: &str, value: &str, operator: TextOperator) -> Self {
        Self {
            field: field.to_string(),
            value: value.trim().to_string(),
            operator: Some(operator.as_str()),
        }
    }

    /// `op` is `ge` (on or after) or `le` (on or before)
    fn date(field: &str, op: &str, date: NaiveDate) -> Self {
        Self {
            field: field.to_string(),
            value: format!("({} {} '{}')", field, op, date.format("%Y-%m-%d")),
            operator: None,
        }
    }
}

/// Request body for one APS page
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchPayload<'a> {
    q: &'a str,
    filters: &'a [ApsFilter],
    any_filters: &'a [ApsFilter],
    main_lib_filter: bool,
    legacy_lib_filter: bool,
    sort: &'static str,
    sort_direction: u8,
    skip: usize,
}

/// Filters and library selection derived from a request
#[derive(Debug, Clone, PartialEq)]
struct QueryPlan {
    filters: Vec<ApsFilter>,
    legacy_library: bool,
}

/// Find a year or year range mentioned in a query.
///
/// Recognizes "1990-1995", "1990 to 1995" and a single year such as "1992".
/// The returned range is ordered.
pub fn extract_year_range(query: &str) -> Option<(i32, i32)> {
    static RANGE: OnceLock<Regex> = OnceLock::new();
    static SINGLE: OnceLock<Regex> = OnceLock::new();

    let range = RANGE.get_or_init(|| {
        Regex::new(r"(?i)\b(19\d{2}|20\d{2})\s*(?:-|–|to)\s*(19\d{2}|20\d{2})\b")
            .expect("year range pattern is valid")
    });
    if let Some(caps) = range.captures(query) {
        let a: i32 = caps[1].parse().ok()?;
        let b: i32 = caps[2].parse().ok()?;
        return Some((a.min(b), a.max(b)));
    }

    let single = SINGLE
        .get_or_init(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern is valid"));
    single
        .captures(query)
        .and_then(|caps| caps[1].parse().ok())
        .map(|year| (year, year))
}

fn build_query_plan(request: &SearchRequest, today: NaiveDate) -> QueryPlan {
    let mut filters = Vec::new();
    let f = &request.filters;

    if let Some(docket) = f.docket_number.as_deref().filter(|d| !d.trim().is_empty()) {
        filters.push(ApsFilter::text("DocketNumber", docket, TextOperator::Starts));
    }
    if let Some(doc_type) = f.document_type.as_deref().filter(|t| !t.trim().is_empty()) {
        filters.push(ApsFilter::text("DocumentType", doc_type, TextOperator::Equals));
    }
    for (field, value) in &f.properties {
        filters.push(ApsFilter::text(field, value, TextOperator::Contains));
    }

    if let Some(period) = request.added_period {
        filters.push(ApsFilter::date(
            "DateAddedTimestamp",
            "ge",
            period.start_date(today),
        ));
    }
    if let Some(days) = request.days_back {
        filters.push(ApsFilter::date(
            "DateAddedTimestamp",
            "ge",
            today - Duration::days(i64::from(days)),
        ));
    }

    let mut start_year = None;
    if f.has_date_range() {
        if let Some(from) = f.date_from {
            filters.push(ApsFilter::date("DocumentDate", "ge", from));
            start_year = Some(from.year());
        }
        if let Some(to) = f.date_to {
            filters.push(ApsFilter::date("DocumentDate", "le", to));
        }
    } else if let Some((from_year, to_year)) = extract_year_range(&request.query) {
        let from = NaiveDate::from_ymd_opt(from_year, 1, 1);
        let to = NaiveDate::from_ymd_opt(to_year, 12, 31);
        if let (Some(from), Some(to)) = (from, to) {
            filters.push(ApsFilter::date("DocumentDate", "ge", from));
            filters.push(ApsFilter::date("DocumentDate", "le", to));
            start_year = Some(from_year);
        }
    }

    QueryPlan {
        filters,
        legacy_library: start_year.is_some_and(|year| year < LEGACY_LIBRARY_CUTOFF_YEAR),
    }
}

/// A JSON field that may hold a string, number, list or anything else
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Text(String),
    Number(serde_json::Number),
    List(Vec<serde_json::Value>),
    Other(serde_json::Value),
}

impl FieldValue {
    /// Display form; lists are joined with ", "
    fn joined(&self) -> Option<String> {
        let text = match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::List(items) => items
                .iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s.trim().to_string()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Other(_) => String::new(),
        };
        Some(text).filter(|t| !t.is_empty())
    }
}

/// Document fields as named by the APS JSON API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApsDocument {
    accession_number: Option<FieldValue>,
    document_title: Option<FieldValue>,
    name: Option<FieldValue>,
    document_date: Option<FieldValue>,
    date_added_timestamp: Option<FieldValue>,
    date_added: Option<FieldValue>,
    document_type: Option<FieldValue>,
    author_name: Option<FieldValue>,
    docket_number: Option<FieldValue>,
    estimated_page_count: Option<FieldValue>,
    url: Option<FieldValue>,
}

/// One entry of the APS `results` array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Wrapped { document: ApsDocument },
    Flat(ApsDocument),
    Unparseable(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct ApsResponse {
    #[serde(default)]
    results: Vec<RawRecord>,
    #[serde(default)]
    count: Option<u64>,
}

/// Legacy WBA XML: `<search><resultset><result>...</result></resultset></search>`
#[derive(Debug, Deserialize)]
struct XmlSearch {
    #[serde(default)]
    resultset: Option<XmlResultSet>,
}

#[derive(Debug, Deserialize)]
struct XmlResultSet {
    #[serde(rename = "result", default)]
    results: Vec<XmlRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XmlRecord {
    accession_number: Option<String>,
    document_title: Option<String>,
    document_date: Option<String>,
    #[serde(rename = "PublishDatePARS")]
    publish_date: Option<String>,
    document_type: Option<String>,
    author_name: Option<String>,
    docket_number: Option<String>,
    estimated_page_count: Option<String>,
    #[serde(rename = "URI")]
    uri: Option<String>,
}

/// Source-independent view of one record
#[derive(Debug, Default)]
struct RecordFields {
    accession: Option<String>,
    title: Option<String>,
    document_date: Option<String>,
    added_date: Option<String>,
    document_type: Option<String>,
    author_name: Option<String>,
    docket_number: Option<String>,
    page_count: Option<String>,
    url: Option<String>,
}

impl From<ApsDocument> for RecordFields {
    fn from(doc: ApsDocument) -> Self {
        let get = |v: &Option<FieldValue>| v.as_ref().and_then(FieldValue::joined);
        Self {
            accession: get(&doc.accession_number),
            title: get(&doc.document_title).or_else(|| get(&doc.name)),
            document_date: get(&doc.document_date),
            added_date: get(&doc.date_added_timestamp).or_else(|| get(&doc.date_added)),
            document_type: get(&doc.document_type),
            author_name: get(&doc.author_name),
            docket_number: get(&doc.docket_number),
            page_count: get(&doc.estimated_page_count),
            url: get(&doc.url),
        }
    }
}

impl From<XmlRecord> for RecordFields {
    fn from(rec: XmlRecord) -> Self {
        Self {
            accession: rec.accession_number,
            title: rec.document_title,
            document_date: rec.document_date,
            added_date: rec.publish_date,
            document_type: rec.document_type,
            author_name: rec.author_name,
            docket_number: rec.docket_number,
            page_count: rec.estimated_page_count,
            url: rec.uri,
        }
    }
}

impl RecordFields {
    fn into_document(self) -> Result<Document, SourceError> {
        let raw_accession = self
            .accession
            .ok_or_else(|| SourceError::Parse("record has no accession number".to_string()))?;
        let accession = AccessionNumber::parse(&raw_accession)
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| accession.to_string());

        let page_count = self
            .page_count
            .and_then(|p| p.replace(',', "").trim().parse::<u32>().ok());

        Ok(DocumentBuilder::new(title, DocumentSource::Primary)
            .document_date(self.document_date.as_deref().and_then(parse_document_date))
            .accession_number(accession)
            .document_type(self.document_type)
            .download_url(self.url.filter(|u| validate_url(u).is_ok()))
            .added_date(self.added_date)
            .docket_number(self.docket_number)
            .author_name(self.author_name)
            .page_count(page_count)
            .build())
    }
}

/// Parsed page: usable documents plus the raw record count used for paging
#[derive(Debug, Default)]
struct ParsedPage {
    documents: Vec<Document>,
    raw_count: usize,
    total: Option<u64>,
}

/// Parse an APS JSON or WBA XML response body
fn parse_search_response(body: &str) -> Result<ParsedPage, SourceError> {
    let trimmed = body.trim_start();
    let records: Vec<Result<RecordFields, String>>;
    let mut total = None;

    if trimmed.starts_with('<') {
        let parsed: XmlSearch = quick_xml::de::from_str(trimmed)?;
        records = parsed
            .resultset
            .map(|set| set.results)
            .unwrap_or_default()
            .into_iter()
            .map(|rec| Ok(RecordFields::from(rec)))
            .collect();
    } else {
        let parsed: ApsResponse = serde_json::from_str(trimmed)?;
        total = parsed.count;
        records = parsed
            .results
            .into_iter()
            .map(|record| match record {
                RawRecord::Wrapped { document } | RawRecord::Flat(document) => {
                    Ok(RecordFields::from(document))
                }
                RawRecord::Unparseable(value) => Err(value.to_string()),
            })
            .collect();
    }

    let raw_count = records.len();
    let mut documents = Vec::with_capacity(raw_count);
    for record in records {
        match record.and_then(|fields| fields.into_document().map_err(|e| e.to_string())) {
            Ok(doc) => documents.push(doc),
            Err(reason) => tracing::warn!("Skipping unusable ADAMS record: {}", reason),
        }
    }

    Ok(ParsedPage {
        documents,
        raw_count,
        total,
    })
}

/// Parse a single-document response (`{document: {...}}` or a bare document)
fn parse_document_response(body: &str) -> Result<Document, SourceError> {
    let record: RawRecord = serde_json::from_str(body)?;
    match record {
        RawRecord::Wrapped { document } | RawRecord::Flat(document) => {
            RecordFields::from(document).into_document()
        }
        RawRecord::Unparseable(_) => Err(SourceError::Parse(
            "document response is not an object".to_string(),
        )),
    }
}

/// A fully received download waiting to be moved into place
struct Downloaded {
    temp_path: tempfile::TempPath,
    size: u64,
}

/// ADAMS Public Search API client
#[derive(Debug, Clone)]
pub struct AdamsSource {
    http: Arc<HttpClient>,
    base_url: String,
    docs_base_url: String,
    mirror_base_url: String,
    api_key: Option<String>,
    page_size: usize,
    max_download_bytes: u64,
    retry: RetryConfig,
}

impl AdamsSource {
    /// Client for the production endpoints with default settings
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            mirror_base_url: DEFAULT_MIRROR_BASE_URL.to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            retry: RetryConfig::default(),
        }
    }

    /// Client configured from the application settings
    pub fn from_config(http: Arc<HttpClient>, config: &Config) -> Self {
        Self::new(http)
            .with_base_url(&config.adams.base_url)
            .with_docs_urls(&config.adams.docs_base_url, &config.adams.mirror_base_url)
            .with_api_key(config.adams.api_key.clone())
            .with_page_size(config.adams.page_size)
            .with_max_download_bytes(config.downloads.max_bytes())
            .with_retry(RetryConfig::from(&config.retry))
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_docs_urls(mut self, docs: &str, mirror: &str) -> Self {
        self.docs_base_url = docs.trim_end_matches('/').to_string();
        self.mirror_base_url = mirror.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_download_bytes(mut self, max: u64) -> Self {
        self.max_download_bytes = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn fetch_page(&self, payload: &SearchPayload<'_>) -> Result<ParsedPage, SourceError> {
        let request = self.authorize(self.http.client().post(&self.base_url).json(payload));
        let response = self.http.send(request).await?;
        let body = response.text().await?;
        parse_search_response(&body)
    }

    /// Fetch up to `request.max_pages` pages, stopping early when enough
    /// results have arrived or the results run out.
    ///
    /// Never fails: page failures are reported as warnings alongside whatever
    /// was collected before them.
    pub async fn search_pages(&self, request: &SearchRequest) -> SourceResults {
        let plan = build_query_plan(request, Local::now().date_naive());
        let mut documents: Vec<Document> = Vec::new();
        let mut warnings = Vec::new();

        tracing::debug!(
            query = %request.query,
            filters = plan.filters.len(),
            legacy = plan.legacy_library,
            "Searching ADAMS"
        );

        for page in 0..request.max_pages {
            let payload = SearchPayload {
                q: &request.query,
                filters: &plan.filters,
                any_filters: &[],
                main_lib_filter: true,
                legacy_lib_filter: plan.legacy_library,
                sort: "DateAddedTimestamp",
                sort_direction: 1,
                skip: page * self.page_size,
            };

            let payload = &payload;
            match with_retry(self.retry, move || self.fetch_page(payload)).await {
                Ok(parsed) => {
                    tracing::debug!(
                        page = page + 1,
                        records = parsed.raw_count,
                        usable = parsed.documents.len(),
                        total = ?parsed.total,
                        "Received ADAMS page"
                    );
                    documents.extend(parsed.documents);

                    if parsed.raw_count == 0
                        || documents.len() >= request.top_n
                        || parsed.raw_count < self.page_size
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("ADAMS search page {} failed: {}", page + 1, e);
                    if page == 0 {
                        warnings.push(format!("ADAMS API search failed: {}", e));
                    } else {
                        warnings.push(format!(
                            "ADAMS API page {} failed, returning partial results: {}",
                            page + 1,
                            e
                        ));
                    }
                    break;
                }
            }
        }

        documents.truncate(request.top_n);
        SourceResults {
            documents,
            warnings,
        }
    }

    /// Look up a single document's metadata. Returns `Ok(None)` for unknown accession numbers.
    pub async fn get_document(
        &self,
        accession: &AccessionNumber,
    ) -> Result<Option<Document>, SourceError> {
        let url = format!("{}/{}", self.base_url, accession);
        let url = url.as_str();

        let result = with_retry(self.retry, move || async move {
            let request = self.authorize(self.http.client().get(url));
            let response = self.http.send(request).await?;
            let body = response.text().await?;
            parse_document_response(&body)
        })
        .await;

        match result {
            Ok(doc) => Ok(Some(doc)),
            Err(SourceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Candidate PDF URLs for an accession number, most specific first
    pub fn download_urls(&self, accession: &AccessionNumber, preferred: Option<&str>) -> Vec<String> {
        let mut urls = Vec::with_capacity(3);

        if let Some(url) = preferred {
            match validate_url(url) {
                Ok(url) => urls.push(url),
                Err(e) => tracing::debug!("Ignoring document URL {}: {}", url, e),
            }
        }

        for base in [&self.docs_base_url, &self.mirror_base_url] {
            let url = format!("{}/{}/{}", base, accession.folder(), accession.file_name());
            if !urls.contains(&url) {
                urls.push(url);
            }
        }

        urls
    }

    /// Download the PDF for `accession` into `directory` as `<ACCESSION>.pdf`.
    ///
    /// Each candidate URL is tried in turn (through the retry policy). The body
    /// is streamed into a temporary file in `directory` and renamed into place,
    /// replacing any earlier copy.
    pub async fn download(
        &self,
        accession: &AccessionNumber,
        preferred_url: Option<&str>,
        directory: &Path,
    ) -> Result<DownloadResult, SourceError> {
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| SourceError::filesystem(directory, e))?;

        let target = directory.join(accession.file_name());
        let mut failure = None;

        for url in self.download_urls(accession, preferred_url) {
            tracing::info!("Downloading {} from {}", accession, url);

            let candidate = url.as_str();
            match with_retry(self.retry, move || self.fetch_to_temp(candidate, directory)).await {
                Ok(downloaded) => {
                    downloaded
                        .temp_path
                        .persist(&target)
                        .map_err(|e| SourceError::filesystem(&target, e.error))?;

                    tracing::info!(
                        "Saved {} ({} bytes) to {}",
                        accession,
                        downloaded.size,
                        target.display()
                    );
                    return Ok(DownloadResult {
                        accession_number: accession.clone(),
                        path: target.display().to_string(),
                        size_bytes: downloaded.size,
                        url,
                    });
                }
                Err(e @ SourceError::Filesystem { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!("Download of {} from {} failed: {}", accession, url, e);
                    if !matches!(e, SourceError::NotFound(_)) {
                        failure = Some(e);
                    }
                }
            }
        }

        // A 404 from a fallback location should not mask an outage at an earlier one
        Err(match failure {
            Some(e) => e,
            None => SourceError::NotFound(format!(
                "No PDF found for {} at any known location",
                accession
            )),
        })
    }

    /// Download the PDF for `accession`, trying the URL ADAMS reports for the
    /// document before the conventional locations.
    ///
    /// A failed metadata lookup is not fatal; the conventional locations are
    /// still tried.
    pub async fn download_accession(
        &self,
        accession: &AccessionNumber,
        directory: &Path,
    ) -> Result<DownloadResult, SourceError> {
        let preferred = match self.get_document(accession).await {
            Ok(Some(document)) => document.download_url,
            Ok(None) => {
                tracing::debug!("No ADAMS metadata for {}", accession);
                None
            }
            Err(e) => {
                tracing::warn!("Metadata lookup for {} failed: {}", accession, e);
                None
            }
        };

        self.download(accession, preferred.as_deref(), directory).await
    }

    async fn fetch_to_temp(&self, url: &str, directory: &Path) -> Result<Downloaded, SourceError> {
        let response = self.http.send(self.http.client().get(url)).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if let Some(length) = response.content_length() {
            if length > self.max_download_bytes {
                return Err(SourceError::InvalidContent(format!(
                    "{} is {} bytes, larger than the {} byte limit",
                    url, length, self.max_download_bytes
                )));
            }
        }

        let temp = tempfile::Builder::new()
            .prefix(".adams-")
            .suffix(".part")
            .tempfile_in(directory)
            .map_err(|e| SourceError::filesystem(directory, e))?;
        let (file, temp_path) = temp.into_parts();
        let temp_file: PathBuf = temp_path.to_path_buf();
        let mut file = tokio::fs::File::from_std(file);

        let mut size: u64 = 0;
        let mut head: Vec<u8> = Vec::with_capacity(8);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::Network(e.to_string()))?;
            size += chunk.len() as u64;
            if size > self.max_download_bytes {
                return Err(SourceError::InvalidContent(format!(
                    "{} exceeds the {} byte limit",
                    url, self.max_download_bytes
                )));
            }
            if head.len() < 5 {
                head.extend(chunk.iter().take(5 - head.len()));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| SourceError::filesystem(&temp_file, e))?;
        }

        file.flush()
            .await
            .map_err(|e| SourceError::filesystem(&temp_file, e))?;
        drop(file);

        if !content_type.contains("pdf") && !head.starts_with(b"%PDF-") {
            return Err(SourceError::InvalidContent(format!(
                "{} did not return a PDF (content-type '{}')",
                url, content_type
            )));
        }

        Ok(Downloaded { temp_path, size })
    }
}

#[async_trait]
impl Source for AdamsSource {
    fn id(&self) -> &str {
        "adams"
    }

    fn name(&self) -> &str {
        "ADAMS API"
    }


    async fn search(&self, request: &SearchRequest) -> Result<SourceResults, SourceError> {
        Ok(self.search_pages(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddedPeriod;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_extract_year_range() {
        assert_eq!(extract_year_range("reports 1990-1995"), Some((1990, 1995)));
        assert_eq!(extract_year_range("from 1995 to 1990"), Some((1990, 1995)));
        assert_eq!(extract_year_range("1990 – 1992 letters"), Some((1990, 1992)));
        assert_eq!(extract_year_range("events in 1992"), Some((1992, 1992)));
        assert_eq!(extract_year_range("steam generator"), None);
        assert_eq!(extract_year_range("ML19345A678"), None);
    }

    #[test]
    fn test_query_plan_filters() {
        let request = SearchRequest::new("inspection")
            .docket_number("05000373")
            .document_type("Inspection Report")
            .property("AuthorName", "Smith")
            .date_range(NaiveDate::from_ymd_opt(2024, 1, 1), None);

        let plan = build_query_plan(&request, today());
        assert!(!plan.legacy_library);
        assert_eq!(
            plan.filters,
            vec![
                ApsFilter::text("DocketNumber", "05000373", TextOperator::Starts),
                ApsFilter::text("DocumentType", "Inspection Report", TextOperator::Equals),
                ApsFilter::text("AuthorName", "Smith", TextOperator::Contains),
                ApsFilter {
                    field: "DocumentDate".to_string(),
                    value: "(DocumentDate ge '2024-01-01')".to_string(),
                    operator: None,
                },
            ]
        );
    }

    #[test]
    fn test_query_plan_added_filters() {
        let request = SearchRequest::new("reactor")
            .added_period(AddedPeriod::ThisMonth)
            .days_back(10);
        let plan = build_query_plan(&request, today());

        let values: Vec<_> = plan.filters.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "(DateAddedTimestamp ge '2024-05-01')",
                "(DateAddedTimestamp ge '2024-05-05')"
            ]
        );
    }

    #[test]
    fn test_query_plan_year_range_enables_legacy_library() {
        let plan = build_query_plan(&SearchRequest::new("scram reports 1990 to 1995"), today());
        assert!(plan.legacy_library);
        let values: Vec<_> = plan.filters.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "(DocumentDate ge '1990-01-01')",
                "(DocumentDate le '1995-12-31')"
            ]
        );

        // Explicit dates take precedence over the query
        let request = SearchRequest::new("scram reports 1990")
            .date_range(NaiveDate::from_ymd_opt(2020, 1, 1), None);
        let plan = build_query_plan(&request, today());
        assert!(!plan.legacy_library);
        assert_eq!(plan.filters.len(), 1);
    }

    #[test]
    fn test_payload_serialization() {
        let filters = vec![ApsFilter::text("DocketNumber", "050", TextOperator::Starts)];
        let payload = SearchPayload {
            q: "reactor",
            filters: &filters,
            any_filters: &[],
            main_lib_filter: true,
            legacy_lib_filter: false,
            sort: "DateAddedTimestamp",
            sort_direction: 1,
            skip: 100,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["q"], "reactor");
        assert_eq!(json["mainLibFilter"], true);
        assert_eq!(json["legacyLibFilter"], false);
        assert_eq!(json["sortDirection"], 1);
        assert_eq!(json["skip"], 100);
        assert_eq!(json["anyFilters"], serde_json::json!([]));
        assert_eq!(json["filters"][0]["operator"], "starts");
    }

    #[test]
    fn test_parse_json_response() {
        let body = r#"{
            "count": 3,
            "results": [
                {"document": {
                    "AccessionNumber": "ML24001A001",
                    "DocumentTitle": "Inspection Report 2024-001",
                    "DocumentDate": "2024-01-15",
                    "DocumentType": ["Inspection Report", "Letter"],
                    "DocketNumber": ["05000373"],
                    "EstimatedPageCount": "12",
                    "Url": "https://adamswebsearch2.nrc.gov/webSearch2/main.jsp?AccessionNumber=ML24001A001"
                }},
                {"AccessionNumber": "ml24001a002", "Name": "Flat record"},
                {"document": {"AccessionNumber": "bogus", "DocumentTitle": "Bad accession"}},
                42
            ]
        }"#;

        let page = parse_search_response(body).unwrap();
        assert_eq!(page.raw_count, 4);
        assert_eq!(page.total, Some(3));
        assert_eq!(page.documents.len(), 2);

        let first = &page.documents[0];
        assert_eq!(first.accession_number.as_ref().unwrap().as_str(), "ML24001A001");
        assert_eq!(
            first.document_type.as_deref(),
            Some("Inspection Report, Letter")
        );
        assert_eq!(first.document_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(first.page_count, Some(12));
        assert_eq!(first.source, DocumentSource::Primary);

        let second = &page.documents[1];
        assert_eq!(second.title, "Flat record");
        assert_eq!(second.accession_number.as_ref().unwrap().as_str(), "ML24001A002");
    }

    #[test]
    fn test_parse_xml_response() {
        let body = r#"<?xml version="1.0"?>
<search>
  <resultset>
    <result>
      <AccessionNumber>ML080200123</AccessionNumber>
      <DocumentTitle>Legacy Safety Evaluation</DocumentTitle>
      <DocumentDate>03/14/1994</DocumentDate>
      <DocumentType>Safety Evaluation Report</DocumentType>
      <URI>https://www.nrc.gov/docs/ML0802/ML080200123.pdf</URI>
    </result>
    <result>
      <DocumentTitle>No accession</DocumentTitle>
    </result>
  </resultset>
</search>"#;

        let page = parse_search_response(body).unwrap();
        assert_eq!(page.raw_count, 2);
        assert_eq!(page.documents.len(), 1);

        let doc = &page.documents[0];
        assert_eq!(doc.title, "Legacy Safety Evaluation");
        assert_eq!(doc.document_date, NaiveDate::from_ymd_opt(1994, 3, 14));
        assert_eq!(
            doc.download_url.as_deref(),
            Some("https://www.nrc.gov/docs/ML0802/ML080200123.pdf")
        );
    }

    #[test]
    fn test_parse_invalid_body() {
        assert!(matches!(
            parse_search_response("not json"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_document_response() {
        let doc = parse_document_response(
            r#"{"document": {"AccessionNumber": "ML24001A001", "DocumentTitle": "Letter"}}"#,
        )
        .unwrap();
        assert_eq!(doc.title, "Letter");

        assert!(parse_document_response("[1, 2]").is_err());
    }

    #[test]
    fn test_download_urls() {
        let http = Arc::new(HttpClient::with_defaults().unwrap());
        let source = AdamsSource::new(http);
        let acc = AccessionNumber::parse("ML24001A001").unwrap();

        assert_eq!(
            source.download_urls(&acc, None),
            vec![
                "https://www.nrc.gov/docs/ML2400/ML24001A001.pdf".to_string(),
                "https://pbadupws.nrc.gov/docs/ML2400/ML24001A001.pdf".to_string(),
            ]
        );

        let urls = source.download_urls(&acc, Some("javascript:alert(1)"));
        assert_eq!(urls.len(), 2);

        let urls = source.download_urls(&acc, Some("https://www.nrc.gov/docs/ML2400/ML24001A001.pdf"));
        assert_eq!(urls.len(), 2);
    }
}
