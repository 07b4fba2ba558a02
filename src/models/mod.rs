//! Core data models for ADAMS documents and search operations.

mod document;
mod search;

pub use document::{
    parse_document_date, AccessionNumber, Document, DocumentBuilder, DocumentSource,
};
pub use search::{
    AddedPeriod, BatchDownloadResult, BatchItemResult, DegradationReason, DownloadResult,
    PdfSummary, SearchFilters, SearchOutcome, SearchRequest, SecondaryStatus, SourceResults,
};
