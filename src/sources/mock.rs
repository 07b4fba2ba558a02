//! Mock source for testing purposes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{
    AccessionNumber, Document, DocumentBuilder, DocumentSource, SearchRequest, SourceResults,
};
use crate::sources::{Source, SourceError};

/// A mock source that returns predefined documents and counts its invocations.
#[derive(Debug)]
pub struct MockSource {
    kind: DocumentSource,
    documents: Mutex<Vec<Document>>,
    failure: Mutex<Option<fn() -> SourceError>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source producing documents of the given kind.
    pub fn new(kind: DocumentSource) -> Self {
        Self {
            kind,
            documents: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the documents returned by `search`.
    pub fn with_documents(self, documents: Vec<Document>) -> Self {
        if let Ok(mut guard) = self.documents.lock() {
            *guard = documents;
        }
        self
    }

    /// Make every `search` fail with the error produced by `make_error`.
    pub fn failing_with(self, make_error: fn() -> SourceError) -> Self {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = Some(make_error);
        }
        self
    }

    /// Number of times `search` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, _request: &SearchRequest) -> Result<SourceResults, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(make_error) = *self
            .failure
            .lock()
            .map_err(|_| SourceError::InvalidRequest("mock state poisoned".to_string()))?
        {
            return Err(make_error());
        }

        let documents: Vec<Document> = self
            .documents
            .lock()
            .map_err(|_| SourceError::InvalidRequest("mock state poisoned".to_string()))?
            .iter()
            .cloned()
            .map(|mut document| {
                document.source = self.kind;
                document
            })
            .collect();
        Ok(SourceResults::new(documents))
    }
}

/// Helper function to create a mock document for testing.
///
/// `accession` may be `None` for secondary results that carry no identifier.
pub fn make_document(accession: Option<&str>, title: &str, source: DocumentSource) -> Document {
    let mut builder = DocumentBuilder::new(title, source);
    if let Some(acc) = accession.and_then(|a| AccessionNumber::parse(a).ok()) {
        builder = builder.accession_number(acc);
    }
    builder.build()
}
