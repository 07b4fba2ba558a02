//! Hybrid search: primary and secondary sources merged into one ranked list.

use std::sync::Arc;

use crate::models::{
    DegradationReason, Document, SearchOutcome, SearchRequest, SecondaryStatus, SourceResults,
};
use crate::sources::Source;
use crate::utils::{merge_results, ValidationError};

/// Runs a primary and a secondary [`Source`] for one request.
///
/// The request is validated before any source is contacted. The secondary
/// source is only invoked when the request asks for it, and then concurrently
/// with the primary. Failures of either source are reported in the outcome and
/// never abort the search.
#[derive(Debug, Clone)]
pub struct HybridSearch {
    primary: Arc<dyn Source>,
    secondary: Arc<dyn Source>,
}

impl HybridSearch {
    pub fn new(primary: Arc<dyn Source>, secondary: Arc<dyn Source>) -> Self {
        Self { primary, secondary }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome, ValidationError> {
        let request = request.validate()?;

        let ((primary, mut warnings), (secondary, secondary_status)) = if request.use_secondary {
            tokio::join!(
                self.run_primary(&request),
                self.run_secondary(&request)
            )
        } else {
            (
                self.run_primary(&request).await,
                (SourceResults::default(), SecondaryStatus::Disabled),
            )
        };

        warnings.extend(secondary.warnings);
        let results = merge_results(primary, secondary.documents, request.top_n);
        let outcome = SearchOutcome::new(results, warnings, secondary_status);

        tracing::info!(
            primary_source = self.primary.id(),
            secondary_source = self.secondary.id(),
            query = %request.query,
            returned = outcome.returned,
            primary = outcome.primary_count,
            secondary = outcome.secondary_count,
            "Hybrid search complete"
        );
        Ok(outcome)
    }

    async fn run_primary(&self, request: &SearchRequest) -> (Vec<Document>, Vec<String>) {
        match self.primary.search(request).await {
            Ok(results) => (results.documents, results.warnings),
            Err(e) => {
                tracing::warn!(source = self.primary.id(), "{} search failed: {}", self.primary.name(), e);
                (
                    Vec::new(),
                    vec![format!("{} search failed: {}", self.primary.name(), e)],
                )
            }
        }
    }

    async fn run_secondary(&self, request: &SearchRequest) -> (SourceResults, SecondaryStatus) {
        match self.secondary.search(request).await {
            Ok(results) => (results, SecondaryStatus::Ok),
            Err(e) => {
                let reason = e.degradation_reason();
                tracing::warn!(
                    source = self.secondary.id(),
                    "{} search degraded ({}): {}",
                    self.secondary.name(),
                    reason,
                    e
                );

                let results = match reason {
                    DegradationReason::Unconfigured => SourceResults::default(),
                    _ => SourceResults::default().with_warning(format!(
                        "{} results unavailable ({})",
                        self.secondary.name(),
                        reason
                    )),
                };
                (results, SecondaryStatus::Degraded(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentSource;
    use crate::sources::mock::{make_document, MockSource};
    use crate::sources::{GoogleSource, SourceError};
    use crate::utils::HttpClient;

    fn primary_docs() -> Vec<Document> {
        vec![
            make_document(Some("ML24001A001"), "Inspection Report", DocumentSource::Primary),
            make_document(Some("ML24001A002"), "Safety Evaluation", DocumentSource::Primary),
        ]
    }

    #[tokio::test]
    async fn test_secondary_not_invoked_when_disabled() {
        let primary = Arc::new(MockSource::new(DocumentSource::Primary).with_documents(primary_docs()));
        let secondary = Arc::new(MockSource::new(DocumentSource::Secondary));
        let hybrid = HybridSearch::new(primary.clone(), secondary.clone());

        let outcome = hybrid
            .search(SearchRequest::new("reactor").use_secondary(false))
            .await
            .unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
        assert_eq!(outcome.returned, 2);
        assert_eq!(outcome.secondary_status, SecondaryStatus::Disabled);
    }

    #[tokio::test]
    async fn test_invalid_request_contacts_no_source() {
        let primary = Arc::new(MockSource::new(DocumentSource::Primary));
        let secondary = Arc::new(MockSource::new(DocumentSource::Secondary));
        let hybrid = HybridSearch::new(primary.clone(), secondary.clone());

        assert!(hybrid.search(SearchRequest::new("")).await.is_err());
        assert!(hybrid
            .search(SearchRequest::new("reactor").max_pages(0))
            .await
            .is_err());
        assert!(hybrid
            .search(SearchRequest::new("reactor").top_n(100))
            .await
            .is_err());

        assert_eq!(primary.calls(), 0);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_merges_primary_first() {
        let primary = Arc::new(MockSource::new(DocumentSource::Primary).with_documents(primary_docs()));
        let secondary = Arc::new(MockSource::new(DocumentSource::Secondary).with_documents(vec![
            make_document(Some("ML24001A002"), "Duplicate from web", DocumentSource::Secondary),
            make_document(None, "News release", DocumentSource::Secondary),
        ]));
        let hybrid = HybridSearch::new(primary, secondary.clone());

        let outcome = hybrid.search(SearchRequest::new("reactor").top_n(10)).await.unwrap();

        assert_eq!(secondary.calls(), 1);
        assert_eq!(outcome.secondary_status, SecondaryStatus::Ok);
        let titles: Vec<_> = outcome.results.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Inspection Report", "Safety Evaluation", "News release"]
        );
        assert_eq!(outcome.primary_count, 2);
        assert_eq!(outcome.secondary_count, 1);
    }

    #[tokio::test]
    async fn test_secondary_failure_degrades() {
        let primary = Arc::new(MockSource::new(DocumentSource::Primary).with_documents(primary_docs()));
        let secondary = Arc::new(
            MockSource::new(DocumentSource::Secondary)
                .failing_with(|| SourceError::RateLimit("quota".to_string())),
        );
        let hybrid = HybridSearch::new(primary, secondary);

        let outcome = hybrid.search(SearchRequest::new("reactor")).await.unwrap();
        assert_eq!(outcome.returned, 2);
        assert_eq!(
            outcome.secondary_status,
            SecondaryStatus::Degraded(DegradationReason::QuotaExceeded)
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_primary_failure_is_a_warning() {
        let primary = Arc::new(
            MockSource::new(DocumentSource::Primary)
                .failing_with(|| SourceError::Network("connection reset".to_string())),
        );
        let secondary = Arc::new(MockSource::new(DocumentSource::Secondary).with_documents(vec![
            make_document(None, "Web result", DocumentSource::Secondary),
        ]));
        let hybrid = HybridSearch::new(primary, secondary);

        let outcome = hybrid.search(SearchRequest::new("reactor")).await.unwrap();
        assert_eq!(outcome.returned, 1);
        assert_eq!(outcome.primary_count, 0);
        assert!(outcome.warnings[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unconfigured_google_degrades_silently() {
        let http = Arc::new(HttpClient::with_defaults().unwrap());
        let google = GoogleSource::new(http, None);
        assert!(!google.is_configured());

        let primary = Arc::new(MockSource::new(DocumentSource::Primary).with_documents(primary_docs()));
        let hybrid = HybridSearch::new(primary, Arc::new(google));

        let outcome = hybrid.search(SearchRequest::new("reactor")).await.unwrap();
        assert_eq!(outcome.returned, 2);
        assert_eq!(
            outcome.secondary_status,
            SecondaryStatus::Degraded(DegradationReason::Unconfigured)
        );
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_mock_documents_carry_source_kind() {
        let primary = Arc::new(MockSource::new(DocumentSource::Primary).with_documents(vec![
            make_document(Some("ML24001A001"), "Inspection Report", DocumentSource::Secondary),
        ]));
        let hybrid = HybridSearch::new(primary, Arc::new(MockSource::new(DocumentSource::Secondary)));

        let outcome = hybrid.search(SearchRequest::new("reactor")).await.unwrap();
        assert_eq!(outcome.results[0].source, DocumentSource::Primary);
        assert_eq!(outcome.primary_count, 1);
    }
}
