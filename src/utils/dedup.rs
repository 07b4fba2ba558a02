//! Merging and deduplication of primary and secondary search results.

use std::collections::HashSet;

use crate::models::Document;

/// Normalize a title for comparison: lower-case, punctuation stripped,
/// whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Key used to recognize a document without an accession number
fn fallback_key(doc: &Document) -> Option<String> {
    let title = normalize_title(&doc.title);
    if !title.is_empty() {
        return Some(title);
    }
    doc.download_url
        .as_deref()
        .map(|url| url.trim().to_lowercase())
        .filter(|url| !url.is_empty())
}

#[derive(Default)]
struct Seen {
    accessions: HashSet<String>,
    titles: HashSet<String>,
}

impl Seen {
    /// Record `doc` and report whether it was new
    fn insert(&mut self, doc: &Document) -> bool {
        let title = normalize_title(&doc.title);

        let is_new = match &doc.accession_number {
            Some(acc) => self.accessions.insert(acc.as_str().to_string()),
            None => match fallback_key(doc) {
                Some(key) => !self.titles.contains(&key),
                None => true,
            },
        };

        if is_new && !title.is_empty() {
            self.titles.insert(title);
        }
        if is_new && doc.accession_number.is_none() {
            if let Some(key) = fallback_key(doc) {
                self.titles.insert(key);
            }
        }

        is_new
    }
}

/// Merge primary and secondary results into one list of at most `top_n` documents.
///
/// Primary records come first in their original order, followed by secondary
/// records in theirs. A record is dropped when an earlier one has the same
/// accession number; secondary records without an accession number are also
/// dropped when their normalized title matches an earlier record. Since primary
/// records are processed first, primary metadata always wins.
pub fn merge_results(
    primary: Vec<Document>,
    secondary: Vec<Document>,
    top_n: usize,
) -> Vec<Document> {
    let mut seen = Seen::default();
    let mut merged = Vec::with_capacity(top_n.min(primary.len() + secondary.len()));
    let mut dropped = 0usize;

    for doc in primary.into_iter().chain(secondary) {
        if seen.insert(&doc) {
            merged.push(doc);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} duplicate results while merging", dropped);
    }

    merged.truncate(top_n);
    merged
}
