//! PDF text extraction utilities.
//!
//! Text is extracted page by page with `lopdf`. When `lopdf` finds no text at all
//! the whole document is retried with `pdf-extract`, which handles some font
//! encodings `lopdf` does not. Output is bounded by a character budget and is
//! cut at a word boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use lopdf::Document;
use thiserror::Error;

use crate::models::PdfSummary;
use crate::utils::{check_range, ValidationError, MAX_CHARS_RANGE};

/// Separator placed between pages in extracted text
const PAGE_SEPARATOR: &str = "\n\n";

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Not a valid PDF ({}): {reason}", path.display())]
    InvalidPdf { path: PathBuf, reason: String },

    #[error("PDF is encrypted: {}", .0.display())]
    Encrypted(PathBuf),

    #[error("No extractable text in PDF (scanned or image-only?): {}", .0.display())]
    NoText(PathBuf),

    #[error("Access denied: {} is outside the downloads directory {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("PDF extraction task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract at most `max_chars` characters of text from the PDF at `path`.
///
/// Pages are whitespace-normalized and joined with a blank line. Pages are
/// appended until the next one would overflow the budget; that page then
/// contributes a prefix ending at a word boundary.
pub fn extract_text(path: &Path, max_chars: usize) -> Result<PdfSummary, PdfExtractError> {
    check_range(
        "max_chars",
        i64::try_from(max_chars).unwrap_or(i64::MAX),
        MAX_CHARS_RANGE,
    )?;

    if !path.exists() {
        return Err(PdfExtractError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(PdfExtractError::NotAFile(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let (pages, total_pages) = extract_pages(path, &bytes)?;

    let full_chars = total_chars(&pages);
    if full_chars == 0 {
        return Err(PdfExtractError::NoText(path.to_path_buf()));
    }

    let text = truncate_pages(&pages, max_chars);
    let extracted_chars = text.chars().count();

    tracing::debug!(
        path = %path.display(),
        total_pages,
        total_chars = full_chars,
        extracted_chars,
        "Extracted PDF text"
    );

    Ok(PdfSummary {
        text,
        total_pages,
        total_chars: full_chars,
        extracted_chars,
        path: path.display().to_string(),
    })
}

/// Run [`extract_text`] on the blocking thread pool.
pub async fn extract_text_blocking(
    path: PathBuf,
    max_chars: usize,
) -> Result<PdfSummary, PdfExtractError> {
    tokio::task::spawn_blocking(move || extract_text(&path, max_chars))
        .await
        .map_err(|e| PdfExtractError::TaskFailed(e.to_string()))?
}

/// Reject `path` unless it resolves to a location inside `root`.
pub fn ensure_within(path: &Path, root: &Path) -> Result<(), PdfExtractError> {
    if !path.exists() {
        return Err(PdfExtractError::NotFound(path.to_path_buf()));
    }

    let resolved = path.canonicalize()?;
    let resolved_root = root.canonicalize().map_err(|_| PdfExtractError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;

    if resolved.starts_with(&resolved_root) {
        Ok(())
    } else {
        Err(PdfExtractError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// Normalized text of every non-empty page, plus the document's page count
fn extract_pages(path: &Path, bytes: &[u8]) -> Result<(Vec<String>, usize), PdfExtractError> {
    let invalid = |reason: String| PdfExtractError::InvalidPdf {
        path: path.to_path_buf(),
        reason,
    };

    if !bytes.starts_with(b"%PDF-") && !bytes.windows(5).take(1024).any(|w| w == b"%PDF-") {
        return Err(invalid("missing %PDF- header".to_string()));
    }

    let doc = Document::load_mem(bytes).map_err(|e| {
        let msg = e.to_string();
        if msg.to_lowercase().contains("encrypt") {
            PdfExtractError::Encrypted(path.to_path_buf())
        } else {
            invalid(msg)
        }
    })?;

    if doc.is_encrypted() {
        return Err(PdfExtractError::Encrypted(path.to_path_buf()));
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let total_pages = page_numbers.len();

    let mut pages = Vec::with_capacity(total_pages);
    for page_num in page_numbers {
        match doc.extract_text(&[page_num]) {
            Ok(raw) => {
                let normalized = normalize_whitespace(&raw);
                if !normalized.is_empty() {
                    pages.push(normalized);
                }
            }
            Err(e) => tracing::debug!("lopdf could not read page {}: {}", page_num, e),
        }
    }

    if pages.is_empty() {
        if let Some(text) = fallback_extract(bytes) {
            tracing::debug!("Using pdf-extract fallback for {}", path.display());
            pages = text
                .split('\u{c}')
                .map(normalize_whitespace)
                .filter(|p| !p.is_empty())
                .collect();
        }
    }

    Ok((pages, total_pages))
}

/// Whole-document extraction with `pdf-extract`, which can panic on malformed input
fn fallback_extract(bytes: &[u8]) -> Option<String> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            tracing::debug!("pdf-extract failed: {}", e);
            None
        }
        Err(_) => {
            tracing::debug!("pdf-extract panicked");
            None
        }
    }
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn total_chars(pages: &[String]) -> usize {
    let text: usize = pages.iter().map(|p| p.chars().count()).sum();
    let separators = pages.len().saturating_sub(1) * PAGE_SEPARATOR.chars().count();
    text + separators
}

/// Join pages until the budget runs out, cutting the last page at a word boundary
fn truncate_pages(pages: &[String], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for page in pages {
        let sep_len = if out.is_empty() {
            0
        } else {
            PAGE_SEPARATOR.chars().count()
        };
        let page_len = page.chars().count();

        if used + sep_len + page_len <= max_chars {
            if sep_len > 0 {
                out.push_str(PAGE_SEPARATOR);
            }
            out.push_str(page);
            used += sep_len + page_len;
            continue;
        }

        let remaining = max_chars.saturating_sub(used + sep_len);
        let prefix = cut_at_word_boundary(page, remaining);
        if !prefix.is_empty() {
            if sep_len > 0 {
                out.push_str(PAGE_SEPARATOR);
            }
            out.push_str(prefix);
        }
        break;
    }

    out
}

/// Longest prefix of `text` with at most `limit` chars that ends on a word boundary.
///
/// Falls back to a hard cut when the first word alone exceeds `limit`.
fn cut_at_word_boundary(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }

    let end = match text.char_indices().nth(limit) {
        Some((idx, _)) => idx,
        None => return text,
    };

    let prefix = &text[..end];
    if text[end..].starts_with(char::is_whitespace) {
        return prefix.trim_end();
    }

    match prefix.rfind(char::is_whitespace) {
        Some(idx) => prefix[..idx].trim_end(),
        None => prefix,
    }
}
