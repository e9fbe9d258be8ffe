//! PDF text extraction

use std::path::Path;

use crate::error::{Error, Result};

/// Lowercased extension of `filename`, if any
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Reject anything that is not a PDF
pub fn ensure_pdf(filename: &str) -> Result<()> {
    match extension(filename).as_deref() {
        Some("pdf") => Ok(()),
        Some(other) => Err(Error::UnsupportedFileType(format!(
            "{} - only PDF files are accepted",
            other
        ))),
        None => Err(Error::UnsupportedFileType(format!(
            "'{}' has no extension - only PDF files are accepted",
            filename
        ))),
    }
}

/// Extract and clean the text of a PDF. Blocking; run off the async runtime.
pub fn extract_pdf_text(filename: &str, data: &[u8]) -> Result<String> {
    ensure_pdf(filename)?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(data)
        .map_err(|e| Error::file_parse(filename, e.to_string()))?;

    let content = join_pages(&pages);
    if content.is_empty() {
        return Err(Error::file_parse(
            filename,
            "No text content could be extracted from PDF",
        ));
    }

    tracing::debug!("Extracted {} chars from {}", content.len(), filename);
    Ok(content)
}

/// Join non-empty pages with a single space, without NUL characters
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.replace('\0', ""))
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
