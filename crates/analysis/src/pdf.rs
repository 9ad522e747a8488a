//! PDF text extraction module
//!
//! Extracts text content from in-memory PDF uploads using lopdf.

use crate::errors::AnalysisError;
use lopdf::{Document, ObjectId};
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether the bytes start with the PDF header (leading whitespace allowed)
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PDF_MAGIC)
}

/// Extract text from every page, one line per page
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, AnalysisError> {
    if !looks_like_pdf(bytes) {
        return Err(AnalysisError::NotAPdf);
    }

    let doc = Document::load_mem(bytes).map_err(|e| AnalysisError::PdfParse {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), size = bytes.len(), "Extracting text from PDF");

    let mut lines = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages.iter() {
        match extract_page_text(&doc, *page_num, *page_id) {
            Ok(page_text) => lines.push(clean_text(&page_text)),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyDocument);
    }

    debug!(chars = text.chars().count(), "Text extraction complete");
    Ok(text)
}

/// lopdf's font-aware extraction, falling back to a raw content-stream scan
fn extract_page_text(doc: &Document, page_num: u32, page_id: ObjectId) -> Result<String, String> {
    match doc.extract_text(&[page_num]) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => {}
        Err(e) => debug!(page = page_num, error = %e, "Font-aware extraction failed"),
    }

    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
    Ok(extract_text_from_content(&content))
}

/// Text between BT and ET operators
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;

    for line in content_str.lines() {
        let trimmed = line.trim();

        match trimmed {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                text.push(' ');
            }
            _ if in_text_block => {
                if let Some(shown) = extract_text_from_operator(trimmed) {
                    text.push_str(&shown);
                }
            }
            _ => {}
        }
    }

    text
}

/// Text shown by a Tj, TJ, ' or " operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        let start = line.find('(')?;
        let end = line.rfind(')')?;
        if end > start {
            return Some(decode_pdf_string(&line[start + 1..end]));
        }
        return None;
    }

    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => in_paren = true,
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace runs and drop byte-order marks
fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
