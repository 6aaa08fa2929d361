//! Text ingestion
//!
//! Normalizes heterogeneous input (raw text, fetched URLs, uploaded
//! documents) into a single cleaned text blob for extraction.

use std::time::Duration;

use scraper::{Html, Selector};
use tracing::debug;

use crate::{GatewayError, Result};

const URL_FETCH_TIMEOUT_SECS: u64 = 10;

/// Elements whose text is worth feeding to extraction; skips script,
/// style, nav chrome and the like.
const CONTENT_SELECTOR: &str =
    "title, h1, h2, h3, h4, h5, h6, p, li, td, th, pre, blockquote";

/// Whether pasted text should be treated as a URL to fetch
pub fn is_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Fetch raw content from a URL
pub async fn fetch_url(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(URL_FETCH_TIMEOUT_SECS))
        .build()?;

    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Convert HTML to readable text
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);

    let blocks: Vec<String> = match Selector::parse(CONTENT_SELECTOR) {
        Ok(selector) => document
            .select(&selector)
            .map(|element| element.text().collect::<Vec<_>>().join(" "))
            .filter(|text| !text.trim().is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    if blocks.is_empty() {
        // No content-bearing elements matched; fall back to all text
        return document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
    }

    blocks.join("\n")
}

/// Extract text from a PDF document
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| GatewayError::InvalidInput(format!("failed to extract text from PDF: {e}")))
}

/// Extract text from a DOCX document
pub fn extract_text_from_docx(bytes: &[u8]) -> Result<String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| GatewayError::InvalidInput(format!("failed to read DOCX: {e}")))?;

    let mut out = String::new();
    for child in docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for paragraph_child in paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in run.children {
                        if let RunChild::Text(text) = run_child {
                            out.push_str(&text.text);
                        }
                    }
                }
            }
            out.push('\n');
        }
    }

    Ok(out)
}

/// Decode a plain-text file, tolerating invalid UTF-8
pub fn extract_text_from_txt(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extract text from an uploaded file, dispatching on the extension.
/// Unknown extensions are treated as plain text.
pub fn extract_text_from_file(bytes: &[u8], filename: &str) -> Result<String> {
    let lower = filename.to_lowercase();
    debug!(filename, "extracting text from uploaded file");

    if lower.ends_with(".pdf") {
        extract_text_from_pdf(bytes)
    } else if lower.ends_with(".docx") || lower.ends_with(".doc") {
        extract_text_from_docx(bytes)
    } else if lower.ends_with(".html") || lower.ends_with(".htm") {
        Ok(extract_text_from_html(&String::from_utf8_lossy(bytes)))
    } else {
        Ok(extract_text_from_txt(bytes))
    }
}

/// Clean up text before extraction: trim lines, drop empty ones
pub fn preprocess_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
