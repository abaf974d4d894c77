// Corpus module
// Loads the PDF corpus from disk and extracts per-page text


use anyhow::Context;
use lopdf::Document as PdfDocument;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{QaError, Result};

/// Raw text extracted from one PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Source reference: file name plus page number
    pub source: String,
    /// Full extracted page text
    pub text: String,
}

/// Load every PDF in `pdf_dir` and extract one [`Document`] per page.
///
/// Files are visited in file-name order so repeated loads of an unchanged
/// directory produce the same sequence. Unreadable files and pages without
/// extractable text are logged and skipped; they only fail the load when
/// nothing at all could be extracted.
#[inline]
pub fn load_corpus(pdf_dir: &Path) -> Result<Vec<Document>> {
    if !pdf_dir.is_dir() {
        return Err(QaError::CorpusNotFound(pdf_dir.to_path_buf()));
    }

    let mut pdf_paths = Vec::new();
    for entry in std::fs::read_dir(pdf_dir)? {
        let path = entry?.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdf_paths.push(path);
        }
    }
    pdf_paths.sort();

    let mut documents = Vec::new();
    for path in &pdf_paths {
        match load_pdf_pages(path) {
            Ok(mut pages) => documents.append(&mut pages),
            Err(e) => warn!("Skipping unreadable PDF {}: {:#}", path.display(), e),
        }
    }

    if documents.is_empty() {
        return Err(QaError::EmptyCorpus);
    }

    info!(
        "Loaded {} pages from {} PDF files in {}",
        documents.len(),
        pdf_paths.len(),
        pdf_dir.display()
    );

    Ok(documents)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Extract one document per page of a single PDF file
fn load_pdf_pages(path: &Path) -> anyhow::Result<Vec<Document>> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown.pdf")
        .to_string();

    let pdf = PdfDocument::load(path)
        .with_context(|| format!("Failed to parse PDF: {}", path.display()))?;

    let mut documents = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        match pdf.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => documents.push(Document {
                source: format!("{}#page={}", file_name, page_number),
                text,
            }),
            Ok(_) => debug!(
                "Page {} of {} has no extractable text",
                page_number, file_name
            ),
            Err(e) => warn!(
                "Failed to extract text from page {} of {}: {}",
                page_number, file_name, e
            ),
        }
    }

    Ok(documents)
}
