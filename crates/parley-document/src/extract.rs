//! PDF text extraction
//!
//! Pages are rendered as `--- Page N ---` sections so the model can cite
//! page numbers. Long documents are cut at a character budget.

use crate::{DocumentError, DocumentSource, Result};
use std::fmt;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// Default character budget for extracted text
pub const DEFAULT_MAX_CHARS: usize = 50_000;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ENCRYPT_MARKER: &[u8] = b"/Encrypt";
/// Bytes searched for the `/Encrypt` key at the end of the file (trailer)
/// and at the start (first-page trailer of linearized files)
const TRAILER_WINDOW: usize = 4096;
const LINEARIZED_WINDOW: usize = 1024;

/// Successfully extracted document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Rendered text, possibly truncated
    pub text: String,
    /// Pages in the document
    pub total_pages: usize,
    /// Pages that produced any text
    pub text_pages: usize,
    /// Whether `text` was cut to the character budget
    pub truncated: bool,
    /// Length in characters before truncation
    pub original_chars: usize,
}

/// Outcome of extracting text from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(ExtractedText),
    NotFound(PathBuf),
    Encrypted,
    NoPages,
    NoText,
    ReadError(String),
}

impl Extraction {
    pub fn is_text(&self) -> bool {
        matches!(self, Extraction::Text(_))
    }

    /// The extracted text, if extraction succeeded
    pub fn text(&self) -> Option<&str> {
        match self {
            Extraction::Text(extracted) => Some(&extracted.text),
            _ => None,
        }
    }

    /// Text to embed as prompt context: the document text, or a
    /// marker-prefixed diagnostic line for every other outcome.
    pub fn context_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Text(extracted) => f.write_str(&extracted.text),
            Extraction::NotFound(path) => {
                write!(f, "⚠️ PDF file not found: {}", path.display())
            }
            Extraction::Encrypted => f.write_str("🔒 PDF is encrypted and cannot be processed"),
            Extraction::NoPages => f.write_str("⚠️ PDF contains no pages"),
            Extraction::NoText => f.write_str("⚠️ No extractable text found in PDF"),
            Extraction::ReadError(detail) => write!(f, "⚠️ Error reading PDF: {}", detail),
        }
    }
}

/// PDF extractor with a character budget
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    max_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl Extractor {
    pub fn new(max_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(DocumentError::InvalidLimit);
        }
        Ok(Self { max_chars })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Resolve the source and extract its text. Blocking; call from
    /// `spawn_blocking` in async contexts.
    pub fn extract(&self, source: DocumentSource) -> Extraction {
        let name = source.name();
        let outcome = match source {
            DocumentSource::Path(path) => {
                if !path.exists() {
                    Extraction::NotFound(path)
                } else {
                    match std::fs::read(&path) {
                        Ok(data) => self.extract_bytes(&data),
                        Err(e) => Extraction::ReadError(e.to_string()),
                    }
                }
            }
            DocumentSource::Stream { mut reader, .. } => {
                let mut data = Vec::new();
                match reader.read_to_end(&mut data) {
                    Ok(_) => self.extract_bytes(&data),
                    Err(e) => Extraction::ReadError(e.to_string()),
                }
            }
            DocumentSource::Bytes { data, .. } => self.extract_bytes(&data),
        };

        match &outcome {
            Extraction::Text(extracted) => tracing::info!(
                document = %name,
                pages = extracted.total_pages,
                chars = extracted.original_chars,
                truncated = extracted.truncated,
                "Extracted document text"
            ),
            other => tracing::warn!(document = %name, outcome = %other, "Document extraction failed"),
        }
        outcome
    }

    /// Extract text from raw PDF bytes
    pub fn extract_bytes(&self, data: &[u8]) -> Extraction {
        if !data.starts_with(PDF_MAGIC) {
            return Extraction::ReadError("Invalid or corrupted PDF: missing %PDF header".to_string());
        }
        if is_encrypted(data) {
            return Extraction::Encrypted;
        }

        // The parser panics on some malformed inputs.
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }));

        match parsed {
            Ok(Ok(pages)) => self.render_pages(pages),
            Ok(Err(e)) => Extraction::ReadError(format!("Invalid or corrupted PDF: {}", e)),
            Err(_) => Extraction::ReadError("PDF parser failed on malformed input".to_string()),
        }
    }

    /// Assemble per-page text into the final extraction result
    pub fn render_pages<S: AsRef<str>>(&self, pages: Vec<S>) -> Extraction {
        if pages.is_empty() {
            return Extraction::NoPages;
        }

        let sections: Vec<String> = pages
            .iter()
            .enumerate()
            .filter_map(|(i, page)| {
                let text = page.as_ref().trim();
                (!text.is_empty()).then(|| format!("--- Page {} ---\n{}", i + 1, text))
            })
            .collect();

        if sections.is_empty() {
            return Extraction::NoText;
        }

        let text_pages = sections.len();
        let mut text = sections.join("\n\n");
        let original_chars = text.chars().count();
        let truncated = original_chars > self.max_chars;
        if truncated {
            if let Some((cut, _)) = text.char_indices().nth(self.max_chars) {
                text.truncate(cut);
            }
            text.push_str(&format!(
                "\n\n[Text truncated - original length: {} characters]",
                original_chars
            ));
        }

        Extraction::Text(ExtractedText {
            text,
            total_pages: pages.len(),
            text_pages,
            truncated,
            original_chars,
        })
    }
}

/// Extract text with the default character budget
pub fn extract_text(source: DocumentSource) -> Extraction {
    Extractor::default().extract(source)
}

/// Look for an `/Encrypt` entry where trailers live rather than in page content
fn is_encrypted(data: &[u8]) -> bool {
    let tail = &data[data.len().saturating_sub(TRAILER_WINDOW)..];
    let head = &data[..data.len().min(LINEARIZED_WINDOW)];
    contains(tail, ENCRYPT_MARKER) || contains(head, ENCRYPT_MARKER)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
