//! Parley Document - text extraction for grounding answers
//!
//! Turns a PDF reference (path, stream, or in-memory bytes) into plain text.
//! Expected outcomes like "file missing" or "encrypted" are explicit
//! [`Extraction`] variants rather than errors; only invalid configuration
//! produces a [`DocumentError`].

mod chunk;
mod extract;
mod source;

pub use chunk::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use extract::{extract_text, ExtractedText, Extraction, Extractor, DEFAULT_MAX_CHARS};
pub use source::DocumentSource;

/// Errors from document configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("Invalid chunking: overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Invalid extraction limit: max_chars must be at least 1")]
    InvalidLimit,
}

pub type Result<T> = std::result::Result<T, DocumentError>;
