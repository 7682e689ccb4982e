//! Overlapping text chunker
//!
//! Windows are measured in characters. A window that does not reach the end
//! of the text is shortened to its last paragraph break, or failing that its
//! last sentence break, so chunks tend to end on natural boundaries.

use crate::{DocumentError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SENTENCE_ENDS: [char; 3] = ['.', '!', '?'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(DocumentError::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into trimmed, non-empty, overlapping chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);
            if end < len {
                if let Some(split) = natural_break(&chars[start..end], self.overlap) {
                    end = start + split + 1;
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= len {
                break;
            }
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        tracing::debug!(
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            overlap = self.overlap,
            "Chunked document text"
        );
        chunks
    }
}

/// Index of the last paragraph break, else the last sentence break,
/// ignoring breaks before `min` so the next window still moves forward.
fn natural_break(window: &[char], min: usize) -> Option<usize> {
    let last = |pred: fn(char, char) -> bool| {
        window
            .windows(2)
            .enumerate()
            .rev()
            .take_while(|(i, _)| *i >= min)
            .find(|(_, pair)| pred(pair[0], pair[1]))
            .map(|(i, _)| i)
    };

    last(|a, b| a == '\n' && b == '\n')
        .or_else(|| last(|a, b| SENTENCE_ENDS.contains(&a) && b == ' '))
}
