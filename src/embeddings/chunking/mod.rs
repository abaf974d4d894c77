
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::config::ConfigError;
use crate::corpus::Document;

/// A chunk of a source document, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    /// The chunk text
    pub content: String,
    /// Source reference inherited from the parent document
    pub source: String,
    /// The index of this chunk within its document
    pub chunk_index: u32,
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub max_chars: usize,
    /// Number of characters shared between consecutive chunks
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 200,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_chars == 0 || self.overlap_chars >= self.max_chars {
            return Err(ConfigError::InvalidChunking {
                max: self.max_chars,
                overlap: self.overlap_chars,
            });
        }
        Ok(())
    }
}

/// Split a document into overlapping chunks tagged with its source reference
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Result<Vec<DocumentChunk>> {
    let chunks = chunk_text(&document.text, config)?
        .into_iter()
        .enumerate()
        .map(|(i, content)| DocumentChunk {
            content,
            source: document.source.clone(),
            chunk_index: i as u32,
        })
        .collect::<Vec<_>>();

    debug!(
        "Chunked document '{}' into {} chunks",
        document.source,
        chunks.len()
    );

    Ok(chunks)
}

/// Split text into chunks of at most `max_chars` characters, consecutive
/// chunks sharing exactly `overlap_chars` characters.
///
/// Chunk boundaries prefer the largest available split point inside the
/// window: a paragraph break, then a sentence end, then whitespace, then a
/// hard cut at the maximum length. Lengths are measured in characters, not
/// bytes, so multi-byte text never splits inside a scalar value. Identical
/// input and parameters always produce identical chunks.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    config.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let max = config.max_chars;
    let overlap = config.overlap_chars;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        if chars.len() - start <= max {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let window = &chars[start..start + max];
        // A split point must clear the overlap, or the next chunk would not
        // advance past the current one.
        let min_offset = overlap.max(max / 3);
        let split = find_split_point(window, min_offset).unwrap_or(max);

        let end = start + split;
        chunks.push(chars[start..end].iter().collect());
        start = end - overlap;
    }

    Ok(chunks)
}

/// Find the largest semantic boundary past `min_offset` in a window of
/// characters, returning the chunk length (in characters) that ends at it
fn find_split_point(window: &[char], min_offset: usize) -> Option<usize> {
    // Paragraph boundary: two consecutive newlines
    for i in (1..window.len()).rev() {
        if window[i] == '\n' && window[i - 1] == '\n' && i + 1 > min_offset {
            return Some(i + 1);
        }
    }

    // Sentence boundary: terminator followed by whitespace
    for i in (0..window.len().saturating_sub(1)).rev() {
        if matches!(window[i], '.' | '!' | '?') && window[i + 1].is_whitespace() && i + 2 > min_offset
        {
            return Some(i + 2);
        }
    }

    // Word boundary
    for i in (0..window.len()).rev() {
        if window[i].is_whitespace() && i + 1 > min_offset {
            return Some(i + 1);
        }
    }

    None
}
