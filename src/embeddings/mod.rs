// Embeddings module
// Content chunking and the embedding-provider capability

pub mod chunking;
pub mod ollama;

use crate::Result;

/// Capability of mapping text into a fixed-dimensionality vector space.
///
/// Ingestion and querying must use the same provider and model; the model
/// identity reported by [`model_id`](EmbeddingProvider::model_id) is recorded
/// in the index metadata and checked when the index is reopened.
pub trait EmbeddingProvider: Send + Sync {
    /// Identity of the backing embedding model
    fn model_id(&self) -> &str;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts, preserving input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub use chunking::{ChunkingConfig, DocumentChunk, chunk_document, chunk_text};
pub use ollama::OllamaEmbedder;
