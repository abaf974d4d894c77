// Vector index module
// Persistent chunk storage and nearest-neighbor search on LanceDB


pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{ScoredChunk, VectorIndex};

/// Embedding record stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding
    pub vector: Vec<f32>,
    /// The chunk this embedding represents
    pub chunk: ChunkRecord,
}

/// Chunk stored alongside its embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Source reference: file name plus page number
    pub source: String,
    /// The chunk text
    pub content: String,
    /// Index of this chunk within its source page
    pub chunk_index: u32,
}

/// Metadata record persisted next to the index storage files.
///
/// Names the embedding model the index was built with; an index opened under
/// a different model is rejected instead of silently mixing embedding spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub embedding_model: String,
    pub dimension: u32,
    pub chunk_count: u64,
    pub created_at: String,
}
