use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("No indexable content found in the PDF directory")]
    EmptyCorpus,

    #[error("Index was built with embedding model '{indexed}' but '{configured}' is configured")]
    EmbeddingMismatch { indexed: String, configured: String },

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Generation model unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Vector index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Vector index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Failed to write vector index: {0}")]
    StorageWrite(String),

    #[error("Another ingestion is already running (lock file: {})", .0.display())]
    IngestLocked(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<crate::config::ConfigError> for QaError {
    #[inline]
    fn from(err: crate::config::ConfigError) -> Self {
        QaError::Config(err.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
