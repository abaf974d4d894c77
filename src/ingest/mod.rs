// Ingest module
// One-shot pipeline: load PDFs, chunk, embed, and build the vector index


use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::embeddings::{EmbeddingProvider, chunk_document};
use crate::index::{ChunkRecord, EmbeddingRecord, VectorIndex};
use crate::{QaError, Result};

/// Statistics about a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub embeddings: usize,
}

/// Exclusive lock held while ingestion runs against an index path.
///
/// Prevents two ingestions from racing on the same index directory; the lock
/// file is removed when the guard drops.
struct IngestLock {
    path: PathBuf,
}

impl IngestLock {
    fn acquire(index_dir: &Path) -> Result<Self> {
        let path = index_dir.with_extension("lock");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(QaError::IngestLocked(path))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Run the full ingestion pipeline and build a fresh index at the configured
/// path.
///
/// The index records the embedding model identity so queries with a
/// differently configured model are rejected on load.
#[inline]
pub async fn run(config: &Config, embedder: &dyn EmbeddingProvider) -> Result<IngestStats> {
    config.validate()?;

    let _lock = IngestLock::acquire(&config.storage.index_dir)?;

    info!(
        "Starting ingestion from {} with embedding model {}",
        config.storage.pdf_dir.display(),
        embedder.model_id()
    );

    let documents = load_corpus(&config.storage.pdf_dir)?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Chunking {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut chunks = Vec::new();
    for document in &documents {
        bar.set_message(document.source.clone());
        let mut document_chunks = chunk_document(document, &config.chunking)?;
        document_chunks.retain(|chunk| {
            let keep = !chunk.content.trim().is_empty();
            if !keep {
                warn!("Skipping blank chunk from {}", chunk.source);
            }
            keep
        });
        chunks.append(&mut document_chunks);
        bar.inc(1);
    }
    bar.finish_and_clear();

    if chunks.is_empty() {
        return Err(QaError::EmptyCorpus);
    }

    info!(
        "Embedding {} chunks with model {}",
        chunks.len(),
        embedder.model_id()
    );

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts)?;

    if vectors.len() != chunks.len() {
        return Err(anyhow::anyhow!(
            "Embedding count {} does not match chunk count {}",
            vectors.len(),
            chunks.len()
        )
        .into());
    }

    let records: Vec<EmbeddingRecord> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddingRecord {
            id: Uuid::new_v4().to_string(),
            vector,
            chunk: ChunkRecord {
                source: chunk.source.clone(),
                content: chunk.content.clone(),
                chunk_index: chunk.chunk_index,
            },
        })
        .collect();

    let embeddings = records.len();
    VectorIndex::build(&config.storage.index_dir, embedder.model_id(), &records).await?;

    let stats = IngestStats {
        documents: documents.len(),
        chunks: chunks.len(),
        embeddings,
    };

    info!(
        "Ingestion complete: {} pages, {} chunks, {} embeddings",
        stats.documents, stats.chunks, stats.embeddings
    );

    Ok(stats)
}
