// Pipeline module
// The bootstrap-then-serve lifecycle and the answer(question) boundary


use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, OllamaEmbedder};
use crate::generation::{GenerationProvider, OllamaGenerator};
use crate::index::{ScoredChunk, VectorIndex};
use crate::ingest;
use crate::prompt::{assemble_context, build_prompt, sanitize_answer};
use crate::{QaError, Result};

/// Question-answering pipeline over the persisted vector index.
///
/// Construction follows a fixed order: embedding provider, then index, then
/// generation client. When no index exists at bootstrap the ingestion
/// pipeline runs once; if that fails the pipeline still starts in a degraded
/// state and queries fail fast with [`QaError::IndexNotFound`].
pub struct QaPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    index: Option<VectorIndex>,
    index_dir: PathBuf,
    top_k: usize,
    language: String,
    sentinel: String,
}

impl QaPipeline {
    /// Bootstrap the pipeline with Ollama-backed providers
    #[inline]
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let embedder = Arc::new(OllamaEmbedder::new(config)?);
        let generator = Arc::new(OllamaGenerator::new(config)?);
        Self::bootstrap_with(config, embedder, generator).await
    }

    /// Bootstrap the pipeline with explicitly constructed providers.
    ///
    /// Both pipelines must use the same embedding provider; the index opened
    /// here rejects a model identity other than the one it was built with.
    #[inline]
    pub async fn bootstrap_with(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let index_dir = config.storage.index_dir.clone();

        if !VectorIndex::exists(&index_dir) {
            info!(
                "No vector index at {}, running ingestion",
                index_dir.display()
            );
            match ingest::run(config, embedder.as_ref()).await {
                Ok(stats) => info!("Ingestion created index with {} chunks", stats.chunks),
                Err(e) => warn!("Ingestion failed, continuing without index: {}", e),
            }
        }

        let index = match VectorIndex::open(&index_dir, embedder.model_id()).await {
            Ok(index) => Some(index),
            Err(QaError::IndexNotFound(path)) => {
                warn!("Serving without a vector index (none at {})", path.display());
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            embedder,
            generator,
            index,
            index_dir,
            top_k: config.retrieval.top_k,
            language: config.answer.language.clone(),
            sentinel: config.answer.sentinel.clone(),
        })
    }

    /// Whether an index is loaded and questions can be answered
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Embed the question and return the nearest chunks, blank ones filtered
    #[inline]
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| QaError::IndexNotFound(self.index_dir.clone()))?;

        let query_vector = self.embedder.embed(question)?;
        let retrieved = index.search(&query_vector, self.top_k).await?;

        Ok(retrieved
            .into_iter()
            .filter(|scored| !scored.chunk.content.trim().is_empty())
            .collect())
    }

    /// Answer a question from the indexed corpus.
    ///
    /// Returns the configured sentinel phrase when the question is blank or
    /// when retrieval produces no usable context; the generation model is
    /// only invoked with a non-empty context block.
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Ok(self.sentinel.clone());
        }

        let retrieved = self.retrieve(question).await?;
        let context = assemble_context(&retrieved);

        if context.is_empty() {
            info!("No usable context retrieved, returning sentinel");
            return Ok(self.sentinel.clone());
        }

        let prompt = build_prompt(question, &context, &self.language, &self.sentinel);
        let raw = self.generator.generate(&prompt)?;

        Ok(sanitize_answer(&raw))
    }
}
