use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::embeddings::OllamaEmbedder;
use crate::generation::OllamaGenerator;
use crate::index::VectorIndex;
use crate::ingest;
use crate::ollama::OllamaTransport;
use crate::pipeline::QaPipeline;
use crate::{QaError, Result};

/// Build the vector index from the configured PDF directory
#[inline]
pub async fn run_ingest(config: &Config) -> Result<()> {
    info!(
        "Ingesting PDFs from {} into {}",
        config.storage.pdf_dir.display(),
        config.storage.index_dir.display()
    );

    let embedder = OllamaEmbedder::new(config)?;
    embedder.health_check()?;

    let stats = ingest::run(config, &embedder).await?;

    println!("Ingestion complete!");
    println!("  Pages loaded: {}", stats.documents);
    println!("  Chunks indexed: {}", stats.chunks);
    println!("  Embeddings generated: {}", stats.embeddings);

    Ok(())
}

/// Answer a single question against the indexed corpus
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let embedder = OllamaEmbedder::new(config)?;
    let generator = OllamaGenerator::new(config)?;
    generator.health_check()?;

    let pipeline =
        QaPipeline::bootstrap_with(config, Arc::new(embedder), Arc::new(generator)).await?;
    let answer = pipeline.answer(question).await?;

    println!("{}", answer);
    Ok(())
}

/// Show the status of the persisted index and the Ollama connection
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("PDF directory: {}", config.storage.pdf_dir.display());
    println!("Index directory: {}", config.storage.index_dir.display());

    if VectorIndex::exists(&config.storage.index_dir) {
        match VectorIndex::open(&config.storage.index_dir, &config.ollama.embedding_model).await {
            Ok(index) => {
                let chunk_count = index.count().await?;
                let metadata = index.metadata();
                println!("Index: ready");
                println!("  Embedding model: {}", metadata.embedding_model);
                println!("  Dimensions: {}", metadata.dimension);
                println!("  Chunks: {}", chunk_count);
                println!("  Created: {}", metadata.created_at);
            }
            Err(e) => println!("Index: unusable ({})", e),
        }
    } else {
        println!("Index: not built (run 'pdfqa ingest')");
    }

    let transport = OllamaTransport::new(config)?;
    match transport.ping() {
        Ok(()) => {
            println!("Ollama: reachable at {}", transport.base_url());
            match transport.list_models() {
                Ok(models) => {
                    for model in [
                        &config.ollama.embedding_model,
                        &config.ollama.generation_model,
                    ] {
                        let available = models.iter().any(|m| &m.name == model);
                        let status = if available { "available" } else { "missing" };
                        println!("  Model {}: {}", model, status);
                    }
                }
                Err(e) => println!("  Could not list models: {}", e),
            }
        }
        Err(e) => println!("Ollama: unreachable ({})", e),
    }

    Ok(())
}

/// Print the active configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load()?;
    let content = toml::to_string_pretty(&config).map_err(|e| QaError::Config(e.to_string()))?;
    let path = Config::config_file_path()?;

    println!("# Configuration file: {}", path.display());
    if !path.exists() {
        println!("# (file not present, showing defaults)");
    }
    print!("{}", content);

    Ok(())
}

/// Write a default configuration file if none exists
#[inline]
pub fn init_config() -> Result<()> {
    let path = Config::config_file_path()?;
    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    Config::default().save()?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}
