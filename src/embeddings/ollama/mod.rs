
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::ollama::{OllamaTransport, TransportError};
use crate::{QaError, Result};

/// Embedding client backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    transport: OllamaTransport,
    model: String,
    batch_size: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn provider_error(error: TransportError) -> QaError {
    QaError::ProviderUnavailable(error.to_string())
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let transport = OllamaTransport::new(config)?;
        Ok(Self {
            transport,
            model: config.ollama.embedding_model.clone(),
            batch_size: config.ollama.batch_size,
        })
    }

    #[inline]
    pub fn with_transport(transport: OllamaTransport, model: String, batch_size: u32) -> Self {
        Self {
            transport,
            model,
            batch_size,
        }
    }

    /// Test connection to the Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!(
            "Performing health check for embedding model {} at {}",
            self.model,
            self.transport.base_url()
        );

        self.transport.ping().map_err(provider_error)?;
        self.transport
            .validate_model(&self.model)
            .map_err(provider_error)?;

        info!(
            "Health check passed for embedding model {} at {}",
            self.model,
            self.transport.base_url()
        );
        Ok(())
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.len() == 1 {
            return Ok(vec![self.embed(&texts[0])?]);
        }

        let request = BatchEmbedRequest {
            model: self.model.clone(),
            inputs: texts.to_vec(),
        };
        let request_json = serde_json::to_string(&request)
            .context("Failed to serialize batch embedding request")?;

        let response_text = self
            .transport
            .post_json("/api/embed", &request_json)
            .map_err(provider_error)?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse batch embedding response")?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            )
            .into());
        }

        Ok(batch_response.embeddings)
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .transport
            .post_json("/api/embed", &request_json)
            .map_err(provider_error)?;

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        debug!(
            "Generated embedding with {} dimensions",
            embed_response.embedding.len()
        );

        Ok(embed_response.embedding)
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let mut batch_results = self.embed_single_batch(batch)?;
            results.append(&mut batch_results);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }
}
