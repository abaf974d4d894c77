#[cfg(test)]
mod tests;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::generation::GenerationProvider;
use crate::ollama::{OllamaTransport, TransportError};
use crate::{QaError, Result};

/// Generation client backed by an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    transport: OllamaTransport,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

fn generation_error(error: TransportError) -> QaError {
    QaError::GenerationUnavailable(error.to_string())
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let transport = OllamaTransport::new(config)?;
        Ok(Self {
            transport,
            model: config.ollama.generation_model.clone(),
            temperature: config.answer.temperature,
        })
    }

    #[inline]
    pub fn with_transport(transport: OllamaTransport, model: String, temperature: f32) -> Self {
        Self {
            transport,
            model,
            temperature,
        }
    }

    /// Test connection to the Ollama server and verify model availability
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!(
            "Performing health check for generation model {} at {}",
            self.model,
            self.transport.base_url()
        );

        self.transport.ping().map_err(generation_error)?;
        self.transport
            .validate_model(&self.model)
            .map_err(generation_error)?;

        info!(
            "Health check passed for generation model {} at {}",
            self.model,
            self.transport.base_url()
        );
        Ok(())
    }
}

impl GenerationProvider for OllamaGenerator {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating completion with model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .transport
            .post_json("/api/generate", &request_json)
            .map_err(generation_error)?;

        let generate_response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        debug!(
            "Received completion of {} bytes",
            generate_response.response.len()
        );

        Ok(generate_response.response)
    }
}
