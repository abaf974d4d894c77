// Ollama transport module
// Shared HTTP plumbing for the embedding and generation clients


use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::{Config, ConfigError};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// HTTP transport to one Ollama server, shared by both model clients
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Ollama server unreachable: {0}")]
    Unreachable(String),
    #[error("Ollama rejected the request (HTTP {0})")]
    Rejected(u16),
    #[error("Invalid response from Ollama: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaTransport {
    #[inline]
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::from_url(config.ollama_url()?))
    }

    #[inline]
    pub fn from_url(base_url: Url) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<(), TransportError> {
        debug!("Pinging Ollama server at {}", self.base_url);
        self.get_text("/api/tags")?;
        debug!("Server ping successful");
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, TransportError> {
        let response_text = self.get_text("/api/tags")?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| TransportError::Invalid(format!("Failed to parse models: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Validate that the given model is available on the server
    #[inline]
    pub fn validate_model(&self, model: &str) -> Result<(), TransportError> {
        debug!("Validating model: {}", model);

        let models = self.list_models()?;
        if models.iter().any(|m| m.name == model) {
            debug!("Model {} is available", model);
            Ok(())
        } else {
            let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                model, available_models
            );
            Err(TransportError::Invalid(format!(
                "Model '{}' is not available. Available models: {:?}",
                model, available_models
            )))
        }
    }

    pub(crate) fn post_json(&self, path: &str, body: &str) -> Result<String, TransportError> {
        let url = self.join(path)?;
        self.request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn get_text(&self, path: &str) -> Result<String, TransportError> {
        let url = self.join(path)?;
        self.request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn join(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::Invalid(format!("Failed to build URL for {path}: {e}")))
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> Result<String, TransportError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(TransportError::Rejected(*status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(TransportError::Unreachable(error.to_string()));
                    }

                    last_error = Some(TransportError::Unreachable(error.to_string()));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error
            .unwrap_or_else(|| TransportError::Unreachable("Request failed after retries".into())))
    }
}
