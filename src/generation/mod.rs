// Generation module
// The language-model capability used to produce answers

pub mod ollama;

use crate::Result;

/// Capability of completing a prompt with a named language model.
///
/// Implementations must decode deterministically at temperature zero so that
/// identical prompts yield identical answers.
pub trait GenerationProvider: Send + Sync {
    /// Identity of the backing generation model
    fn model_id(&self) -> &str;

    /// Complete the given prompt and return the raw model output
    fn generate(&self, prompt: &str) -> Result<String>;
}

pub use ollama::OllamaGenerator;
