// Configuration management module
// Handles the TOML configuration file and validated settings

pub mod settings;

pub use settings::{
    AnswerConfig, Config, ConfigError, OllamaConfig, RetrievalConfig, StorageConfig,
};
