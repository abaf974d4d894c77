use super::*;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.embedding_model, "llama3:latest");
    assert_eq!(config.ollama.generation_model, "llama3:latest");
    assert_eq!(config.ollama.batch_size, 64);
    assert_eq!(config.chunking.max_chars, 1000);
    assert_eq!(config.chunking.overlap_chars, 200);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.answer.sentinel, "No puedo responder");
    assert_eq!(config.answer.temperature, 0.0);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.embedding_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.generation_model = "   ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.answer.temperature = -0.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.answer.sentinel = String::new();
    assert!(invalid_config.validate().is_err());
}

#[test]
fn chunking_validation() {
    let mut config = Config::default();
    config.chunking.max_chars = 100;
    config.chunking.overlap_chars = 100;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunking {
            max: 100,
            overlap: 100
        })
    ));

    config.chunking.overlap_chars = 99;
    assert!(config.validate().is_ok());

    config.chunking.max_chars = 0;
    config.chunking.overlap_chars = 0;
    assert!(config.validate().is_err());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn load_missing_config() {
    let config = Config::load().expect("should load config successfully");
    assert_eq!(config, Config::default());
}
