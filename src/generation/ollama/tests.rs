use super::*;
use crate::config::Config;

#[test]
fn generator_configuration() {
    let mut config = Config::default();
    config.ollama.generation_model = "answer-model".to_string();
    config.answer.temperature = 0.0;

    let generator = OllamaGenerator::new(&config).expect("should create generator");

    assert_eq!(generator.model_id(), "answer-model");
    assert_eq!(generator.temperature, 0.0);
    assert_eq!(
        generator.transport.base_url().host_str(),
        Some("localhost")
    );
}

#[test]
fn request_serialization_pins_temperature() {
    let request = GenerateRequest {
        model: "llama3:latest".to_string(),
        prompt: "Contexto:\n...\n\nPregunta: ...".to_string(),
        stream: false,
        options: GenerateOptions { temperature: 0.0 },
    };

    let json = serde_json::to_string(&request).expect("should serialize request");
    assert!(json.contains("\"stream\":false"));
    assert!(json.contains("\"temperature\":0.0"));
}
