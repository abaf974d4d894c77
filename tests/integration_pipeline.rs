#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// End-to-end tests for the question-answering pipeline with test-double
/// model providers and generated PDF fixtures
use lopdf::content::{Content, Operation};
use lopdf::{Document as PdfDocument, Object, Stream, dictionary};
use pdfqa::config::Config;
use pdfqa::embeddings::EmbeddingProvider;
use pdfqa::generation::GenerationProvider;
use pdfqa::index::{ChunkRecord, EmbeddingRecord, VectorIndex};
use pdfqa::pipeline::QaPipeline;
use pdfqa::{QaError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const STUB_MODEL: &str = "stub-embedder";

/// Deterministic embedding double: a normalized byte-histogram feature vector
struct StubEmbedder;

fn feature_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 8];
    for byte in text.bytes() {
        vector[byte as usize % 8] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        STUB_MODEL
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(feature_vector(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| feature_vector(text)).collect())
    }
}

/// Generation double that records prompts and returns a fixed answer
struct RecordingGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    answer: String,
}

impl RecordingGenerator {
    fn returning(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            answer: answer.to_string(),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .expect("prompt mutex should not be poisoned")
            .last()
            .cloned()
    }
}

impl GenerationProvider for RecordingGenerator {
    fn model_id(&self) -> &str {
        "stub-generator"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt mutex should not be poisoned")
            .push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

/// Generation double whose backing service is unreachable
struct FailingGenerator;

impl GenerationProvider for FailingGenerator {
    fn model_id(&self) -> &str {
        "stub-generator"
    }

    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(QaError::GenerationUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Write a minimal single-page PDF containing `text`
fn write_pdf(path: &Path, text: &str) {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("should encode page content"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path).expect("should save test PDF");
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.pdf_dir = root.join("pdfs");
    config.storage.index_dir = root.join("index");
    config
}

#[tokio::test]
async fn answers_question_from_single_chunk_corpus() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    std::fs::create_dir_all(&config.storage.pdf_dir).expect("should create pdf dir");
    write_pdf(
        &config.storage.pdf_dir.join("capitals.pdf"),
        "The capital of Uruguay is Montevideo.",
    );

    let generator = RecordingGenerator::returning("Montevideo");
    let pipeline = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::clone(&generator) as Arc<dyn GenerationProvider>,
    )
    .await
    .expect("bootstrap should ingest and open the index");

    assert!(pipeline.is_ready());

    // One short page with max 1000 / overlap 200 yields exactly one chunk
    let index = VectorIndex::open(&config.storage.index_dir, STUB_MODEL)
        .await
        .expect("should open index");
    assert_eq!(index.metadata().chunk_count, 1);

    let answer = pipeline
        .answer("What is the capital of Uruguay?")
        .await
        .expect("should answer");

    assert_eq!(answer, "Montevideo");
    assert_eq!(generator.call_count(), 1);

    let prompt = generator.last_prompt().expect("generator saw a prompt");
    assert!(prompt.contains("Montevideo"));
    assert!(prompt.contains("Pregunta: What is the capital of Uruguay?"));
    assert!(prompt.contains("No puedo responder"));
}

#[tokio::test]
async fn answer_is_sanitized() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    std::fs::create_dir_all(&config.storage.pdf_dir).expect("should create pdf dir");
    write_pdf(
        &config.storage.pdf_dir.join("capitals.pdf"),
        "The capital of Uruguay is Montevideo.",
    );

    let generator = RecordingGenerator::returning("  \"Montevideo\"\n");
    let pipeline = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::clone(&generator) as Arc<dyn GenerationProvider>,
    )
    .await
    .expect("bootstrap should succeed");

    let answer = pipeline
        .answer("What is the capital of Uruguay?")
        .await
        .expect("should answer");
    assert_eq!(answer, "Montevideo");
}

#[tokio::test]
async fn empty_corpus_degrades_and_queries_fail_fast() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    // Empty PDF directory: ingestion fails with EmptyCorpus
    std::fs::create_dir_all(&config.storage.pdf_dir).expect("should create pdf dir");
    let ingest_result = pdfqa::ingest::run(&config, &StubEmbedder).await;
    assert!(matches!(ingest_result, Err(QaError::EmptyCorpus)));

    // Bootstrap continues degraded instead of crashing
    let generator = RecordingGenerator::returning("unused");
    let pipeline = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::clone(&generator) as Arc<dyn GenerationProvider>,
    )
    .await
    .expect("bootstrap should degrade, not fail");

    assert!(!pipeline.is_ready());

    let result = pipeline.answer("Any question at all?").await;
    assert!(matches!(result, Err(QaError::IndexNotFound(_))));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn generation_failure_is_distinct_from_sentinel() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    std::fs::create_dir_all(&config.storage.pdf_dir).expect("should create pdf dir");
    write_pdf(
        &config.storage.pdf_dir.join("capitals.pdf"),
        "The capital of Uruguay is Montevideo.",
    );

    let pipeline = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::new(FailingGenerator),
    )
    .await
    .expect("bootstrap should succeed");

    let result = pipeline.answer("What is the capital of Uruguay?").await;
    assert!(matches!(result, Err(QaError::GenerationUnavailable(_))));
}

#[tokio::test]
async fn blank_context_short_circuits_without_calling_the_model() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    // Index holding only a whitespace chunk: retrieval filters it out and
    // the sentinel is returned without any generation call
    let records = vec![EmbeddingRecord {
        id: "blank".to_string(),
        vector: feature_vector("   "),
        chunk: ChunkRecord {
            source: "blank.pdf#page=1".to_string(),
            content: "   \n ".to_string(),
            chunk_index: 0,
        },
    }];
    VectorIndex::build(&config.storage.index_dir, STUB_MODEL, &records)
        .await
        .expect("should build index");

    let generator = RecordingGenerator::returning("unused");
    let pipeline = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::clone(&generator) as Arc<dyn GenerationProvider>,
    )
    .await
    .expect("bootstrap should succeed");

    let answer = pipeline
        .answer("What is the capital of Uruguay?")
        .await
        .expect("should answer");

    assert_eq!(answer, "No puedo responder");
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn mismatched_embedding_model_fails_bootstrap() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path());

    let records = vec![EmbeddingRecord {
        id: "one".to_string(),
        vector: vec![1.0, 0.0],
        chunk: ChunkRecord {
            source: "a.pdf#page=1".to_string(),
            content: "Indexed with another model.".to_string(),
            chunk_index: 0,
        },
    }];
    VectorIndex::build(&config.storage.index_dir, "other-model", &records)
        .await
        .expect("should build index");

    let result = QaPipeline::bootstrap_with(
        &config,
        Arc::new(StubEmbedder),
        Arc::new(FailingGenerator),
    )
    .await;

    assert!(matches!(result, Err(QaError::EmbeddingMismatch { .. })));
}
