#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Both pipelines against HTTP providers served by a mock server

mod common;

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use common::{create_movie_database, init_test_tracing};
use records_rag::config::{Config, GenerationBackend};
use records_rag::embeddings::OllamaEmbedder;
use records_rag::generation;
use records_rag::indexer::Indexer;
use records_rag::query::QueryPipeline;
use records_rag::source::SqliteSource;
use records_rag::store::MemoryStore;
use records_rag::{ErrorKind, RagError};

const COLLECTION: &str = "imdb_vetores";

/// Answers `/api/embed` with one `[length, word count]` vector per input
struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let embeddings: Vec<Value> = body["input"]
            .as_array()
            .expect("input is an array")
            .iter()
            .map(|text| {
                let text = text.as_str().unwrap_or_default();
                json!([text.len() as f32, text.split_whitespace().count() as f32])
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    let mut config = Config::with_base_dir(dir.path());
    config.ollama.host = url.host_str().expect("mock server has a host").to_string();
    config.ollama.port = url.port().expect("mock server has a port");
    config.ollama.model = "embed-test".to_string();
    config.ollama.batch_size = 2;
    config.ollama.timeout_seconds = 5;
    config.generation.model = "chat-test".to_string();
    config.generation.timeout_seconds = 5;
    config
}

async fn mount_embedder(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn ollama_embeds_and_generates() {
    init_test_tracing();
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "chat-test", "response": "Assista Heat.", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);
    let source = SqliteSource::new(create_movie_database(dir.path()).await, None);
    let embedder = Arc::new(OllamaEmbedder::new(&config.ollama).expect("embedder"));
    let store = Arc::new(MemoryStore::new());
    let generator =
        generation::from_config(&config.generation, &config.ollama).expect("generator");

    let summary = Indexer::new(embedder.clone(), store.clone())
        .build_index(&source, COLLECTION)
        .await
        .expect("indexing should succeed");
    assert_eq!(summary.total_documents, 3);
    assert_eq!(summary.model, "embed-test");

    let answer = QueryPipeline::new(embedder, store, generator)
        .answer("Um bom filme policial", "", 2, COLLECTION)
        .await
        .expect("query should succeed");
    assert_eq!(answer.answer, "Assista Heat.");
    assert_eq!(answer.documents.len(), 2);

    let requests = server.received_requests().await.expect("recording enabled");
    let generate = requests
        .iter()
        .find(|request| request.url.path() == "/api/generate")
        .expect("generation request sent");
    let body: Value = serde_json::from_slice(&generate.body).expect("JSON body");
    assert_eq!(body["model"], "chat-test");
    assert_eq!(body["stream"], false);
    assert!(
        body["prompt"]
            .as_str()
            .is_some_and(|prompt| prompt.contains("Um bom filme policial"))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn gemini_generates_from_ollama_embeddings() {
    init_test_tracing();
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Alien, "}, {"text": "sem dúvida."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let mut config = config_for(&server, &dir);
    config.generation.provider = GenerationBackend::Gemini;
    config.generation.model = "gemini-test".to_string();
    config.generation.gemini_url = server.uri();
    config.generation.api_key = Some("secret".to_string());

    let source = SqliteSource::new(create_movie_database(dir.path()).await, None);
    let embedder = Arc::new(OllamaEmbedder::new(&config.ollama).expect("embedder"));
    let store = Arc::new(MemoryStore::new());
    let generator =
        generation::from_config(&config.generation, &config.ollama).expect("generator");

    Indexer::new(embedder.clone(), store.clone())
        .build_index(&source, COLLECTION)
        .await
        .expect("indexing should succeed");
    let answer = QueryPipeline::new(embedder, store, generator)
        .answer("Um filme de ficção científica", "", 1, COLLECTION)
        .await
        .expect("query should succeed");

    assert_eq!(answer.answer, "Alien, sem dúvida.");
    assert_eq!(answer.documents.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_embedder_fails_indexing() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);
    let mut single_batch = config.ollama.clone();
    single_batch.batch_size = 10;
    let source = SqliteSource::new(create_movie_database(dir.path()).await, None);
    let store = Arc::new(MemoryStore::new());

    let err = Indexer::new(
        Arc::new(OllamaEmbedder::new(&single_batch).expect("embedder")),
        store,
    )
    .build_index(&source, COLLECTION)
    .await
    .expect_err("embedding backend is down");

    assert_eq!(err.kind(), ErrorKind::ProviderFailure);
    assert!(matches!(err, RagError::Embedding(ref msg) if msg.contains("HTTP 503")));
}

#[tokio::test(flavor = "multi_thread")]
async fn generation_error_surfaces_as_generation_failure() {
    init_test_tracing();
    let server = MockServer::start().await;
    mount_embedder(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("temp dir");
    let config = config_for(&server, &dir);
    let source = SqliteSource::new(create_movie_database(dir.path()).await, None);
    let embedder = Arc::new(OllamaEmbedder::new(&config.ollama).expect("embedder"));
    let store = Arc::new(MemoryStore::new());
    let generator =
        generation::from_config(&config.generation, &config.ollama).expect("generator");

    Indexer::new(embedder.clone(), store.clone())
        .build_index(&source, COLLECTION)
        .await
        .expect("indexing should succeed");
    let err = QueryPipeline::new(embedder, store, generator)
        .answer("Qualquer filme", "", 3, COLLECTION)
        .await
        .expect_err("generation backend fails");

    assert!(matches!(err, RagError::GenerationFailed(ref msg) if msg.contains("HTTP 500")));
}
