use super::*;
use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::store::{MemoryStore, VectorStore};
use crate::test_support::{StaticSource, StubEmbedder, StubGenerator};
use serde_json::{Value, json};

fn service(titles: &[&str]) -> (RagService, Arc<StubGenerator>) {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbedder::new());
    let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator::new("Assista A."));

    let indexer = Indexer::new(Arc::clone(&embedder), Arc::clone(&store));
    let pipeline = QueryPipeline::new(
        embedder,
        store,
        Arc::clone(&generator) as Arc<dyn GenerationProvider>,
    );
    let source = Arc::new(StaticSource::titles(titles));

    (RagService::new(indexer, pipeline, source, "movies"), generator)
}

async fn run_lines(service: &RagService, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    service
        .serve(input.as_bytes(), &mut output)
        .await
        .expect("serve should finish");

    String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is json"))
        .collect()
}

#[test]
fn request_parsing() {
    let request: ServeRequest =
        serde_json::from_value(json!({"operacao": "indexar"})).expect("parse");
    assert_eq!(request, ServeRequest::Index);

    let request: ServeRequest =
        serde_json::from_value(json!({"operacao": "perguntar", "pergunta": "A"})).expect("parse");
    assert_eq!(request, ServeRequest::Ask(QueryRequest::new("A")));

    assert!(serde_json::from_value::<ServeRequest>(json!({"operacao": "apagar"})).is_err());
}

#[tokio::test]
async fn index_then_ask() {
    let (service, generator) = service(&["A", "B", "C"]);

    let responses = run_lines(
        &service,
        "{\"operacao\":\"indexar\"}\n\n{\"operacao\":\"perguntar\",\"pergunta\":\"A\",\"top_k\":2}\n",
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["status"], "sucesso");
    assert_eq!(responses[0]["total_documentos"], 3);
    assert_eq!(responses[0]["tabela_vetorizada"], "movies");
    assert_eq!(responses[1]["status"], "sucesso");
    assert_eq!(responses[1]["resposta"], "Assista A.");
    assert_eq!(responses[1]["metadados_filmes"][0]["title"], "A");
    assert!(responses[1]["total_filmes_encontrados"].as_u64().is_some_and(|n| n <= 2));
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn asking_before_indexing_reports_empty_index() {
    let (service, generator) = service(&["A"]);

    let responses = run_lines(&service, "{\"operacao\":\"perguntar\",\"pergunta\":\"A\"}\n").await;

    assert_eq!(responses[0]["status"], "erro");
    assert_eq!(
        responses[0]["detalhes"],
        "O banco vetorial está vazio. Execute a indexação primeiro."
    );
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn malformed_lines_do_not_stop_the_loop() {
    let (service, _) = service(&["A"]);

    let responses = run_lines(
        &service,
        "not json\n{\"operacao\":\"perguntar\",\"pergunta\":\"  \"}\n{\"operacao\":\"indexar\"}\n",
    )
    .await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["status"], "erro");
    assert_eq!(responses[0]["mensagem"], "Requisição inválida");
    assert_eq!(
        responses[1]["mensagem"],
        "Por favor, envie uma pergunta no campo 'pergunta'"
    );
    assert_eq!(responses[2]["status"], "sucesso");
}

#[tokio::test]
async fn empty_source_index_failure() {
    let (service, _) = service(&[]);

    let response = service.index().await;
    assert!(!response.is_success());
}
