use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server: &MockServer) -> OllamaGenerator {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    let ollama = OllamaConfig {
        host: url.host_str().expect("host").to_string(),
        port: url.port().expect("port"),
        ..OllamaConfig::default()
    };
    let generation = GenerationConfig {
        model: "llama-test".to_string(),
        timeout_seconds: 5,
        ..GenerationConfig::default()
    };
    OllamaGenerator::new(&generation, &ollama).expect("generator")
}

#[tokio::test(flavor = "multi_thread")]
async fn sends_non_streaming_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "model": "llama-test",
            "prompt": "Why?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama-test",
            "response": "Because.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    assert_eq!(generator.model_id(), "llama-test");

    let answer = generator.generate("Why?").await.expect("generation");
    assert_eq!(answer, "Because.");
}

#[tokio::test(flavor = "multi_thread")]
async fn surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = generator_for(&server)
        .generate("Why?")
        .await
        .expect_err("500 should fail");
    assert!(format!("{err:#}").contains("HTTP 500"));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_pings_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.6.0"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(generator_for(&server).health_check().await.is_ok());
}
