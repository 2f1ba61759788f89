use super::*;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server: &MockServer) -> GeminiGenerator {
    let config = GenerationConfig {
        model: "gemini-test".to_string(),
        gemini_url: server.uri(),
        api_key: Some("secret".to_string()),
        timeout_seconds: 5,
        ..GenerationConfig::default()
    };
    GeminiGenerator::new(&config).expect("generator")
}

#[test]
fn joins_candidate_parts() {
    let response: GenerateContentResponse = serde_json::from_value(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
            "finishReason": "STOP"
        }]
    }))
    .expect("response should parse");

    assert_eq!(
        extract_text(response).expect("text should be present"),
        "Hello, world"
    );
}

#[test]
fn blocked_prompt_reports_reason() {
    let response: GenerateContentResponse = serde_json::from_value(json!({
        "promptFeedback": {"blockReason": "SAFETY"}
    }))
    .expect("response should parse");

    let err = extract_text(response).expect_err("blocked prompt should fail");
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sends_prompt_with_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "secret"))
        .and(body_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Recommend a film"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Watch Heat."}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let answer = generator
        .generate("Recommend a film")
        .await
        .expect("generation should succeed");

    assert_eq!(answer, "Watch Heat.");
    assert_eq!(generator.model_id(), "gemini-test");
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = generator_for(&server)
        .generate("Recommend a film")
        .await
        .expect_err("403 should fail");
    assert!(format!("{err:#}").contains("HTTP 403"));
}

#[test]
#[serial]
fn explicit_empty_key_is_rejected_without_env() {
    let config = GenerationConfig {
        api_key: Some("   ".to_string()),
        ..GenerationConfig::default()
    };
    if std::env::var("GEMINI_API_KEY").is_err() {
        assert!(GeminiGenerator::new(&config).is_err());
    }
}
