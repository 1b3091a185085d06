use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        host: server.address().ip().to_string(),
        port: server.address().port(),
        model: "test-model".to_string(),
        ..OllamaConfig::default()
    }
}

async fn embed_blocking(
    client: OllamaClient,
    text: &'static str,
) -> Result<Vec<f32>, EmbeddingServiceError> {
    tokio::task::spawn_blocking(move || client.embed(text))
        .await
        .expect("blocking task should not panic")
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        timeout_seconds: 10,
        retry_attempts: 2,
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.base_url().host_str(), Some("test-host"));
    assert_eq!(client.base_url().port(), Some(1234));
    assert_eq!(client.retry_attempts, 2);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&OllamaConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(0);

    // zero attempts would never call the service
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn default_client_is_single_shot() {
    let client = OllamaClient::new(&OllamaConfig::default()).expect("Failed to create client");
    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn parse_valid_embedding_response() {
    let embedding = parse_embedding_response(r#"{"embedding": [0.5, -1.0, 2.25]}"#)
        .expect("valid response should parse");
    assert_eq!(embedding, vec![0.5, -1.0, 2.25]);
}

#[test]
fn parse_rejects_missing_or_empty_embedding() {
    assert!(matches!(
        parse_embedding_response(r#"{"error": "model not loaded"}"#),
        Err(EmbeddingServiceError::MalformedResponse(_))
    ));
    assert!(matches!(
        parse_embedding_response(r#"{"embedding": []}"#),
        Err(EmbeddingServiceError::MalformedResponse(_))
    ));
    assert!(matches!(
        parse_embedding_response("not json"),
        Err(EmbeddingServiceError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn embed_sends_model_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_json(json!({"model": "test-model", "prompt": "red cotton polo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let embedding = embed_blocking(client, "red cotton polo")
        .await
        .expect("embedding should succeed");

    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn server_error_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let result = embed_blocking(client, "anything").await;

    assert_eq!(result, Err(EmbeddingServiceError::Status(500)));
}

#[tokio::test]
async fn client_error_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server))
        .expect("client should build")
        .with_retry_attempts(3);
    let result = embed_blocking(client, "anything").await;

    assert_eq!(result, Err(EmbeddingServiceError::Status(404)));
}

#[tokio::test]
async fn missing_embedding_field_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let result = embed_blocking(client, "anything").await;

    assert!(matches!(
        result,
        Err(EmbeddingServiceError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn ping_hits_tags_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let result = tokio::task::spawn_blocking(move || client.ping())
        .await
        .expect("blocking task should not panic");

    assert!(result.is_ok(), "ping should succeed: {:?}", result.err());
}
