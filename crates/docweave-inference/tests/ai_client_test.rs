//! AiClient against a stubbed NLP service.

use std::time::Duration;

use docweave_core::Error;
use docweave_inference::{AiClient, AiClientConfig, SummarizationBackend, SummarizeOptions};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AiClient {
    AiClient::new(
        AiClientConfig::default()
            .with_base_url(server.uri())
            .with_request_timeout(Duration::from_millis(500)),
    )
    .expect("client builds")
}

#[tokio::test]
async fn test_summarize_posts_expected_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nlp/summarize"))
        .and(body_json(serde_json::json!({
            "text": "A long text about rivers.",
            "max_length": 150,
            "min_length": 50,
            "style": "concise"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "Rivers.",
            "model_name": "bart-large-cnn",
            "latency_ms": 42,
            "input_length": 25,
            "summary_length": 7,
            "style": "concise"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .summarize("A long text about rivers.", &SummarizeOptions::default())
        .await
        .expect("summary succeeds");

    assert_eq!(result.summary, "Rivers.");
    assert_eq!(result.model_name, "bart-large-cnn");
    assert_eq!(result.latency_ms, 42);
    assert_eq!(result.input_length, Some(25));
    assert_eq!(result.summary_length, Some(7));
}

#[tokio::test]
async fn test_custom_options_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nlp/summarize"))
        .and(body_json(serde_json::json!({
            "text": "t",
            "max_length": 300,
            "min_length": 10,
            "style": "bullet_points"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "summary": "- t",
            "model_name": "m",
            "latency_ms": 1,
            "style": "bullet_points"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let options = SummarizeOptions {
        max_length: 300,
        min_length: 10,
        style: "bullet_points".to_string(),
    };
    let result = client_for(&mock_server)
        .summarize("t", &options)
        .await
        .unwrap();
    assert_eq!(result.style.as_deref(), Some("bullet_points"));
}

#[tokio::test]
async fn test_empty_body_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nlp/summarize"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .summarize("text", &SummarizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)), "got {err:?}");
}

#[tokio::test]
async fn test_server_error_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nlp/summarize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .summarize("text", &SummarizeOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Upstream(msg) => assert!(msg.contains("503"), "message: {msg}"),
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nlp/summarize"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"summary": "late", "model_name": "m"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .summarize("text", &SummarizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_upstream_error() {
    // Nothing listens on port 9 (discard) in the test environment.
    let client = AiClient::new(AiClientConfig::default().with_base_url("http://127.0.0.1:9"))
        .unwrap();
    let err = client
        .summarize("text", &SummarizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn test_health_any_2xx_is_healthy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(client_for(&mock_server).is_healthy().await);
}

#[tokio::test]
async fn test_health_failure_status_is_unhealthy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    assert!(!client_for(&mock_server).is_healthy().await);
}

#[tokio::test]
async fn test_health_unreachable_is_unhealthy() {
    let client = AiClient::new(AiClientConfig::default().with_base_url("http://127.0.0.1:9"))
        .unwrap();
    assert!(!client.is_healthy().await);
}
