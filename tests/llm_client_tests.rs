//! End-to-end tests for the DeepSeek client against a mock HTTP server.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;

use voicenote::circuit_breaker::CircuitBreaker;
use voicenote::config::{LlmConfig, RecoveryConfig};
use voicenote::llm::LlmClient;

const ORIGINAL: &str = "напомни позвонить маме завтра в девять";

fn client_for(server: &MockServer) -> LlmClient {
    let config = LlmConfig {
        api_key: Some("test-key".to_string()),
        api_url: server.url("/chat/completions"),
        model: "deepseek-chat".to_string(),
        request_timeout_secs: 5,
    };
    let recovery = RecoveryConfig {
        max_retries: 0,
        ..Default::default()
    };
    let breaker = Arc::new(CircuitBreaker::new(recovery.clone()));
    LlmClient::new(config, recovery, breaker)
}

fn chat_envelope(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn analyze_extracts_structured_fields() {
    let server = MockServer::start_async().await;
    let inner = json!({
        "corrected_text": "Позвонить маме завтра в 9:00.",
        "task_description": "позвонить маме",
        "dates_times": [{
            "original_mention": "завтра в девять",
            "absolute_datetime_start": "2024-05-02T06:00:00Z"
        }],
        "people_mentioned": ["мама"],
        "locations_mentioned": [],
        "recurrence_rule": null
    });
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("Authorization", "Bearer test-key")
                .json_body_partial(r#"{"model": "deepseek-chat"}"#);
            then.status(200)
                .json_body(chat_envelope(&inner.to_string()));
        })
        .await;

    let analysis = client_for(&server)
        .analyze(ORIGINAL, "2024-05-01T12:00:00+03:00")
        .await;

    mock.assert_async().await;
    assert!(!analysis.is_degraded());
    assert_eq!(analysis.corrected_text, "Позвонить маме завтра в 9:00.");
    assert_eq!(analysis.people_mentioned, vec!["мама".to_string()]);
    assert!(analysis.first_due_date().is_some());
}

#[tokio::test]
async fn analyze_survives_a_fenced_payload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(chat_envelope(
                "```json\n{\"corrected_text\": \"Чистый текст.\"}\n```",
            ));
        })
        .await;

    let analysis = client_for(&server)
        .analyze(ORIGINAL, "2024-05-01T12:00:00+03:00")
        .await;
    assert!(!analysis.is_degraded());
    assert_eq!(analysis.corrected_text, "Чистый текст.");
}

#[tokio::test]
async fn api_error_degrades_to_original_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401)
                .json_body(json!({ "error": { "message": "Invalid API key" } }));
        })
        .await;

    let analysis = client_for(&server)
        .analyze(ORIGINAL, "2024-05-01T12:00:00+03:00")
        .await;
    assert!(analysis.is_degraded());
    assert_eq!(analysis.corrected_text, ORIGINAL);
    assert!(analysis
        .error
        .as_deref()
        .unwrap()
        .contains("Invalid API key"));
}

#[tokio::test]
async fn missing_choices_degrades_to_original_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        })
        .await;

    let analysis = client_for(&server)
        .analyze(ORIGINAL, "2024-05-01T12:00:00+03:00")
        .await;
    assert!(analysis.is_degraded());
    assert_eq!(analysis.corrected_text, ORIGINAL);
}

#[tokio::test]
async fn unconfigured_client_degrades_without_a_request() {
    let config = LlmConfig {
        api_key: None,
        api_url: "http://localhost:1/unreachable".to_string(),
        model: "deepseek-chat".to_string(),
        request_timeout_secs: 5,
    };
    let recovery = RecoveryConfig::default();
    let client = LlmClient::new(
        config,
        recovery.clone(),
        Arc::new(CircuitBreaker::new(recovery)),
    );
    assert!(!client.is_configured());

    let analysis = client.analyze(ORIGINAL, "2024-05-01T12:00:00+03:00").await;
    assert!(analysis.is_degraded());
    assert_eq!(analysis.corrected_text, ORIGINAL);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("internal error");
        })
        .await;

    let config = LlmConfig {
        api_key: Some("test-key".to_string()),
        api_url: server.url("/chat/completions"),
        model: "deepseek-chat".to_string(),
        request_timeout_secs: 5,
    };
    let recovery = RecoveryConfig {
        max_retries: 2,
        base_retry_delay_ms: 1,
        max_retry_delay_ms: 5,
        ..Default::default()
    };
    let client = LlmClient::new(
        config,
        recovery.clone(),
        Arc::new(CircuitBreaker::new(recovery)),
    );

    let analysis = client.analyze(ORIGINAL, "2024-05-01T12:00:00+03:00").await;
    assert!(analysis.is_degraded());
    // initial attempt + two retries
    failing.assert_hits_async(3).await;
}
