//! # Speech Recognition Module
//!
//! Yandex SpeechKit v1 synchronous recognition for Telegram voice notes,
//! plus the helper that fetches the raw OGG bytes from the Telegram file
//! API.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::SttConfig;

/// Errors from the speech-recognition pipeline.
#[derive(Debug, Clone)]
pub enum SttError {
    /// API key or folder id missing
    NotConfigured,
    /// Audio could not be fetched from Telegram
    Download(String),
    /// SpeechKit returned a non-200 status
    Api { status: u16, body: String },
    /// SpeechKit answered 200 with an unusable body
    MalformedResponse(String),
    /// Transport-level failure
    Network(String),
    /// Request exceeded the configured timeout
    Timeout,
    /// Circuit breaker is open, request was not attempted
    CircuitOpen,
}

impl std::fmt::Display for SttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SttError::NotConfigured => write!(f, "speech recognition is not configured"),
            SttError::Download(msg) => write!(f, "audio download error: {msg}"),
            SttError::Api { status, body } => {
                write!(f, "SpeechKit API error (status {status}): {body}")
            }
            SttError::MalformedResponse(msg) => write!(f, "malformed SpeechKit response: {msg}"),
            SttError::Network(msg) => write!(f, "network error: {msg}"),
            SttError::Timeout => write!(f, "SpeechKit request timed out"),
            SttError::CircuitOpen => write!(f, "speech recognition temporarily unavailable"),
        }
    }
}

impl std::error::Error for SttError {}

/// Client for short-audio recognition.
#[derive(Clone)]
pub struct SttClient {
    http: reqwest::Client,
    config: SttConfig,
    breaker: Arc<CircuitBreaker>,
}

impl SttClient {
    pub fn new(config: SttConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            breaker,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.folder_id.is_some()
    }

    /// Recognize Russian speech from OGG/Opus bytes (the Telegram voice
    /// format). Returns the trimmed transcript.
    pub async fn recognize_ogg(&self, audio: &[u8]) -> Result<String, SttError> {
        let (Some(api_key), Some(folder_id)) =
            (self.config.api_key.as_ref(), self.config.folder_id.as_ref())
        else {
            error!("skipping recognition: SpeechKit credentials are not configured");
            return Err(SttError::NotConfigured);
        };

        if self.breaker.is_open() {
            return Err(SttError::CircuitOpen);
        }

        debug!(bytes = audio.len(), "sending audio to SpeechKit");
        let response = self
            .http
            .post(&self.config.api_url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .header("Authorization", format!("Api-Key {api_key}"))
            .header("Content-Type", "audio/ogg")
            .query(&[
                ("folderId", folder_id.as_str()),
                ("lang", "ru-RU"),
                ("format", "oggopus"),
                ("sampleRateHertz", "48000"),
                ("model", "general"),
            ])
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                self.breaker.record_failure();
                if e.is_timeout() {
                    SttError::Timeout
                } else {
                    SttError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SttError::Network(e.to_string()))?;

        if !status.is_success() {
            self.breaker.record_failure();
            error!(status = status.as_u16(), body = %truncate(&body, 200), "SpeechKit API error");
            return Err(SttError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| SttError::MalformedResponse(format!("JSON decode failed: {e}")))?;
        let Some(result) = parsed.get("result").and_then(|v| v.as_str()) else {
            self.breaker.record_failure();
            return Err(SttError::MalformedResponse(
                "missing 'result' field".to_string(),
            ));
        };

        self.breaker.record_success();
        let transcript = result.trim().to_string();
        info!(chars = transcript.len(), "speech recognized");
        Ok(transcript)
    }
}

/// Download a file's bytes through the Telegram file API, given the path
/// returned by `getFile`.
pub async fn download_telegram_file(
    http: &reqwest::Client,
    bot_token: &str,
    file_path: &str,
) -> Result<Vec<u8>, SttError> {
    let url = format!("https://api.telegram.org/file/bot{bot_token}/{file_path}");
    debug!(file_path, "downloading file from Telegram");

    let response = http
        .get(&url)
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .map_err(|e| SttError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SttError::Download(format!(
            "status {}",
            response.status().as_u16()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SttError::Download(e.to_string()))?;
    debug!(bytes = bytes.len(), "file downloaded");
    Ok(bytes.to_vec())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecoveryConfig;

    fn client(api_url: String, configured: bool) -> SttClient {
        let config = SttConfig {
            api_key: configured.then(|| "test-key".to_string()),
            folder_id: configured.then(|| "folder".to_string()),
            api_url,
            request_timeout_secs: 5,
        };
        SttClient::new(
            config,
            Arc::new(CircuitBreaker::new(RecoveryConfig::default())),
        )
    }

    #[tokio::test]
    async fn unconfigured_client_refuses() {
        let client = client("http://localhost:1/stt".to_string(), false);
        assert!(!client.is_configured());
        match client.recognize_ogg(b"ogg").await {
            Err(SttError::NotConfigured) => {}
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recognizes_successful_response() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/stt")
                    .query_param("lang", "ru-RU")
                    .query_param("format", "oggopus")
                    .header("Content-Type", "audio/ogg");
                then.status(200)
                    .json_body(serde_json::json!({ "result": " купить молоко завтра " }));
            })
            .await;

        let client = client(server.url("/stt"), true);
        let transcript = client.recognize_ogg(b"fake-ogg-bytes").await.unwrap();
        assert_eq!(transcript, "купить молоко завтра");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_surfaced() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/stt");
                then.status(401).body("{\"error\":\"unauthorized\"}");
            })
            .await;

        let client = client(server.url("/stt"), true);
        match client.recognize_ogg(b"bytes").await {
            Err(SttError::Api { status: 401, .. }) => {}
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_result_field_is_malformed() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/stt");
                then.status(200).json_body(serde_json::json!({ "ok": true }));
            })
            .await;

        let client = client(server.url("/stt"), true);
        match client.recognize_ogg(b"bytes").await {
            Err(SttError::MalformedResponse(_)) => {}
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_failures_open_the_breaker() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/stt");
                then.status(500).body("boom");
            })
            .await;

        let config = SttConfig {
            api_key: Some("key".into()),
            folder_id: Some("folder".into()),
            api_url: server.url("/stt"),
            request_timeout_secs: 5,
        };
        let breaker = Arc::new(CircuitBreaker::new(RecoveryConfig {
            circuit_breaker_threshold: 2,
            ..Default::default()
        }));
        let client = SttClient::new(config, Arc::clone(&breaker));

        assert!(client.recognize_ogg(b"x").await.is_err());
        assert!(client.recognize_ogg(b"x").await.is_err());
        match client.recognize_ogg(b"x").await {
            Err(SttError::CircuitOpen) => {}
            other => panic!("expected CircuitOpen, got {other:?}"),
        }
    }
}
