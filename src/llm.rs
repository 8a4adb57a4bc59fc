//! # Note Analysis Module
//!
//! DeepSeek chat-completions client that turns a raw transcript into a
//! structured analysis: corrected text, extracted dates, mentioned people
//! and places, and an optional recurrence rule.
//!
//! The model is asked for a strict JSON object, but nothing downstream
//! trusts it: every parsing failure degrades to an analysis that carries
//! the original text untouched plus an error marker, so user input is
//! never lost to a flaky model.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{LlmConfig, RecoveryConfig};

/// One date or time the model found in the text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateTimeMention {
    #[serde(default)]
    pub original_mention: Option<String>,
    /// Absolute UTC instant in ISO 8601 (ends with `Z`)
    #[serde(default)]
    pub absolute_datetime_start: Option<String>,
    #[serde(default)]
    pub absolute_datetime_end: Option<String>,
}

/// Structured result of analyzing a note's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NoteAnalysis {
    #[serde(default)]
    pub corrected_text: String,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default)]
    pub dates_times: Vec<DateTimeMention>,
    #[serde(default)]
    pub people_mentioned: Vec<String>,
    #[serde(default)]
    pub locations_mentioned: Vec<String>,
    /// iCalendar RRULE string when the note is recurring
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    /// Set when analysis failed and `corrected_text` is the raw input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NoteAnalysis {
    /// Degraded analysis: the raw text as-is, with a failure marker.
    pub fn fallback(original_text: &str, error: impl Into<String>) -> Self {
        Self {
            corrected_text: original_text.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// First extracted start instant, parsed from the model's UTC ISO form.
    pub fn first_due_date(&self) -> Option<DateTime<Utc>> {
        let raw = self
            .dates_times
            .first()?
            .absolute_datetime_start
            .as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug)]
enum LlmError {
    NotConfigured,
    CircuitOpen,
    Network(String),
    Timeout,
    Api { status: u16, message: String },
    Decode(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::NotConfigured => write!(f, "DeepSeek API not configured"),
            LlmError::CircuitOpen => write!(f, "LLM temporarily unavailable"),
            LlmError::Network(msg) => write!(f, "Connection error to LLM API: {msg}"),
            LlmError::Timeout => write!(f, "Request to LLM timed out"),
            LlmError::Api { status, message } => {
                write!(f, "DeepSeek API error status: {status}: {message}")
            }
            LlmError::Decode(msg) => write!(f, "DeepSeek response decode error: {msg}"),
        }
    }
}

impl LlmError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Network(_) | LlmError::Timeout | LlmError::Api { status: 500..=599, .. }
        )
    }
}

fn system_prompt(current_user_datetime_iso: &str) -> String {
    format!(
        r#"You are an AI assistant specialized in processing transcribed voice notes in Russian.
Your task is to return a single, valid JSON object based on the user's text. You must be extremely precise with time calculations.

JSON Structure:
{{
  "corrected_text": "...",
  "task_description": "...",
  "event_description": "...",
  "dates_times": [
    {{
      "original_mention": "How the date/time was mentioned in the text.",
      "absolute_datetime_start": "The calculated absolute time in UTC, in ISO 8601 format (YYYY-MM-DDTHH:MM:SSZ).",
      "absolute_datetime_end": "..."
    }}
  ],
  "people_mentioned": [...],
  "locations_mentioned": [...],
  "recurrence_rule": "The iCalendar RRULE string if the note is recurring, otherwise null."
}}

**Date/Time Calculation Rules (VERY IMPORTANT):**
- **The exact current time is:** `{current_user_datetime_iso}`. This is the user's local time.
- **You MUST use this provided time as the precise starting point for all relative time calculations (like "in two hours" or "in 15 minutes").**
- **DO NOT round the current time.** If the time is 18:48, use 18:48, not 18:50. Your calculations must be exact to the minute.
- **Output Format:** All date/time values in the final JSON MUST be in UTC timezone, ending with 'Z'.
- **Ambiguous Time:** If a user says "at 8 o'clock" without specifying a date, assume they mean "today at 8 o'clock".
- **Date without time:** If a date is mentioned without a time (e.g., "on Friday"), use T00:00:00Z for the time part as a placeholder.

**Recurrence Rule (RRULE) Generation:**
- If the user says "каждый день", use "FREQ=DAILY".
- If "каждую пятницу", use "FREQ=WEEKLY;BYDAY=FR".
- If "каждый месяц 15 числа", use "FREQ=MONTHLY;BYMONTHDAY=15".
- If "каждые 3 недели", use "FREQ=WEEKLY;INTERVAL=3".
- If the event is not recurring, the value for "recurrence_rule" MUST be null.
"#
    )
}

/// Parse the inner JSON document the model produced.
///
/// Tolerates a ```json fence around the payload; anything that is not a
/// JSON object falls back to the original text. An empty or missing
/// `corrected_text` is replaced by the original text as well.
pub fn parse_analysis_content(content: &str, original_text: &str) -> NoteAnalysis {
    let mut payload = content.trim();
    if let Some(stripped) = payload.strip_prefix("```json") {
        payload = stripped.trim_end_matches("```").trim();
    } else if let Some(stripped) = payload.strip_prefix("```") {
        payload = stripped.trim_end_matches("```").trim();
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, payload = %truncate(payload, 500), "failed to decode JSON from LLM");
            return NoteAnalysis::fallback(original_text, "Failed to decode JSON from LLM");
        }
    };
    if !value.is_object() {
        warn!("LLM returned JSON, but it's not an object");
        return NoteAnalysis::fallback(original_text, "LLM returned non-object JSON");
    }

    let mut analysis: NoteAnalysis = match serde_json::from_value(value) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!(error = %e, "LLM JSON did not match the expected structure");
            return NoteAnalysis::fallback(original_text, "Unexpected LLM JSON structure");
        }
    };

    if analysis.corrected_text.trim().is_empty() {
        warn!("LLM did not return 'corrected_text' or it was empty, using original text");
        analysis.corrected_text = original_text.to_string();
    }
    analysis
}

/// Fold the error body's `error.message` into a status message when the
/// API returned structured details.
fn api_error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        });
    match detail {
        Some(detail) => detail,
        None => truncate(body, 200),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// DeepSeek chat-completions client with retry and circuit-breaker
/// protection.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
    recovery: RecoveryConfig,
    breaker: Arc<CircuitBreaker>,
}

impl LlmClient {
    pub fn new(config: LlmConfig, recovery: RecoveryConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            recovery,
            breaker,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Analyze a note's text against the user's current local time.
    ///
    /// Never fails outright: every error path returns a degraded analysis
    /// that still carries the original text.
    pub async fn analyze(&self, raw_text: &str, current_user_datetime_iso: &str) -> NoteAnalysis {
        if self.config.api_key.is_none() {
            error!("DeepSeek API is not fully configured, skipping LLM processing");
            return NoteAnalysis::fallback(raw_text, LlmError::NotConfigured.to_string());
        }

        debug!(current_user_time = current_user_datetime_iso, "sending request to DeepSeek");

        let mut attempt = 0u32;
        loop {
            match self.request_once(raw_text, current_user_datetime_iso).await {
                Ok(content) => {
                    self.breaker.record_success();
                    return parse_analysis_content(&content, raw_text);
                }
                Err(e) => {
                    self.breaker.record_failure();
                    if e.is_retryable() && attempt < self.recovery.max_retries {
                        let delay = self.retry_delay(attempt);
                        warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "LLM request failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    error!(error = %e, "LLM request failed");
                    return NoteAnalysis::fallback(raw_text, e.to_string());
                }
            }
        }
    }

    /// Exponential backoff with random jitter, capped by the config.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self
            .recovery
            .base_retry_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.recovery.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0..=250);
        Duration::from_millis(base + jitter)
    }

    async fn request_once(
        &self,
        raw_text: &str,
        current_user_datetime_iso: &str,
    ) -> Result<String, LlmError> {
        if self.breaker.is_open() {
            return Err(LlmError::CircuitOpen);
        }
        let api_key = self.config.api_key.as_ref().ok_or(LlmError::NotConfigured)?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt(current_user_datetime_iso) },
                { "role": "user", "content": format!("Analyze the following voice note text (in Russian):\n\n\"{raw_text}\"") }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.1,
            "max_tokens": 2048,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(status.as_u16(), &body),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Decode(format!("outer JSON decode failed: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::Decode("'message.content' is missing or empty".to_string()))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "купить молоко завтра в 9";

    #[test]
    fn parses_a_well_formed_analysis() {
        let content = r#"{
            "corrected_text": "Купить молоко завтра в 9:00.",
            "task_description": "купить молоко",
            "dates_times": [{
                "original_mention": "завтра в 9",
                "absolute_datetime_start": "2024-05-02T06:00:00Z"
            }],
            "people_mentioned": [],
            "locations_mentioned": [],
            "recurrence_rule": null
        }"#;
        let analysis = parse_analysis_content(content, ORIGINAL);
        assert!(!analysis.is_degraded());
        assert_eq!(analysis.corrected_text, "Купить молоко завтра в 9:00.");
        let due = analysis.first_due_date().unwrap();
        assert_eq!(due.to_rfc3339(), "2024-05-02T06:00:00+00:00");
    }

    #[test]
    fn strips_a_json_fence() {
        let content = "```json\n{\"corrected_text\": \"Текст.\"}\n```";
        let analysis = parse_analysis_content(content, ORIGINAL);
        assert!(!analysis.is_degraded());
        assert_eq!(analysis.corrected_text, "Текст.");
    }

    #[test]
    fn invalid_json_falls_back_to_original_text() {
        let analysis = parse_analysis_content("not json at all", ORIGINAL);
        assert!(analysis.is_degraded());
        assert_eq!(analysis.corrected_text, ORIGINAL);
    }

    #[test]
    fn non_object_json_falls_back() {
        let analysis = parse_analysis_content("[1, 2, 3]", ORIGINAL);
        assert!(analysis.is_degraded());
        assert_eq!(analysis.corrected_text, ORIGINAL);
    }

    #[test]
    fn empty_corrected_text_is_replaced() {
        let analysis = parse_analysis_content(r#"{"corrected_text": ""}"#, ORIGINAL);
        assert!(!analysis.is_degraded());
        assert_eq!(analysis.corrected_text, ORIGINAL);
    }

    #[test]
    fn unparsable_due_date_is_ignored() {
        let content = r#"{
            "corrected_text": "x",
            "dates_times": [{ "absolute_datetime_start": "next friday-ish" }]
        }"#;
        let analysis = parse_analysis_content(content, ORIGINAL);
        assert!(analysis.first_due_date().is_none());
    }

    #[test]
    fn api_error_message_prefers_structured_detail() {
        let body = r#"{"error": {"message": "Invalid API key"}}"#;
        assert_eq!(api_error_message(401, body), "Invalid API key");
        assert_eq!(api_error_message(502, "<html>bad gateway</html>"), "<html>bad gateway</html>");
    }
}
