//! # Application Configuration Module
//!
//! All runtime configuration comes from environment variables (a `.env`
//! file is honored). Missing LLM or speech-recognition credentials do not
//! prevent startup: the corresponding features degrade and the rest of the
//! bot keeps working.

use anyhow::{bail, Result};
use std::env;

// Free-tier limits
pub const DEFAULT_MAX_ACTIVE_NOTES: i64 = 5;
pub const DEFAULT_NOTES_PER_PAGE: i64 = 3;
pub const DEFAULT_BIRTHDAYS_PER_PAGE: i64 = 5;
pub const DEFAULT_MAX_DAILY_RECOGNITIONS: i32 = 2;

// Voice message bounds
pub const DEFAULT_MIN_VOICE_DURATION_SECS: u32 = 1;
pub const DEFAULT_MAX_VOICE_DURATION_SECS: u32 = 120;

// Minimum usable transcript
pub const DEFAULT_MIN_STT_TEXT_CHARS: usize = 5;
pub const DEFAULT_MIN_STT_TEXT_WORDS: usize = 1;

pub const DEFAULT_DEEPSEEK_API_URL: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_SPEECHKIT_API_URL: &str =
    "https://stt.api.cloud.yandex.net/speech/v1/stt:recognize";

/// Recovery tuning for calls to external services (DeepSeek, SpeechKit).
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000,
            max_retry_delay_ms: 10000,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

/// DeepSeek chat-completions access.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Yandex SpeechKit synchronous recognition access.
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub api_key: Option<String>,
    pub folder_id: Option<String>,
    pub api_url: String,
    pub request_timeout_secs: u64,
}

/// Per-user limits and input thresholds.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_active_notes: i64,
    pub notes_per_page: i64,
    pub birthdays_per_page: i64,
    pub min_voice_duration_secs: u32,
    pub max_voice_duration_secs: u32,
    pub min_stt_text_chars: usize,
    pub min_stt_text_words: usize,
    pub max_daily_recognitions: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_active_notes: DEFAULT_MAX_ACTIVE_NOTES,
            notes_per_page: DEFAULT_NOTES_PER_PAGE,
            birthdays_per_page: DEFAULT_BIRTHDAYS_PER_PAGE,
            min_voice_duration_secs: DEFAULT_MIN_VOICE_DURATION_SECS,
            max_voice_duration_secs: DEFAULT_MAX_VOICE_DURATION_SECS,
            min_stt_text_chars: DEFAULT_MIN_STT_TEXT_CHARS,
            min_stt_text_words: DEFAULT_MIN_STT_TEXT_WORDS,
            max_daily_recognitions: DEFAULT_MAX_DAILY_RECOGNITIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub database_url: String,
    pub llm: LlmConfig,
    pub stt: SttConfig,
    pub limits: Limits,
    pub recovery: RecoveryConfig,
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// Assemble the connection URL from the discrete DB_* variables the
/// deployment historically used, unless DATABASE_URL overrides them.
fn database_url_from_env() -> Result<String> {
    if let Some(url) = env_opt("DATABASE_URL") {
        return Ok(url);
    }
    let user = env_opt("DB_USER");
    let password = env_opt("DB_PASSWORD");
    let host = env_or("DB_HOST", "localhost");
    let port = env_or("DB_PORT", "5432");
    let name = env_or("DB_NAME", "voice_notes_bot_db");
    match (user, password) {
        (Some(user), Some(password)) => Ok(format!(
            "postgresql://{user}:{password}@{host}:{port}/{name}"
        )),
        _ => bail!("database is not configured: set DATABASE_URL or DB_USER/DB_PASSWORD"),
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// The bot token and database settings are mandatory; everything else
    /// falls back to defaults or degrades feature flags.
    pub fn from_env() -> Result<Self> {
        let Some(bot_token) = env_opt("TG_BOT_TOKEN") else {
            bail!("TG_BOT_TOKEN is not set");
        };

        let llm = LlmConfig {
            api_key: env_opt("DEEPSEEK_API_KEY"),
            api_url: env_or("DEEPSEEK_API_URL", DEFAULT_DEEPSEEK_API_URL),
            model: env_or("DEEPSEEK_MODEL_NAME", DEFAULT_DEEPSEEK_MODEL),
            request_timeout_secs: 90,
        };
        let stt = SttConfig {
            api_key: env_opt("YANDEX_SPEECHKIT_API_KEY"),
            folder_id: env_opt("YANDEX_SPEECHKIT_FOLDER_ID"),
            api_url: env_or("YANDEX_SPEECHKIT_API_URL", DEFAULT_SPEECHKIT_API_URL),
            request_timeout_secs: 30,
        };

        Ok(Self {
            bot_token,
            database_url: database_url_from_env()?,
            llm,
            stt,
            limits: Limits::default(),
            recovery: RecoveryConfig::default(),
        })
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.api_key.is_some()
    }

    pub fn stt_configured(&self) -> bool {
        self.stt.api_key.is_some() && self.stt.folder_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_defaults_are_reasonable() {
        let recovery = RecoveryConfig::default();
        assert!(recovery.max_retries <= 10);
        assert!(recovery.base_retry_delay_ms >= 100);
        assert!(recovery.base_retry_delay_ms <= recovery.max_retry_delay_ms);
        assert!(recovery.circuit_breaker_threshold > 0);
        assert!(recovery.circuit_breaker_reset_secs > 0);
    }

    #[test]
    fn limits_defaults_match_free_tier() {
        let limits = Limits::default();
        assert_eq!(limits.max_active_notes, 5);
        assert_eq!(limits.notes_per_page, 3);
        assert_eq!(limits.max_daily_recognitions, 2);
        assert!(limits.min_voice_duration_secs < limits.max_voice_duration_secs);
    }

    #[test]
    fn feature_flags_follow_key_presence() {
        let mut config = AppConfig {
            bot_token: "token".into(),
            database_url: "postgresql://u:p@localhost/db".into(),
            llm: LlmConfig {
                api_key: None,
                api_url: DEFAULT_DEEPSEEK_API_URL.into(),
                model: DEFAULT_DEEPSEEK_MODEL.into(),
                request_timeout_secs: 90,
            },
            stt: SttConfig {
                api_key: Some("key".into()),
                folder_id: None,
                api_url: DEFAULT_SPEECHKIT_API_URL.into(),
                request_timeout_secs: 30,
            },
            limits: Limits::default(),
            recovery: RecoveryConfig::default(),
        };

        assert!(!config.llm_configured());
        // SpeechKit needs both the key and the folder id
        assert!(!config.stt_configured());

        config.llm.api_key = Some("key".into());
        config.stt.folder_id = Some("folder".into());
        assert!(config.llm_configured());
        assert!(config.stt_configured());
    }
}
