//! # VoiceNote AI Telegram Bot
//!
//! A Telegram bot that turns voice and text messages into structured notes:
//! speech recognition via Yandex SpeechKit, analysis via the DeepSeek
//! chat-completions API, storage in PostgreSQL, and scheduled reminders.

use std::sync::Arc;

use sqlx::postgres::PgPool;

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod llm;
pub mod note_creator;
pub mod recurrence;
pub mod scheduler;
pub mod stt;
pub mod tz;

use bot::state::PendingInputs;
use circuit_breaker::CircuitBreaker;
use config::AppConfig;
use llm::LlmClient;
use scheduler::ReminderScheduler;
use stt::SttClient;

/// Shared application state handed to every handler.
pub struct App {
    pub config: AppConfig,
    pub pool: PgPool,
    pub scheduler: ReminderScheduler,
    pub llm: LlmClient,
    pub stt: SttClient,
    pub pending: PendingInputs,
    /// Plain HTTP client for Telegram file downloads
    pub http: reqwest::Client,
}

impl App {
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        // One breaker for both external services: if the network path to
        // the outside world is down, both go quiet together.
        let breaker = Arc::new(CircuitBreaker::new(config.recovery.clone()));
        Self {
            llm: LlmClient::new(
                config.llm.clone(),
                config.recovery.clone(),
                Arc::clone(&breaker),
            ),
            stt: SttClient::new(config.stt.clone(), breaker),
            scheduler: ReminderScheduler::new(),
            pending: PendingInputs::new(),
            http: reqwest::Client::new(),
            config,
            pool,
        }
    }
}
