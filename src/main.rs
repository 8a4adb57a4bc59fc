use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voicenote::bot::{callback_handler, command_handler, message_handler, Command};
use voicenote::config::AppConfig;
use voicenote::{db, scheduler, App};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("starting VoiceNote AI Telegram bot");

    let config = AppConfig::from_env()?;
    if !config.llm_configured() {
        warn!("DEEPSEEK_API_KEY is not set, notes will be saved without AI analysis");
    }
    if !config.stt_configured() {
        warn!(
            "YANDEX_SPEECHKIT_API_KEY or YANDEX_SPEECHKIT_FOLDER_ID is not set, \
             voice recognition will be unavailable"
        );
    }

    info!("connecting to the database");
    let pool = db::connect(&config.database_url).await?;
    db::init_schema(&pool).await?;

    let bot = Bot::new(config.bot_token.clone());
    let app = Arc::new(App::new(config, pool));

    // Reminders live in memory only, rebuild them from the database
    app.scheduler.load_pending(&bot, &app.pool).await?;
    let _birthday_ticker = scheduler::spawn_birthday_ticker(bot.clone(), app.pool.clone());

    // Set up the dispatcher with shared application state
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint({
                    let app = Arc::clone(&app);
                    move |bot: Bot, msg: Message, cmd: Command| {
                        let app = Arc::clone(&app);
                        async move { command_handler(bot, msg, cmd, app).await }
                    }
                }),
        )
        .branch(Update::filter_message().endpoint({
            let app = Arc::clone(&app);
            move |bot: Bot, msg: Message| {
                let app = Arc::clone(&app);
                async move { message_handler(bot, msg, app).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let app = Arc::clone(&app);
            move |bot: Bot, q: CallbackQuery| {
                let app = Arc::clone(&app);
                async move { callback_handler(bot, q, app).await }
            }
        }));

    info!("bot initialized, starting dispatcher");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    app.pool.close().await;
    info!("bot stopped, database connections closed");
    Ok(())
}
