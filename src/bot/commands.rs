//! Bot command handlers: /start, /help, /my_notes, /cancel.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{info, warn};

use super::callback_data::Callback;
use super::callback_handler::show_notes_page;
use super::ui_builder;
use crate::db;
use crate::App;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "запустить бота / главное меню")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "показать список моих заметок")]
    MyNotes,
    #[command(description = "отменить текущее действие")]
    Cancel,
}

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, app: Arc<App>) -> Result<()> {
    match cmd {
        Command::Start => cmd_start(bot, msg, app).await,
        Command::Help => cmd_help(bot, msg, app).await,
        Command::MyNotes => cmd_my_notes(bot, msg, app).await,
        Command::Cancel => cmd_cancel(bot, msg, app).await,
    }
}

async fn cmd_start(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let telegram_id = user.id.0 as i64;
    app.pending.clear(msg.chat.id.0);

    let was_new_user = db::get_user_profile(&app.pool, telegram_id).await?.is_none();
    let profile = db::upsert_user(
        &app.pool,
        telegram_id,
        user.username.as_deref(),
        Some(user.first_name.as_str()),
        user.last_name.as_deref(),
        user.language_code.as_deref(),
    )
    .await?;

    if was_new_user {
        info!(telegram_id, username = ?user.username, "new user registered");
        if let Err(e) = db::log_user_action(&app.pool, telegram_id, "user_registered", None).await {
            warn!(error = %e, "failed to log registration");
        }
    }

    let timezone_warning = if profile.timezone == "UTC" {
        format!(
            "\n\n{}\nЧтобы напоминания приходили вовремя, укажите ваш часовой пояс в настройках.",
            html::bold("⚠️ Настройте часовой пояс!")
        )
    } else {
        String::new()
    };

    let start_text = format!(
        "👋 Привет, {}!\n\nЯ — {}, ваш личный AI-ассистент.\n\nПросто отправьте мне {} или {}, и я превращу его в умную заметку с напоминанием. Всё происходит автоматически!\n\nИспользуйте кнопки ниже для навигации или {}{}",
        html::bold(&html::escape(&user.first_name)),
        html::bold("VoiceNote AI"),
        html::bold("голосовое"),
        html::bold("текстовое сообщение"),
        html::bold("сразу отправляйте сообщение!"),
        timezone_warning,
    );

    let mut keyboard = ui_builder::main_menu_keyboard();
    if profile.timezone == "UTC" {
        keyboard.inline_keyboard.push(vec![InlineKeyboardButton::callback(
            "🕒 Настроить часовой пояс",
            Callback::SettingsTimezone.encode(),
        )]);
    }

    bot.send_message(msg.chat.id, start_text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn cmd_help(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let limits = &app.config.limits;
    let help_text = format!(
        "👋 Привет! Я {} — твой умный помощник для заметок.\n\n\
        Я использую распознавание речи и AI-анализ текста.\n\n\
        {}\n\n\
        🎤 {}\n\
        — Отправь мне голосовое или любое текстовое сообщение.\n\
        — Я проанализирую его, автоматически сохраню как умную заметку и поставлю напоминание.\n\
        — Если я ошибся, создание можно отменить кнопкой под сообщением.\n\
        — Лимиты на бесплатном тарифе: {} активных заметок и {} распознаваний голоса в день.\n\n\
        🎂 {}\n\
        — Сохраняй дни рождения, и я буду напоминать о них каждый год.\n\n\
        👤 {}\n\
        — В профиле — твоя статистика, в настройках — часовой пояс и время напоминаний.\n\
        — Обязательно установи свой часовой пояс!\n\n\
        ⭐ {}\n\
        — Безлимиты на заметки и распознавания.\n\
        — Повторяющиеся задачи («напоминай каждый понедельник»).\n\
        — Отложить напоминание прямо из уведомления.\n\
        — Импорт дней рождения из файла.\n\n\
        🤖 {}\n\
        /start — главное меню\n\
        /help — эта справка\n\
        /my_notes — список заметок\n\
        /cancel — отменить текущее действие",
        html::bold("VoiceNote AI"),
        html::bold("Вот что я умею:"),
        html::bold("Создание заметок:"),
        html::bold(&limits.max_active_notes.to_string()),
        html::bold(&limits.max_daily_recognitions.to_string()),
        html::bold("Дни рождения:"),
        html::bold("Профиль и настройки:"),
        html::bold("Возможности VIP-статуса:"),
        html::bold("Основные команды:"),
    );
    bot.send_message(msg.chat.id, help_text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn cmd_my_notes(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    app.pending.clear(msg.chat.id.0);
    show_notes_page(
        &bot,
        &app,
        msg.chat.id,
        None,
        user.id.0 as i64,
        1,
        false,
    )
    .await
}

async fn cmd_cancel(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let text = if app.pending.take(msg.chat.id.0).is_some() {
        "🚫 Действие отменено."
    } else {
        "Нечего отменять. Просто отправьте мне сообщение!"
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
