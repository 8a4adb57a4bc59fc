//! Message handling: the voice and text note-creation flows, plus the
//! free-form inputs collected by the settings and birthday prompts.

use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;
use tracing::{info, warn};

use super::callback_handler::{show_birthdays_page, show_notes_page, show_settings_menu};
use super::state::PendingInput;
use super::ui_builder;
use crate::db;
use crate::note_creator::{self, CreateOutcome};
use crate::stt;
use crate::tz;
use crate::App;

const MIN_TEXT_LENGTH_FOR_NOTE: usize = 10;
const MIN_WORDS_FOR_NOTE: usize = 2;
/// Chit-chat that should not become a note.
const GARBAGE_WORDS: &[&str] = &[
    "привет", "спс", "спасибо", "ок", "ok", "хорошо", "ага", "угу", "hi", "hello", "thanks",
];

lazy_static! {
    static ref FULL_DATE_RE: Regex = Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap();
    static ref SHORT_DATE_RE: Regex = Regex::new(r"^(\d{1,2})\.(\d{1,2})$").unwrap();
}

/// Parse `ДД.ММ.ГГГГ` or `ДД.ММ` into (day, month, year).
pub fn parse_birthday_date(input: &str) -> Option<(i32, i32, Option<i32>)> {
    let input = input.trim();
    if let Some(caps) = FULL_DATE_RE.captures(input) {
        let day: i32 = caps[1].parse().ok()?;
        let month: i32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
        return Some((day, month, Some(year)));
    }
    if let Some(caps) = SHORT_DATE_RE.captures(input) {
        let day: i32 = caps[1].parse().ok()?;
        let month: i32 = caps[2].parse().ok()?;
        // Validate against a leap year so 29.02 stays importable
        NaiveDate::from_ymd_opt(2000, month as u32, day as u32)?;
        return Some((day, month, None));
    }
    None
}

/// Parse a birthday import file: one `Имя - ДД.ММ[.ГГГГ]` entry per line.
/// Returns the valid entries and the number of rejected lines.
pub fn parse_birthday_import(content: &str) -> (Vec<(String, i32, i32, Option<i32>)>, usize) {
    let mut entries = Vec::new();
    let mut errors = 0usize;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, date)) = line.split_once('-') else {
            errors += 1;
            continue;
        };
        let name = name.trim();
        match parse_birthday_date(date.trim()) {
            Some((day, month, year)) if !name.is_empty() => {
                entries.push((name.to_string(), day, month, year));
            }
            _ => errors += 1,
        }
    }
    (entries, errors)
}

pub async fn message_handler(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let telegram_id = user.id.0 as i64;

    if let Some(pending) = app.pending.get(msg.chat.id.0) {
        return handle_pending_input(bot, msg, app, pending).await;
    }

    if msg.voice().is_some() {
        handle_voice_message(bot, msg, app, telegram_id).await
    } else if msg.text().is_some() {
        handle_text_message(bot, msg, app, telegram_id).await
    } else {
        bot.send_message(
            msg.chat.id,
            "Я понимаю только голосовые и текстовые сообщения. Отправьте одно из них, и я сохраню заметку!",
        )
        .await?;
        Ok(())
    }
}

/// The voice flow: limits → download → recognition → analysis → note.
/// Every stage edits the same status message, so the user watches the
/// pipeline progress in place.
async fn handle_voice_message(bot: Bot, msg: Message, app: Arc<App>, telegram_id: i64) -> Result<()> {
    let (Some(user), Some(voice)) = (msg.from.as_ref(), msg.voice()) else {
        return Ok(());
    };
    let profile = db::upsert_user(
        &app.pool,
        telegram_id,
        user.username.as_deref(),
        Some(user.first_name.as_str()),
        user.last_name.as_deref(),
        user.language_code.as_deref(),
    )
    .await?;
    let limits = &app.config.limits;

    let duration = voice.duration.seconds();
    if duration < limits.min_voice_duration_secs {
        bot.send_message(
            msg.chat.id,
            format!("🎤 Ваше голосовое сообщение слишком короткое ({duration} сек.)."),
        )
        .await?;
        return Ok(());
    }
    if duration > limits.max_voice_duration_secs {
        bot.send_message(
            msg.chat.id,
            format!("🎤 Ваше голосовое сообщение слишком длинное ({duration} сек.)."),
        )
        .await?;
        return Ok(());
    }

    if !profile.is_vip {
        let used = db::stt_recognitions_today(&app.pool, telegram_id).await?;
        if used >= limits.max_daily_recognitions {
            bot.send_message(
                msg.chat.id,
                "Вы достигли дневного лимита на распознавание голосовых сообщений. 😔",
            )
            .await?;
            return Ok(());
        }
    }

    let status = bot
        .send_message(msg.chat.id, "✔️ Запись получена. Распознаю речь...")
        .await?;

    if !app.stt.is_configured() {
        bot.edit_message_text(
            msg.chat.id,
            status.id,
            "❌ Сервис распознавания речи временно недоступен.",
        )
        .await?;
        return Ok(());
    }

    let file = match bot.get_file(voice.file.id.clone()).await {
        Ok(file) => file,
        Err(e) => {
            warn!(telegram_id, error = %e, "get_file failed");
            bot.edit_message_text(
                msg.chat.id,
                status.id,
                "❌ Ошибка при получении файла от Telegram.",
            )
            .await?;
            return Ok(());
        }
    };
    let audio = match stt::download_telegram_file(&app.http, bot.token(), &file.path).await {
        Ok(audio) => audio,
        Err(e) => {
            warn!(telegram_id, error = %e, "audio download failed");
            bot.edit_message_text(
                msg.chat.id,
                status.id,
                "❌ Не удалось скачать аудиофайл для обработки.",
            )
            .await?;
            return Ok(());
        }
    };

    let transcript = match app.stt.recognize_ogg(&audio).await {
        Ok(transcript) if !transcript.trim().is_empty() => transcript,
        Ok(_) | Err(_) => {
            bot.edit_message_text(
                msg.chat.id,
                status.id,
                "❌ К сожалению, не удалось распознать речь.",
            )
            .await?;
            return Ok(());
        }
    };

    db::increment_stt_count(&app.pool, telegram_id).await?;

    let trimmed = transcript.trim();
    if trimmed.chars().count() < limits.min_stt_text_chars
        || trimmed.split_whitespace().count() < limits.min_stt_text_words
    {
        bot.edit_message_text(
            msg.chat.id,
            status.id,
            format!(
                "❌ Распознанный текст слишком короткий: {}",
                html::code_inline(&html::escape(trimmed))
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    bot.edit_message_text(
        msg.chat.id,
        status.id,
        format!(
            "🗣️ Распознано: {}\n\n✨ Анализирую и сохраняю заметку...",
            html::code_inline(&html::escape(trimmed))
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;

    let audio_file_id = voice.file.id.0.clone();
    let outcome =
        note_creator::process_and_save_note(&bot, &app, telegram_id, trimmed, Some(audio_file_id))
            .await?;

    match outcome {
        CreateOutcome::Created { note, message } => {
            info!(telegram_id, note_id = note.note_id, "voice note saved");
            if let Err(e) = db::log_user_action(
                &app.pool,
                telegram_id,
                "create_note_voice_auto",
                Some(serde_json::json!({ "note_id": note.note_id })),
            )
            .await
            {
                warn!(error = %e, "failed to log voice note creation");
            }
            bot.edit_message_text(msg.chat.id, status.id, message)
                .parse_mode(ParseMode::Html)
                .reply_markup(ui_builder::undo_creation_keyboard(note.note_id))
                .await?;
        }
        CreateOutcome::Rejected { message } => {
            bot.edit_message_text(msg.chat.id, status.id, message)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

/// The text flow: filter chit-chat, then run the same pipeline.
async fn handle_text_message(bot: Bot, msg: Message, app: Arc<App>, telegram_id: i64) -> Result<()> {
    let (Some(user), Some(raw_text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    db::upsert_user(
        &app.pool,
        telegram_id,
        user.username.as_deref(),
        Some(user.first_name.as_str()),
        user.last_name.as_deref(),
        user.language_code.as_deref(),
    )
    .await?;

    let text = raw_text.trim().to_string();
    if text.is_empty() || text.starts_with('/') {
        return Ok(());
    }

    // Forwarded messages are deliberate, they skip the chit-chat filter
    let forwarded = msg.forward_origin().is_some();
    if !forwarded
        && (text.chars().count() < MIN_TEXT_LENGTH_FOR_NOTE
            || text.split_whitespace().count() < MIN_WORDS_FOR_NOTE
            || GARBAGE_WORDS.contains(&text.to_lowercase().as_str()))
    {
        info!(telegram_id, "ignoring short or garbage text");
        return Ok(());
    }

    let status_text = if forwarded {
        "✔️ Пересланное сообщение получено. Обрабатываю..."
    } else {
        "✔️ Сообщение принято. Обрабатываю..."
    };
    let status = bot.send_message(msg.chat.id, status_text).await?;

    let outcome = note_creator::process_and_save_note(&bot, &app, telegram_id, &text, None).await?;
    match outcome {
        CreateOutcome::Created { note, message } => {
            info!(telegram_id, note_id = note.note_id, "text note saved");
            if let Err(e) = db::log_user_action(
                &app.pool,
                telegram_id,
                "create_note_text_auto",
                Some(serde_json::json!({ "note_id": note.note_id })),
            )
            .await
            {
                warn!(error = %e, "failed to log text note creation");
            }
            bot.edit_message_text(msg.chat.id, status.id, message)
                .parse_mode(ParseMode::Html)
                .reply_markup(ui_builder::undo_creation_keyboard(note.note_id))
                .await?;
        }
        CreateOutcome::Rejected { message } => {
            bot.edit_message_text(msg.chat.id, status.id, message)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

/// Route a message into whichever prompt is waiting for it.
async fn handle_pending_input(
    bot: Bot,
    msg: Message,
    app: Arc<App>,
    pending: PendingInput,
) -> Result<()> {
    let chat_id = msg.chat.id;
    let telegram_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(chat_id.0);

    match pending {
        PendingInput::EditNoteText { note_id, page } => {
            let Some(new_text) = msg.text().map(str::trim) else {
                bot.send_message(chat_id, "Пришлите новый текст заметки или /cancel.")
                    .await?;
                return Ok(());
            };
            if new_text.chars().count() < 3 {
                bot.send_message(
                    chat_id,
                    "Текст заметки слишком короткий. Введите более содержательный текст или отмените /cancel.",
                )
                .await?;
                return Ok(());
            }
            app.pending.clear(chat_id.0);
            if db::update_note_text(&app.pool, note_id, telegram_id, new_text).await? {
                bot.send_message(
                    chat_id,
                    format!("✅ Текст заметки #{note_id} успешно обновлен."),
                )
                .await?;
                show_notes_page(&bot, &app, chat_id, None, telegram_id, page, false).await?;
            } else {
                bot.send_message(chat_id, "❌ Произошла ошибка при обновлении заметки.")
                    .await?;
            }
        }

        PendingInput::AwaitTimezone => {
            let Some(name) = msg.text().map(str::trim) else {
                bot.send_message(chat_id, "Отправьте название часового пояса текстом или /cancel.")
                    .await?;
                return Ok(());
            };
            if tz::parse_timezone(name).is_none() {
                bot.send_message(
                    chat_id,
                    format!(
                        "❌ Часовой пояс {} не найден.\nПроверьте написание (например, {}) и попробуйте снова.",
                        html::code_inline(&html::escape(name)),
                        html::code_inline("Europe/Berlin")
                    ),
                )
                .parse_mode(ParseMode::Html)
                .await?;
                return Ok(());
            }
            app.pending.clear(chat_id.0);
            db::set_user_timezone(&app.pool, telegram_id, name).await?;
            bot.send_message(chat_id, format!("✅ Часовой пояс установлен: {name}"))
                .await?;
            show_settings_menu(&bot, &app, chat_id, None, telegram_id).await?;
        }

        PendingInput::AwaitReminderTime => {
            let Some(value) = msg.text().map(str::trim) else {
                bot.send_message(chat_id, "Отправьте время в формате ЧЧ:ММ или /cancel.")
                    .await?;
                return Ok(());
            };
            let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M") else {
                bot.send_message(
                    chat_id,
                    format!(
                        "❌ Неверный формат времени. Введите время в формате {}, например, {}.",
                        html::code_inline("ЧЧ:ММ"),
                        html::code_inline("09:30")
                    ),
                )
                .parse_mode(ParseMode::Html)
                .await?;
                return Ok(());
            };
            app.pending.clear(chat_id.0);
            db::set_default_reminder_time(&app.pool, telegram_id, time).await?;
            bot.send_message(
                chat_id,
                format!("✅ Время напоминаний установлено на {value}."),
            )
            .await?;
            show_settings_menu(&bot, &app, chat_id, None, telegram_id).await?;
        }

        PendingInput::BirthdayName => {
            let Some(name) = msg.text().map(str::trim).filter(|n| !n.is_empty()) else {
                bot.send_message(chat_id, "Отправьте имя текстом или /cancel.")
                    .await?;
                return Ok(());
            };
            app.pending.set(
                chat_id.0,
                PendingInput::BirthdayDate {
                    person_name: name.to_string(),
                },
            );
            bot.send_message(
                chat_id,
                format!(
                    "Отлично! Теперь введите дату рождения для {}.\n\nИспользуйте формат {} (например, {}) или {}, если год не важен.",
                    html::bold(&html::escape(name)),
                    html::code_inline("ДД.ММ.ГГГГ"),
                    html::code_inline("25.12.1980"),
                    html::code_inline("ДД.ММ")
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }

        PendingInput::BirthdayDate { person_name } => {
            let Some(value) = msg.text().map(str::trim) else {
                bot.send_message(chat_id, "Отправьте дату текстом или /cancel.")
                    .await?;
                return Ok(());
            };
            let Some((day, month, year)) = parse_birthday_date(value) else {
                bot.send_message(
                    chat_id,
                    format!(
                        "❌ Неверный формат даты. Введите дату в формате {} или {}.",
                        html::code_inline("ДД.ММ.ГГГГ"),
                        html::code_inline("ДД.ММ")
                    ),
                )
                .parse_mode(ParseMode::Html)
                .await?;
                return Ok(());
            };
            app.pending.clear(chat_id.0);
            let birthday =
                db::add_birthday(&app.pool, telegram_id, &person_name, day, month, year).await?;
            if let Err(e) = db::log_user_action(
                &app.pool,
                telegram_id,
                "add_birthday_manual",
                Some(serde_json::json!({ "birthday_id": birthday.id })),
            )
            .await
            {
                warn!(error = %e, "failed to log birthday creation");
            }
            bot.send_message(
                chat_id,
                format!(
                    "✅ Готово! Напоминание о дне рождения для {} успешно добавлено.",
                    html::bold(&html::escape(&person_name))
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            show_birthdays_page(&bot, &app, chat_id, None, telegram_id, 1).await?;
        }

        PendingInput::BirthdayImport => {
            let Some(document) = msg.document() else {
                bot.send_message(
                    chat_id,
                    "Пожалуйста, отправьте текстовый файл с расширением .txt (или /cancel).",
                )
                .await?;
                return Ok(());
            };
            let is_plain_text = document
                .mime_type
                .as_ref()
                .map(|mime| mime.essence_str() == "text/plain")
                .unwrap_or(false);
            if !is_plain_text {
                bot.send_message(
                    chat_id,
                    "Пожалуйста, отправьте текстовый файл с расширением .txt",
                )
                .await?;
                return Ok(());
            }

            let status = bot
                .send_message(chat_id, "⏳ Получил файл. Начинаю обработку...")
                .await?;
            let file = bot.get_file(document.file.id.clone()).await?;
            let bytes = match stt::download_telegram_file(&app.http, bot.token(), &file.path).await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(telegram_id, error = %e, "import file download failed");
                    bot.edit_message_text(chat_id, status.id, "❌ Не удалось скачать файл.")
                        .await?;
                    return Ok(());
                }
            };
            let Ok(content) = String::from_utf8(bytes) else {
                bot.edit_message_text(
                    chat_id,
                    status.id,
                    "❌ Не удалось прочитать файл. Убедитесь, что он в кодировке UTF-8.",
                )
                .await?;
                return Ok(());
            };

            let (entries, errors) = parse_birthday_import(&content);
            if entries.is_empty() {
                bot.edit_message_text(
                    chat_id,
                    status.id,
                    "В файле не найдено корректных записей. Пожалуйста, проверьте формат.",
                )
                .await?;
                return Ok(());
            }

            app.pending.clear(chat_id.0);
            let added = db::add_birthdays_bulk(&app.pool, telegram_id, &entries).await?;
            if let Err(e) = db::log_user_action(
                &app.pool,
                telegram_id,
                "import_birthdays_file",
                Some(serde_json::json!({ "imported_count": added })),
            )
            .await
            {
                warn!(error = %e, "failed to log birthday import");
            }
            bot.edit_message_text(
                chat_id,
                status.id,
                format!(
                    "✅ {}\n\n• Успешно добавлено: {}\n• Строк с ошибками: {}",
                    html::bold("Импорт завершен!"),
                    html::bold(&added.to_string()),
                    html::bold(&errors.to_string())
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            show_birthdays_page(&bot, &app, chat_id, None, telegram_id, 1).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_short_dates() {
        assert_eq!(parse_birthday_date("25.12.1980"), Some((25, 12, Some(1980))));
        assert_eq!(parse_birthday_date("5.9"), Some((5, 9, None)));
        assert_eq!(parse_birthday_date(" 28.05.1976 "), Some((28, 5, Some(1976))));
        assert_eq!(parse_birthday_date("29.02"), Some((29, 2, None)));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_birthday_date("32.01.1990"), None);
        assert_eq!(parse_birthday_date("31.04.1990"), None);
        assert_eq!(parse_birthday_date("29.02.2023"), None);
        assert_eq!(parse_birthday_date("12-05-1990"), None);
        assert_eq!(parse_birthday_date("завтра"), None);
    }

    #[test]
    fn import_splits_names_and_counts_errors() {
        let content = "Мама - 28.05.1976\nИван Петров - 13.06.1977\nГодовщина - 05.09\n\nbroken line\nNo Date - abc";
        let (entries, errors) = parse_birthday_import(content);
        assert_eq!(entries.len(), 3);
        assert_eq!(errors, 2);
        assert_eq!(entries[0], ("Мама".to_string(), 28, 5, Some(1976)));
        assert_eq!(entries[2], ("Годовщина".to_string(), 5, 9, None));
    }

    #[test]
    fn garbage_filter_terms_are_lowercase() {
        for word in GARBAGE_WORDS {
            assert_eq!(*word, word.to_lowercase());
        }
    }
}
