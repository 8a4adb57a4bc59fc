//! Callback-query dispatch for every inline keyboard in the bot.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, MessageId, ParseMode};
use teloxide::utils::html;
use tracing::{debug, warn};

use super::callback_data::Callback;
use super::state::PendingInput;
use super::ui_builder;
use crate::db;
use crate::tz;
use crate::App;

/// Edit the given message in place, falling back to a fresh message when
/// Telegram refuses the edit (deleted or too-old messages).
pub(crate) async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: &str,
    keyboard: Option<teloxide::types::InlineKeyboardMarkup>,
) -> Result<()> {
    if let Some(message_id) = message_id {
        let request = bot
            .edit_message_text(chat_id, message_id, text)
            .parse_mode(ParseMode::Html);
        let result = match keyboard.clone() {
            Some(kb) => request.reply_markup(kb).await,
            None => request.await,
        };
        match result {
            Ok(_) => return Ok(()),
            Err(e) => debug!(error = %e, "could not edit message, sending a new one"),
        }
    }
    let request = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html);
    match keyboard {
        Some(kb) => request.reply_markup(kb).await?,
        None => request.await?,
    };
    Ok(())
}

/// Render one page of the active or archived note list.
pub(crate) async fn show_notes_page(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    telegram_id: i64,
    page: i64,
    archived: bool,
) -> Result<()> {
    let per_page = app.config.limits.notes_per_page;
    let mut page = page.max(1);
    let (mut notes, total) =
        db::paginated_notes(&app.pool, telegram_id, page, per_page, archived).await?;
    let total_pages = ((total + per_page - 1) / per_page).max(1);
    if page > total_pages {
        page = total_pages;
        notes = db::paginated_notes(&app.pool, telegram_id, page, per_page, archived)
            .await?
            .0;
    }

    let text = if notes.is_empty() && page == 1 {
        if archived {
            "В архиве пусто.".to_string()
        } else {
            "У вас пока нет активных задач. Создайте новую!".to_string()
        }
    } else {
        let title = if archived {
            "🗄️ Ваш архив"
        } else {
            "📝 Ваши активные задачи"
        };
        html::bold(&format!("{title} (Стр. {page}/{total_pages}):"))
    };

    let keyboard = ui_builder::notes_list_keyboard(&notes, page, total_pages, archived);
    edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
}

/// Render the detail card of a note; falls back to the list when the note
/// is gone.
pub(crate) async fn show_note_view(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    telegram_id: i64,
    note_id: i32,
    page: i64,
    archived_view: bool,
) -> Result<()> {
    let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
        return show_notes_page(bot, app, chat_id, message_id, telegram_id, page, archived_view)
            .await;
    };
    let profile = db::get_user_profile(&app.pool, telegram_id).await?;
    let timezone = profile
        .as_ref()
        .map(|p| p.timezone.clone())
        .unwrap_or_else(|| "UTC".to_string());
    let is_vip = profile.map(|p| p.is_vip).unwrap_or(false);

    let text = ui_builder::format_note_view(&note, &timezone, is_vip);
    let keyboard = ui_builder::note_view_keyboard(&note, page, archived_view, is_vip);
    edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
}

/// Render one page of the birthday list.
pub(crate) async fn show_birthdays_page(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    telegram_id: i64,
    page: i64,
) -> Result<()> {
    let per_page = app.config.limits.birthdays_per_page;
    let (birthdays, total) = db::birthdays_page(&app.pool, telegram_id, page, per_page).await?;
    let total_pages = ((total + per_page - 1) / per_page).max(1);
    let is_vip = db::get_user_profile(&app.pool, telegram_id)
        .await?
        .map(|p| p.is_vip)
        .unwrap_or(false);

    let text = if total == 0 {
        format!(
            "{}\n\nУ вас пока нет сохраненных дат. Давайте добавим первую!",
            html::bold("🎂 Дни рождения")
        )
    } else {
        format!(
            "{} ({total})\n\nНажмите на запись, чтобы удалить её.",
            html::bold("🎂 Ваши сохраненные дни рождения")
        )
    };
    let keyboard = ui_builder::birthdays_keyboard(&birthdays, page, total_pages, is_vip);
    edit_or_send(bot, chat_id, message_id, &text, Some(keyboard)).await
}

/// Render the settings overview.
pub(crate) async fn show_settings_menu(
    bot: &Bot,
    app: &App,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    telegram_id: i64,
) -> Result<()> {
    let Some(profile) = db::get_user_profile(&app.pool, telegram_id).await? else {
        return edit_or_send(
            bot,
            chat_id,
            message_id,
            "Профиль не найден. Пожалуйста, нажмите /start.",
            None,
        )
        .await;
    };
    let text = ui_builder::format_settings(&profile);
    edit_or_send(
        bot,
        chat_id,
        message_id,
        &text,
        Some(ui_builder::settings_menu_keyboard()),
    )
    .await
}

pub async fn callback_handler(bot: Bot, q: CallbackQuery, app: Arc<App>) -> Result<()> {
    let telegram_id = q.from.id.0 as i64;
    debug!(telegram_id, data = ?q.data, "callback query received");

    let Some(action) = q.data.as_deref().and_then(Callback::parse) else {
        warn!(telegram_id, data = ?q.data, "unparsable callback payload");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(msg) = q.message.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let chat_id = msg.chat().id;
    let message_id = msg.id();
    let callback_id = q.id.clone();

    match action {
        Callback::MainMenu => {
            app.pending.clear(chat_id.0);
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                "🏠 Вы в главном меню.",
                Some(ui_builder::main_menu_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::Profile => {
            app.pending.clear(chat_id.0);
            let Some(profile) = db::get_user_profile(&app.pool, telegram_id).await? else {
                bot.answer_callback_query(callback_id)
                    .text("Профиль не найден. Пожалуйста, нажмите /start.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };
            let active = db::count_active_notes(&app.pool, telegram_id).await?;
            let text =
                ui_builder::format_profile(&profile, active, app.config.limits.max_active_notes);
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::main_menu_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::SettingsMenu => {
            app.pending.clear(chat_id.0);
            show_settings_menu(&bot, &app, chat_id, Some(message_id), telegram_id).await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::SettingsTimezone => {
            app.pending.clear(chat_id.0);
            let text = format!(
                "{}\n\nВаш часовой пояс используется для корректного отображения всех дат и времени в боте.\n\nВыберите часовой пояс из списка или введите его вручную.",
                html::bold("🕒 Настройка часового пояса")
            );
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::timezone_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::SettingsReminderTime => {
            app.pending.clear(chat_id.0);
            let text = format!(
                "{}\n\nЭто время используется для напоминаний, у которых в тексте была указана только дата (например, «завтра» или «15 июля»).",
                html::bold("⏰ Время напоминаний по умолчанию")
            );
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::reminder_time_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::SetTimezone(name) => {
            if tz::parse_timezone(&name).is_none() {
                bot.answer_callback_query(callback_id)
                    .text("❌ Неизвестный часовой пояс.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            if db::set_user_timezone(&app.pool, telegram_id, &name).await? {
                bot.answer_callback_query(callback_id)
                    .text(format!("✅ Часовой пояс установлен: {name}"))
                    .show_alert(true)
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Ошибка при установке часового пояса.")
                    .show_alert(true)
                    .await?;
            }
            show_settings_menu(&bot, &app, chat_id, Some(message_id), telegram_id).await?;
        }

        Callback::ManualTimezone => {
            app.pending.set(chat_id.0, PendingInput::AwaitTimezone);
            let text = format!(
                "{}\n\nОтправьте название в формате {} (например, {}).\n\nДля отмены отправьте /cancel.",
                html::bold("⌨️ Ручной ввод часового пояса"),
                html::code_inline("Continent/City"),
                html::code_inline("Europe/Moscow"),
            );
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::timezone_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id)
                .text("Ожидаю ваш ввод...")
                .await?;
        }

        Callback::SetReminderTime(value) => {
            match NaiveTime::parse_from_str(&value, "%H:%M") {
                Ok(time) => {
                    if db::set_default_reminder_time(&app.pool, telegram_id, time).await? {
                        bot.answer_callback_query(callback_id)
                            .text(format!("✅ Время напоминаний установлено на {value}"))
                            .show_alert(true)
                            .await?;
                    } else {
                        bot.answer_callback_query(callback_id)
                            .text("❌ Ошибка при установке времени.")
                            .show_alert(true)
                            .await?;
                    }
                }
                Err(_) => {
                    bot.answer_callback_query(callback_id)
                        .text("Неверный формат времени.")
                        .show_alert(true)
                        .await?;
                }
            }
            show_settings_menu(&bot, &app, chat_id, Some(message_id), telegram_id).await?;
        }

        Callback::ManualReminderTime => {
            app.pending.set(chat_id.0, PendingInput::AwaitReminderTime);
            let text = format!(
                "{}\n\nОтправьте желаемое время в формате {} (например, {} или {}).\n\nДля отмены отправьте /cancel.",
                html::bold("⌨️ Ручной ввод времени"),
                html::code_inline("ЧЧ:ММ"),
                html::code_inline("09:30"),
                html::code_inline("22:00"),
            );
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::reminder_time_keyboard()),
            )
            .await?;
            bot.answer_callback_query(callback_id)
                .text("Ожидаю ваш ввод...")
                .await?;
        }

        Callback::NotesPage { page, archived } => {
            bot.answer_callback_query(callback_id).await?;
            show_notes_page(
                &bot,
                &app,
                chat_id,
                Some(message_id),
                telegram_id,
                page,
                archived,
            )
            .await?;
        }

        Callback::NoteView {
            note_id,
            page,
            archived,
        } => {
            if db::get_note(&app.pool, note_id, telegram_id).await?.is_none() {
                bot.answer_callback_query(callback_id)
                    .text("Заметка не найдена или удалена.")
                    .show_alert(true)
                    .await?;
            } else {
                bot.answer_callback_query(callback_id).await?;
            }
            show_note_view(
                &bot,
                &app,
                chat_id,
                Some(message_id),
                telegram_id,
                note_id,
                page,
                archived,
            )
            .await?;
        }

        Callback::NoteArchive { note_id, page } => {
            if db::set_note_archived(&app.pool, note_id, telegram_id, true).await? {
                app.scheduler.cancel(note_id);
                bot.answer_callback_query(callback_id)
                    .text("🗄️ Заметка перемещена в архив")
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Ошибка при архивации")
                    .show_alert(true)
                    .await?;
            }
            show_notes_page(&bot, &app, chat_id, Some(message_id), telegram_id, page, false)
                .await?;
        }

        Callback::NoteUnarchive { note_id, page } => {
            let profile = db::get_user_profile(&app.pool, telegram_id).await?;
            let is_vip = profile.as_ref().map(|p| p.is_vip).unwrap_or(false);
            if !is_vip {
                let active = db::count_active_notes(&app.pool, telegram_id).await?;
                if active >= app.config.limits.max_active_notes {
                    bot.answer_callback_query(callback_id)
                        .text(format!(
                            "Нельзя восстановить. Лимит в {} активных заметок.",
                            app.config.limits.max_active_notes
                        ))
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
            }

            if db::set_note_archived(&app.pool, note_id, telegram_id, false).await? {
                if let (Some(profile), Ok(Some(note))) =
                    (profile, db::get_note(&app.pool, note_id, telegram_id).await)
                {
                    if note.due_date.is_some() {
                        app.scheduler
                            .schedule(bot.clone(), app.pool.clone(), &note, &profile);
                    }
                }
                bot.answer_callback_query(callback_id)
                    .text("↩️ Заметка восстановлена из архива")
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Ошибка при восстановлении")
                    .show_alert(true)
                    .await?;
            }
            show_notes_page(&bot, &app, chat_id, Some(message_id), telegram_id, page, true)
                .await?;
        }

        Callback::NoteComplete { note_id, page } => {
            let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Заметка не найдена.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };
            let profile = db::get_user_profile(&app.pool, telegram_id).await?;
            let is_vip = profile.as_ref().map(|p| p.is_vip).unwrap_or(false);

            // Recurring notes are not completed, they roll to the next slot
            if is_vip && note.recurrence_rule.is_some() {
                if let Some(profile) = profile.as_ref() {
                    if let Some(next) = app
                        .scheduler
                        .advance_recurring_note(&bot, &app.pool, &note, profile)
                        .await
                    {
                        bot.answer_callback_query(callback_id)
                            .text("✅ Отлично! Это событие отмечено, ждем следующего.")
                            .await?;
                        let old_text = msg
                            .regular_message()
                            .and_then(|m| m.text())
                            .unwrap_or_default();
                        let status = format!(
                            "Статус: ✅ Отмечено, следующее напоминание {}",
                            tz::format_datetime_for_user(next, &profile.timezone)
                        );
                        let _ = bot
                            .edit_message_text(
                                chat_id,
                                message_id,
                                format!("{}\n\n{}", html::escape(old_text), html::bold(&status)),
                            )
                            .parse_mode(ParseMode::Html)
                            .await;
                        return Ok(());
                    }
                }
            }

            if db::set_note_completed(&app.pool, note_id, telegram_id).await? {
                app.scheduler.cancel(note_id);
                if let Err(e) = db::log_user_action(
                    &app.pool,
                    telegram_id,
                    "complete_note",
                    Some(serde_json::json!({ "note_id": note_id })),
                )
                .await
                {
                    warn!(error = %e, "failed to log completion");
                }
                bot.answer_callback_query(callback_id)
                    .text("✅ Отлично! Задача выполнена и перенесена в архив.")
                    .await?;
                show_notes_page(&bot, &app, chat_id, Some(message_id), telegram_id, page, false)
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Не удалось отметить задачу как выполненную.")
                    .show_alert(true)
                    .await?;
            }
        }

        Callback::NoteConfirmDelete {
            note_id,
            page,
            archived,
        } => {
            let note = db::get_note(&app.pool, note_id, telegram_id).await?;
            let is_recurring = note.map(|n| n.recurrence_rule.is_some()).unwrap_or(false);
            let warning = if is_recurring {
                format!(
                    "Вы собираетесь {} удалить повторяющуюся заметку #{note_id} и {} её будущие повторения.\nЭто действие необратимо.",
                    html::bold("НАВСЕГДА"),
                    html::bold("ВСЕ")
                )
            } else {
                format!(
                    "Вы собираетесь {} удалить заметку #{note_id}.\nЭто действие необратимо.",
                    html::bold("НАВСЕГДА")
                )
            };
            let text = format!("‼️ {}\n\n{warning}", html::bold("ВЫ УВЕРЕНЫ?"));
            edit_or_send(
                &bot,
                chat_id,
                Some(message_id),
                &text,
                Some(ui_builder::confirm_delete_keyboard(note_id, page, archived)),
            )
            .await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::NoteDelete {
            note_id,
            page,
            archived,
        } => {
            if db::delete_note(&app.pool, note_id, telegram_id).await? {
                app.scheduler.cancel(note_id);
                bot.answer_callback_query(callback_id)
                    .text("🗑️ Заметка удалена навсегда!")
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Не удалось удалить заметку.")
                    .show_alert(true)
                    .await?;
            }
            show_notes_page(
                &bot,
                &app,
                chat_id,
                Some(message_id),
                telegram_id,
                page,
                archived,
            )
            .await?;
        }

        Callback::NoteEdit { note_id, page } => {
            app.pending
                .set(chat_id.0, PendingInput::EditNoteText { note_id, page });
            let text = format!(
                "✏️ {}\n\nПришлите мне новый текст для этой заметки. Чтобы отменить, просто отправьте /cancel.",
                html::bold("Редактирование заметки")
            );
            edit_or_send(&bot, chat_id, Some(message_id), &text, None).await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::NoteUndoCreate { note_id } => {
            if db::delete_note(&app.pool, note_id, telegram_id).await? {
                app.scheduler.cancel(note_id);
                if let Err(e) = db::log_user_action(
                    &app.pool,
                    telegram_id,
                    "undo_create_note",
                    Some(serde_json::json!({ "note_id": note_id })),
                )
                .await
                {
                    warn!(error = %e, "failed to log undo");
                }
                edit_or_send(
                    &bot,
                    chat_id,
                    Some(message_id),
                    &format!(
                        "🚫 Создание заметки #{} было отменено.",
                        html::bold(&note_id.to_string())
                    ),
                    None,
                )
                .await?;
                bot.answer_callback_query(callback_id)
                    .text("Создание отменено")
                    .await?;
            } else {
                edit_or_send(
                    &bot,
                    chat_id,
                    Some(message_id),
                    &format!(
                        "☑️ Заметка #{} уже была удалена или не найдена.",
                        html::bold(&note_id.to_string())
                    ),
                    None,
                )
                .await?;
                bot.answer_callback_query(callback_id)
                    .text("Действие уже неактуально")
                    .show_alert(true)
                    .await?;
            }
        }

        Callback::NoteStopRecurrence { note_id, page } => {
            if db::set_note_recurrence_rule(&app.pool, note_id, telegram_id, None).await? {
                bot.answer_callback_query(callback_id)
                    .text("✅ Повторение для этой заметки отключено.")
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Ошибка при отключении повторения.")
                    .show_alert(true)
                    .await?;
            }
            show_note_view(
                &bot,
                &app,
                chat_id,
                Some(message_id),
                telegram_id,
                note_id,
                page,
                false,
            )
            .await?;
        }

        Callback::NoteListenAudio { note_id } => {
            let audio_id = db::get_note(&app.pool, note_id, telegram_id)
                .await?
                .and_then(|n| n.original_audio_telegram_file_id);
            match audio_id {
                Some(file_id) => {
                    bot.answer_callback_query(callback_id)
                        .text("▶️ Отправляю аудио...")
                        .await?;
                    if let Err(e) = bot
                        .send_voice(chat_id, InputFile::file_id(FileId(file_id)))
                        .await
                    {
                        warn!(note_id, error = %e, "failed to send stored voice message");
                        bot.send_message(chat_id, "❌ Не удалось отправить аудиофайл.")
                            .await?;
                    }
                }
                None => {
                    bot.answer_callback_query(callback_id)
                        .text("Аудиофайл для этой заметки не найден.")
                        .show_alert(true)
                        .await?;
                }
            }
        }

        Callback::NoteSnooze { note_id, minutes } => {
            let Some(profile) = db::get_user_profile(&app.pool, telegram_id).await? else {
                bot.answer_callback_query(callback_id).await?;
                return Ok(());
            };
            if !profile.is_vip {
                bot.answer_callback_query(callback_id)
                    .text("⭐ Отложенные напоминания доступны только для VIP-пользователей.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Не удалось отложить: заметка не найдена.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };

            let new_due = Utc::now() + Duration::minutes(minutes);
            db::update_note_due_date(&app.pool, note_id, telegram_id, new_due).await?;
            let mut snoozed = note.clone();
            snoozed.due_date = Some(new_due);
            app.scheduler
                .schedule(bot.clone(), app.pool.clone(), &snoozed, &profile);

            let snooze_text = if minutes < 60 {
                format!("{minutes} мин.")
            } else {
                format!("{} ч.", minutes / 60)
            };
            bot.answer_callback_query(callback_id)
                .text(format!("👌 Понял! Напомню через {snooze_text}"))
                .await?;

            let local_time = new_due
                .with_timezone(&tz::user_tz(&profile.timezone))
                .format("%H:%M")
                .to_string();
            let old_text = msg
                .regular_message()
                .and_then(|m| m.text())
                .unwrap_or_default();
            let _ = bot
                .edit_message_text(
                    chat_id,
                    message_id,
                    format!(
                        "{}\n\n{}",
                        html::escape(old_text),
                        html::bold(&format!("Статус: ⏰ Отложено до {local_time}"))
                    ),
                )
                .parse_mode(ParseMode::Html)
                .await;
        }

        Callback::BirthdaysPage { page } => {
            bot.answer_callback_query(callback_id).await?;
            show_birthdays_page(&bot, &app, chat_id, Some(message_id), telegram_id, page).await?;
        }

        Callback::BirthdayAdd => {
            app.pending.set(chat_id.0, PendingInput::BirthdayName);
            let text = format!(
                "Введите имя человека, чей день рождения вы хотите добавить (например, {} или {}).\n\nДля отмены введите /cancel.",
                html::bold("Мама"),
                html::bold("Иван Петров")
            );
            edit_or_send(&bot, chat_id, Some(message_id), &text, None).await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::BirthdayImport => {
            let is_vip = db::get_user_profile(&app.pool, telegram_id)
                .await?
                .map(|p| p.is_vip)
                .unwrap_or(false);
            if !is_vip {
                bot.answer_callback_query(callback_id)
                    .text("⭐ Импорт из файла доступен только для VIP-пользователей.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            app.pending.set(chat_id.0, PendingInput::BirthdayImport);
            let text = format!(
                "Отлично! Пришлите мне текстовый файл ({}) со списком дней рождения.\n\n{} каждая запись должна быть на новой строке в формате:\n{}\n\n{}\n{}\n\nДля отмены отправьте /cancel.",
                html::code_inline(".txt"),
                html::bold("Важно:"),
                html::code_inline("Имя - ДД.ММ.ГГГГ"),
                html::bold("Пример:"),
                html::code_inline("Мама - 28.05.1976\nИван Петров - 13.06.1977\nГодовщина - 05.09"),
            );
            edit_or_send(&bot, chat_id, Some(message_id), &text, None).await?;
            bot.answer_callback_query(callback_id).await?;
        }

        Callback::BirthdayDelete { id, page } => {
            if db::delete_birthday(&app.pool, id, telegram_id).await? {
                bot.answer_callback_query(callback_id)
                    .text("🗑️ Запись удалена.")
                    .await?;
            } else {
                bot.answer_callback_query(callback_id)
                    .text("❌ Ошибка при удалении.")
                    .show_alert(true)
                    .await?;
            }
            show_birthdays_page(&bot, &app, chat_id, Some(message_id), telegram_id, page).await?;
        }
    }

    Ok(())
}
