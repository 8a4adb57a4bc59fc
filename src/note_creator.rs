//! Shared note-creation pipeline used by both the voice and the text
//! flows: analyze, resolve the due date, persist, schedule the reminder.

use anyhow::Result;
use chrono::{NaiveTime, Utc};
use teloxide::prelude::*;
use teloxide::utils::html;
use tracing::error;

use crate::db::{self, NewNote, Note};
use crate::scheduler;
use crate::tz;
use crate::App;

/// Result of trying to turn a message into a note.
pub enum CreateOutcome {
    Created { note: Note, message: String },
    Rejected { message: String },
}

/// Fallback hour for free users when a note carries a date without a time.
fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).expect("static time")
}

/// Analyze `text`, save it as a note and schedule its reminder.
///
/// Analysis failures degrade instead of failing: the raw text is stored
/// and the user is told the note was kept as-is.
pub async fn process_and_save_note(
    bot: &Bot,
    app: &App,
    telegram_id: i64,
    text: &str,
    audio_file_id: Option<String>,
) -> Result<CreateOutcome> {
    let Some(profile) = db::get_user_profile(&app.pool, telegram_id).await? else {
        return Ok(CreateOutcome::Rejected {
            message: "Не удалось найти ваш профиль. Нажмите /start.".to_string(),
        });
    };

    if !profile.is_vip {
        let active = db::count_active_notes(&app.pool, telegram_id).await?;
        if active >= app.config.limits.max_active_notes {
            return Ok(CreateOutcome::Rejected {
                message: format!(
                    "Достигнут лимит в {} активных заметок. Завершите или удалите старые, чтобы создать новую.",
                    app.config.limits.max_active_notes
                ),
            });
        }
    }

    if !app.llm.is_configured() {
        let note_id = db::create_note(
            &app.pool,
            NewNote {
                telegram_id,
                corrected_text: text.to_string(),
                original_stt_text: Some(text.to_string()),
                original_audio_telegram_file_id: audio_file_id,
                note_taken_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await?;
        let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
            return Ok(CreateOutcome::Rejected {
                message: "❌ Ошибка при сохранении заметки.".to_string(),
            });
        };
        return Ok(CreateOutcome::Created {
            message: format!("✅ Заметка #{note_id} сохранена (без AI-анализа)."),
            note,
        });
    }

    let current_user_dt = tz::local_now(&profile.timezone);
    let analysis = app.llm.analyze(text, &current_user_dt.to_rfc3339()).await;

    if analysis.is_degraded() {
        error!(
            telegram_id,
            error = analysis.error.as_deref().unwrap_or("unknown"),
            "LLM analysis failed, saving raw text"
        );
        let note_id = db::create_note(
            &app.pool,
            NewNote {
                telegram_id,
                corrected_text: text.to_string(),
                original_stt_text: Some(text.to_string()),
                original_audio_telegram_file_id: audio_file_id,
                note_taken_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await?;
        let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
            return Ok(CreateOutcome::Rejected {
                message: "Ошибка и при AI-анализе, и при сохранении.".to_string(),
            });
        };
        return Ok(CreateOutcome::Created {
            message:
                "⚠️ Заметка сохранена, но при AI-анализе произошла ошибка. Текст сохранен как есть."
                    .to_string(),
            note,
        });
    }

    // A midnight timestamp means "date without a time": shift it to the
    // user's preferred hour (free tier: noon) in their timezone.
    let default_time = if profile.is_vip {
        profile.default_reminder_time
    } else {
        noon()
    };
    let due_date = analysis
        .first_due_date()
        .map(|due| scheduler::resolve_due_date(due, &profile.timezone, default_time));
    let recurrence_rule = if profile.is_vip {
        analysis.recurrence_rule.clone()
    } else {
        None
    };

    let note_id = db::create_note(
        &app.pool,
        NewNote {
            telegram_id,
            corrected_text: analysis.corrected_text.clone(),
            original_stt_text: Some(text.to_string()),
            original_audio_telegram_file_id: audio_file_id,
            llm_analysis_json: serde_json::to_value(&analysis).ok(),
            note_taken_at: Some(Utc::now()),
            due_date,
            recurrence_rule,
            ..Default::default()
        },
    )
    .await?;

    let Some(note) = db::get_note(&app.pool, note_id, telegram_id).await? else {
        return Ok(CreateOutcome::Rejected {
            message: "❌ Ошибка при сохранении заметки в базу.".to_string(),
        });
    };

    if note.due_date.is_some() {
        app.scheduler
            .schedule(bot.clone(), app.pool.clone(), &note, &profile);
    }

    let mut message = format!(
        "✅ Заметка #{} успешно сохранена!",
        html::bold(&note_id.to_string())
    );
    if let Some(due) = note.due_date {
        message.push_str(&format!(
            "\n🔔 Напомню: {}",
            html::italic(&tz::format_datetime_for_user(due, &profile.timezone))
        ));
    }

    Ok(CreateOutcome::Created { note, message })
}
