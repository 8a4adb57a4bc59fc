//! UI builder: inline keyboards and HTML message formatting.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;

use super::callback_data::Callback;
use crate::db::{Birthday, Note, UserProfile};
use crate::recurrence;
use crate::tz::{self, COMMON_TIMEZONES};

fn button(text: impl Into<String>, action: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.encode())
}

/// Shorten note text for a list button, respecting UTF-8 boundaries.
pub fn note_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut snippet: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    snippet.push('…');
    snippet
}

fn note_icon(note: &Note) -> &'static str {
    if note.is_completed {
        "✅"
    } else if note.is_archived {
        "🗄️"
    } else {
        "📌"
    }
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            "📝 Мои заметки",
            Callback::NotesPage {
                page: 1,
                archived: false,
            },
        )],
        vec![button("🎂 Дни рождения", Callback::BirthdaysPage { page: 1 })],
        vec![button("👤 Профиль", Callback::Profile)],
        vec![button("⚙️ Настройки", Callback::SettingsMenu)],
    ])
}

/// Shown under a freshly auto-saved note.
pub fn undo_creation_keyboard(note_id: i32) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "🚫 Отменить создание",
        Callback::NoteUndoCreate { note_id },
    )]])
}

/// Note list: one row per note, then pagination and navigation rows.
pub fn notes_list_keyboard(
    notes: &[Note],
    page: i64,
    total_pages: i64,
    archived: bool,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = notes
        .iter()
        .map(|note| {
            vec![button(
                format!(
                    "{} #{} {}",
                    note_icon(note),
                    note.note_id,
                    note_snippet(&note.corrected_text, 30)
                ),
                Callback::NoteView {
                    note_id: note.note_id,
                    page,
                    archived,
                },
            )]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 1 {
        nav.push(button(
            "⬅️",
            Callback::NotesPage {
                page: page - 1,
                archived,
            },
        ));
    }
    if page < total_pages {
        nav.push(button(
            "➡️",
            Callback::NotesPage {
                page: page + 1,
                archived,
            },
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    let toggle = if archived {
        button(
            "📝 Активные",
            Callback::NotesPage {
                page: 1,
                archived: false,
            },
        )
    } else {
        button(
            "🗄️ Архив",
            Callback::NotesPage {
                page: 1,
                archived: true,
            },
        )
    };
    rows.push(vec![toggle, button("🏠 Главное меню", Callback::MainMenu)]);

    InlineKeyboardMarkup::new(rows)
}

/// Actions for one note, honoring its state and the user's tier.
pub fn note_view_keyboard(
    note: &Note,
    page: i64,
    archived_view: bool,
    is_vip: bool,
) -> InlineKeyboardMarkup {
    let note_id = note.note_id;
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    if !note.is_archived && !note.is_completed {
        rows.push(vec![button(
            "✅ Выполнено",
            Callback::NoteComplete { note_id, page },
        )]);
    }

    let mut edit_row = vec![button("✏️ Редактировать", Callback::NoteEdit { note_id, page })];
    if note.original_audio_telegram_file_id.is_some() {
        edit_row.push(button("🔊 Прослушать", Callback::NoteListenAudio { note_id }));
    }
    rows.push(edit_row);

    if note.is_archived {
        rows.push(vec![button(
            "↩️ Вернуть из архива",
            Callback::NoteUnarchive { note_id, page },
        )]);
    } else {
        rows.push(vec![button(
            "🗄️ В архив",
            Callback::NoteArchive { note_id, page },
        )]);
    }

    if is_vip && note.recurrence_rule.is_some() {
        rows.push(vec![button(
            "🔁 Отключить повторение",
            Callback::NoteStopRecurrence { note_id, page },
        )]);
    }

    rows.push(vec![button(
        "🗑️ Удалить",
        Callback::NoteConfirmDelete {
            note_id,
            page,
            archived: archived_view,
        },
    )]);
    rows.push(vec![button(
        "⬅️ К списку",
        Callback::NotesPage {
            page,
            archived: archived_view,
        },
    )]);

    InlineKeyboardMarkup::new(rows)
}

pub fn confirm_delete_keyboard(note_id: i32, page: i64, archived: bool) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            "‼️ Да, удалить навсегда",
            Callback::NoteDelete {
                note_id,
                page,
                archived,
            },
        )],
        vec![button(
            "⬅️ Нет, назад",
            Callback::NoteView {
                note_id,
                page,
                archived,
            },
        )],
    ])
}

/// Keyboard attached to a fired reminder. Snoozing is a VIP feature.
pub fn reminder_keyboard(note_id: i32, is_vip: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![button(
        "✅ Выполнено",
        Callback::NoteComplete { note_id, page: 1 },
    )]];
    if is_vip {
        rows.push(vec![
            button("⏰ 10 мин", Callback::NoteSnooze { note_id, minutes: 10 }),
            button("⏰ 1 час", Callback::NoteSnooze { note_id, minutes: 60 }),
            button("⏰ 3 часа", Callback::NoteSnooze { note_id, minutes: 180 }),
        ]);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn settings_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🕒 Часовой пояс", Callback::SettingsTimezone)],
        vec![button("⏰ Время напоминаний", Callback::SettingsReminderTime)],
        vec![button("🏠 Главное меню", Callback::MainMenu)],
    ])
}

pub fn timezone_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = COMMON_TIMEZONES
        .iter()
        .map(|(label, name)| vec![button(*label, Callback::SetTimezone((*name).to_string()))])
        .collect();
    rows.push(vec![button("⌨️ Ввести вручную", Callback::ManualTimezone)]);
    rows.push(vec![button("⬅️ Назад", Callback::SettingsMenu)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn reminder_time_keyboard() -> InlineKeyboardMarkup {
    let presets = [
        ["07:00", "08:00", "09:00"],
        ["10:00", "12:00", "18:00"],
    ];
    let mut rows: Vec<Vec<InlineKeyboardButton>> = presets
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| button(*value, Callback::SetReminderTime((*value).to_string())))
                .collect()
        })
        .collect();
    rows.push(vec![button("⌨️ Ввести вручную", Callback::ManualReminderTime)]);
    rows.push(vec![button("⬅️ Назад", Callback::SettingsMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Birthday list: one row per entry (tap to delete), then the menu rows.
pub fn birthdays_keyboard(
    birthdays: &[Birthday],
    page: i64,
    total_pages: i64,
    is_vip: bool,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = birthdays
        .iter()
        .map(|birthday| {
            let date = match birthday.year {
                Some(year) => format!("{:02}.{:02}.{year}", birthday.day, birthday.month),
                None => format!("{:02}.{:02}", birthday.day, birthday.month),
            };
            vec![button(
                format!("🗑️ {} — {}", note_snippet(&birthday.person_name, 25), date),
                Callback::BirthdayDelete {
                    id: birthday.id,
                    page,
                },
            )]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 1 {
        nav.push(button("⬅️", Callback::BirthdaysPage { page: page - 1 }));
    }
    if page < total_pages {
        nav.push(button("➡️", Callback::BirthdaysPage { page: page + 1 }));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    let mut menu_row = vec![button("➕ Добавить", Callback::BirthdayAdd)];
    if is_vip {
        menu_row.push(button("📥 Импорт из файла", Callback::BirthdayImport));
    }
    rows.push(menu_row);
    rows.push(vec![button("🏠 Главное меню", Callback::MainMenu)]);

    InlineKeyboardMarkup::new(rows)
}

/// Detail card for one note.
pub fn format_note_view(note: &Note, timezone: &str, is_vip: bool) -> String {
    let status_text = if note.is_completed {
        "Выполнена"
    } else if note.is_archived {
        "В архиве"
    } else {
        "Активна"
    };

    let mut text = format!(
        "{} {}\n\n",
        note_icon(note),
        html::bold(&format!("Заметка #{}", note.note_id))
    );
    if let Some(rule) = note.recurrence_rule.as_deref() {
        if is_vip {
            text.push_str(&format!(
                "🔁 Повторение: {}\n",
                html::italic(&recurrence::humanize(rule))
            ));
        }
    }
    text.push_str(&format!("Статус: {}\n", html::italic(status_text)));
    text.push_str(&format!(
        "🗂️ Категория: {}\n",
        html::italic(&html::escape(&note.category))
    ));
    // Mention the update timestamp only when the note was actually touched
    if note.updated_at.timestamp() / 60 != note.created_at.timestamp() / 60 {
        text.push_str(&format!(
            "Обновлена: {}\n",
            html::italic(&tz::format_datetime_for_user(note.updated_at, timezone))
        ));
    }
    if let Some(due) = note.due_date {
        text.push_str(&format!(
            "Срок до: {}\n",
            html::italic(&tz::format_datetime_for_user(due, timezone))
        ));
    }
    text.push_str(&format!(
        "\n{}\n{}",
        html::bold("Текст заметки:"),
        html::code_inline(&html::escape(&note.corrected_text))
    ));
    text
}

/// Profile card.
pub fn format_profile(profile: &UserProfile, active_notes: i64, max_notes: i64) -> String {
    let mut parts = vec![html::bold("👤 Ваш профиль:")];
    parts.push(format!(
        "Telegram ID: {}",
        html::code_inline(&profile.telegram_id.to_string())
    ));
    if let Some(username) = profile.username.as_deref() {
        parts.push(format!("Username: @{}", html::italic(&html::escape(username))));
    }
    if let Some(first_name) = profile.first_name.as_deref() {
        parts.push(format!("Имя: {}", html::italic(&html::escape(first_name))));
    }
    parts.push(format!(
        "Зарегистрирован: {}",
        profile.created_at.format("%d.%m.%Y %H:%M UTC")
    ));
    parts.push(format!(
        "Часовой пояс: {}",
        html::code_inline(&profile.timezone)
    ));
    if profile.is_vip {
        parts.push("Статус: ⭐ VIP".to_string());
        parts.push(format!("Активных заметок: {}", html::bold(&active_notes.to_string())));
    } else {
        parts.push("Статус: Бесплатный".to_string());
        parts.push(format!(
            "Активных заметок: {} из {}",
            html::bold(&active_notes.to_string()),
            max_notes
        ));
    }
    parts.join("\n")
}

/// Settings overview.
pub fn format_settings(profile: &UserProfile) -> String {
    format!(
        "{}\n\nЗдесь вы можете персонализировать работу бота.\n\n▪️ Текущий часовой пояс: {}\n▪️ Время напоминаний по умолчанию: {}",
        html::bold("⚙️ Ваши настройки"),
        html::code_inline(&profile.timezone),
        html::code_inline(&profile.default_reminder_time.format("%H:%M").to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_note() -> Note {
        Note {
            note_id: 7,
            telegram_id: 1,
            original_stt_text: None,
            corrected_text: "Купить молоко и хлеб по дороге домой".into(),
            category: "Общее".into(),
            tags: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            note_taken_at: None,
            original_audio_telegram_file_id: None,
            llm_analysis_json: None,
            due_date: None,
            recurrence_rule: None,
            is_archived: false,
            is_completed: false,
            is_pinned: false,
        }
    }

    #[test]
    fn snippet_respects_cyrillic_boundaries() {
        let text = "Очень длинная заметка про покупки и планы на выходные";
        let snippet = note_snippet(text, 20);
        assert!(snippet.chars().count() <= 20);
        assert!(snippet.ends_with('…'));
        // Short text passes through untouched
        assert_eq!(note_snippet("Привет", 20), "Привет");
    }

    #[test]
    fn active_note_gets_complete_and_archive_buttons() {
        let keyboard = note_view_keyboard(&sample_note(), 1, false, false);
        let labels: Vec<&str> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        assert!(labels.contains(&"✅ Выполнено"));
        assert!(labels.contains(&"🗄️ В архив"));
        assert!(!labels.iter().any(|l| l.contains("Прослушать")));
    }

    #[test]
    fn archived_note_offers_restore() {
        let mut note = sample_note();
        note.is_archived = true;
        let keyboard = note_view_keyboard(&note, 1, true, false);
        let labels: Vec<&str> = keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        assert!(labels.contains(&"↩️ Вернуть из архива"));
        assert!(!labels.contains(&"✅ Выполнено"));
    }

    #[test]
    fn recurrence_toggle_is_vip_only() {
        let mut note = sample_note();
        note.recurrence_rule = Some("FREQ=DAILY".into());
        let free = note_view_keyboard(&note, 1, false, false);
        let vip = note_view_keyboard(&note, 1, false, true);
        let has_toggle = |kb: &InlineKeyboardMarkup| {
            kb.inline_keyboard
                .iter()
                .flatten()
                .any(|b| b.text.contains("повторение"))
        };
        assert!(!has_toggle(&free));
        assert!(has_toggle(&vip));
    }

    #[test]
    fn reminder_snooze_is_vip_only() {
        assert_eq!(reminder_keyboard(1, false).inline_keyboard.len(), 1);
        assert_eq!(reminder_keyboard(1, true).inline_keyboard.len(), 2);
    }

    #[test]
    fn pagination_arrows_match_position() {
        let notes = vec![sample_note()];
        let first = notes_list_keyboard(&notes, 1, 3, false);
        let arrows: Vec<&str> = first.inline_keyboard[1].iter().map(|b| b.text.as_str()).collect();
        assert_eq!(arrows, vec!["➡️"]);

        let middle = notes_list_keyboard(&notes, 2, 3, false);
        let arrows: Vec<&str> = middle.inline_keyboard[1].iter().map(|b| b.text.as_str()).collect();
        assert_eq!(arrows, vec!["⬅️", "➡️"]);
    }

    #[test]
    fn note_view_escapes_user_text() {
        let mut note = sample_note();
        note.corrected_text = "a <b> & c".into();
        let text = format_note_view(&note, "UTC", false);
        assert!(text.contains("a &lt;b&gt; &amp; c"));
    }
}
