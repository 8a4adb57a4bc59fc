//! # Reminder Scheduler Module
//!
//! One tokio task per pending reminder, keyed by note id. Jobs live only
//! in memory and are rebuilt from the database on startup, so a restart
//! never loses a reminder. A separate ticker delivers yearly birthday
//! reminders at the user's local morning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike, Utc};
use sqlx::postgres::PgPool;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bot::ui_builder;
use crate::db::{self, Note, UserProfile};
use crate::recurrence;
use crate::tz;

/// Local hour at which birthday reminders go out.
const BIRTHDAY_REMINDER_HOUR: u32 = 9;

/// When the model produced a date without a time it lands on midnight UTC;
/// shift such reminders to the user's preferred time in their timezone.
pub fn resolve_due_date(
    due: DateTime<Utc>,
    timezone: &str,
    default_time: NaiveTime,
) -> DateTime<Utc> {
    if due.time() != NaiveTime::MIN {
        return due;
    }
    let tz = tz::user_tz(timezone);
    let local = due.date_naive().and_time(default_time);
    match tz.from_local_datetime(&local).earliest() {
        Some(local_due) => local_due.with_timezone(&Utc),
        None => due,
    }
}

/// In-memory reminder jobs, one task per note.
#[derive(Clone, Default)]
pub struct ReminderScheduler {
    jobs: Arc<Mutex<HashMap<i32, JoinHandle<()>>>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or reschedule) the reminder for a note. Past due dates
    /// and notes without one are ignored.
    pub fn schedule(&self, bot: Bot, pool: PgPool, note: &Note, profile: &UserProfile) {
        let Some(due) = note.due_date else {
            return;
        };
        let final_due = resolve_due_date(due, &profile.timezone, profile.default_reminder_time);
        if final_due != due {
            info!(
                note_id = note.note_id,
                due = %final_due,
                timezone = %profile.timezone,
                "date-only reminder shifted to the user's default time"
            );
        }

        let now = Utc::now();
        if final_due <= now {
            info!(note_id = note.note_id, "reminder not scheduled, due date in the past");
            return;
        }
        let Ok(wait) = (final_due - now).to_std() else {
            return;
        };

        let note_id = note.note_id;
        let telegram_id = note.telegram_id;
        let jobs_ref = Arc::clone(&self.jobs);

        let mut jobs = self.jobs.lock().unwrap();
        if let Some(previous) = jobs.remove(&note_id) {
            previous.abort();
            info!(note_id, due = %final_due, "reminder rescheduled");
        } else {
            info!(note_id, due = %final_due, "reminder scheduled");
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            send_due_reminder(&bot, &pool, telegram_id, note_id).await;
            jobs_ref.lock().unwrap().remove(&note_id);
        });
        jobs.insert(note_id, handle);
    }

    /// Drop the pending reminder for a note, if any.
    pub fn cancel(&self, note_id: i32) {
        if let Some(handle) = self.jobs.lock().unwrap().remove(&note_id) {
            handle.abort();
            info!(note_id, "reminder cancelled");
        }
    }

    /// Number of reminders currently waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Rebuild every future reminder from the database after a restart.
    pub async fn load_pending(&self, bot: &Bot, pool: &PgPool) -> Result<usize> {
        info!("loading upcoming reminders from the database");
        let notes = db::notes_with_pending_reminders(pool).await?;
        let mut count = 0usize;
        for note in &notes {
            match db::get_user_profile(pool, note.telegram_id).await? {
                Some(profile) => {
                    self.schedule(bot.clone(), pool.clone(), note, &profile);
                    count += 1;
                }
                None => warn!(
                    note_id = note.note_id,
                    telegram_id = note.telegram_id,
                    "note without a user profile, reminder skipped"
                ),
            }
        }
        info!(count, "reminders loaded");
        Ok(count)
    }

    /// Advance a recurring note to its next occurrence and reschedule.
    /// Returns the new due date when the rule produced one.
    pub async fn advance_recurring_note(
        &self,
        bot: &Bot,
        pool: &PgPool,
        note: &Note,
        profile: &UserProfile,
    ) -> Option<DateTime<Utc>> {
        let rule = recurrence::parse(note.recurrence_rule.as_deref()?)?;
        let due = note.due_date?;
        let next = rule.next_after(due, Utc::now())?;
        match db::update_note_due_date(pool, note.note_id, note.telegram_id, next).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                error!(note_id = note.note_id, error = %e, "failed to advance recurring note");
                return None;
            }
        }
        let mut advanced = note.clone();
        advanced.due_date = Some(next);
        self.schedule(bot.clone(), pool.clone(), &advanced, profile);
        Some(next)
    }
}

/// Deliver one reminder. The note's state is re-checked right before
/// sending: completed, archived or deleted notes stay silent.
async fn send_due_reminder(bot: &Bot, pool: &PgPool, telegram_id: i64, note_id: i32) {
    info!(note_id, telegram_id, "sending reminder");
    let note = match db::get_note(pool, note_id, telegram_id).await {
        Ok(Some(note)) => note,
        Ok(None) => {
            info!(note_id, "reminder dropped, note was deleted");
            return;
        }
        Err(e) => {
            error!(note_id, error = %e, "failed to load note for reminder");
            return;
        }
    };
    if note.is_completed || note.is_archived {
        info!(note_id, "reminder dropped, note completed or archived");
        return;
    }

    let profile = match db::get_user_profile(pool, telegram_id).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(telegram_id, error = %e, "failed to load profile for reminder");
            None
        }
    };
    let timezone = profile
        .as_ref()
        .map(|p| p.timezone.clone())
        .unwrap_or_else(|| "UTC".to_string());
    let is_vip = profile.map(|p| p.is_vip).unwrap_or(false);

    let due_local = note
        .due_date
        .map(|due| tz::format_datetime_for_user(due, &timezone))
        .unwrap_or_default();
    let text = format!(
        "🔔 {}\n\nЗаметка: #{}\nСрок: {}\n\n📝 {}\n{}",
        html::bold("Напоминание"),
        html::code_inline(&note.note_id.to_string()),
        html::italic(&due_local),
        html::bold("Текст заметки:"),
        html::code_inline(&html::escape(&note.corrected_text)),
    );
    let keyboard = ui_builder::reminder_keyboard(note_id, is_vip);

    if let Err(e) = bot
        .send_message(ChatId(telegram_id), text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await
    {
        error!(note_id, telegram_id, error = %e, "failed to send reminder");
    }
}

/// Background sweep for birthday reminders: every user with saved
/// birthdays gets a message on the matching day, once, at their local
/// morning.
pub fn spawn_birthday_ticker(bot: Bot, pool: PgPool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut delivered: HashMap<i64, chrono::NaiveDate> = HashMap::new();
        let mut ticker = tokio::time::interval(Duration::from_secs(15 * 60));
        loop {
            ticker.tick().await;
            let users = match db::users_with_birthdays(&pool).await {
                Ok(users) => users,
                Err(e) => {
                    warn!(error = %e, "birthday sweep: failed to list users");
                    continue;
                }
            };
            for user in users {
                let local_now = tz::local_now(&user.timezone);
                if local_now.hour() < BIRTHDAY_REMINDER_HOUR {
                    continue;
                }
                let today = local_now.date_naive();
                if delivered.get(&user.telegram_id) == Some(&today) {
                    continue;
                }
                delivered.insert(user.telegram_id, today);

                let birthdays = match db::birthdays_on(
                    &pool,
                    user.telegram_id,
                    today.day() as i32,
                    today.month() as i32,
                )
                .await
                {
                    Ok(birthdays) => birthdays,
                    Err(e) => {
                        warn!(telegram_id = user.telegram_id, error = %e, "birthday lookup failed");
                        continue;
                    }
                };

                for birthday in birthdays {
                    let name = html::bold(&html::escape(&birthday.person_name));
                    let text = match birthday.year {
                        Some(year) if local_now.year() > year => format!(
                            "🎂 Сегодня день рождения у {name} — исполняется {}!",
                            local_now.year() - year
                        ),
                        _ => format!("🎂 Сегодня день рождения у {name}!"),
                    };
                    if let Err(e) = bot
                        .send_message(ChatId(user.telegram_id), text)
                        .parse_mode(ParseMode::Html)
                        .await
                    {
                        warn!(telegram_id = user.telegram_id, error = %e, "failed to send birthday reminder");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn midnight_due_shifts_to_default_time_in_user_tz() {
        let due = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let resolved = resolve_due_date(due, "Europe/Moscow", nine());
        // 09:00 Moscow == 06:00 UTC
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 6, 10, 6, 0, 0).unwrap());
    }

    #[test]
    fn explicit_time_is_untouched() {
        let due = Utc.with_ymd_and_hms(2024, 6, 10, 14, 30, 0).unwrap();
        assert_eq!(resolve_due_date(due, "Europe/Moscow", nine()), due);
    }

    #[test]
    fn unknown_timezone_shifts_in_utc() {
        let due = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let resolved = resolve_due_date(due, "Nowhere/Invalid", nine());
        assert_eq!(resolved, Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap());
    }
}
