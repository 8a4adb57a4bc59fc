//! # Database Module
//!
//! PostgreSQL storage for users, notes, birthdays and the action log.
//! The schema is bootstrapped on startup with idempotent statements; all
//! instants are stored as `TIMESTAMPTZ` in UTC.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;

/// A registered bot user and their settings.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub timezone: String,
    pub default_reminder_time: NaiveTime,
    pub is_vip: bool,
    pub stt_count_today: i32,
    pub stt_count_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A saved note.
#[derive(Debug, Clone, FromRow)]
pub struct Note {
    pub note_id: i32,
    pub telegram_id: i64,
    pub original_stt_text: Option<String>,
    pub corrected_text: String,
    pub category: String,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub note_taken_at: Option<DateTime<Utc>>,
    pub original_audio_telegram_file_id: Option<String>,
    pub llm_analysis_json: Option<serde_json::Value>,
    pub due_date: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
    pub is_archived: bool,
    pub is_completed: bool,
    pub is_pinned: bool,
}

/// A birthday the user wants yearly reminders for.
#[derive(Debug, Clone, FromRow)]
pub struct Birthday {
    pub id: i32,
    pub telegram_id: i64,
    pub person_name: String,
    pub day: i32,
    pub month: i32,
    pub year: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Column values for inserting a note.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub telegram_id: i64,
    pub corrected_text: String,
    pub original_stt_text: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub note_taken_at: Option<DateTime<Utc>>,
    pub original_audio_telegram_file_id: Option<String>,
    pub llm_analysis_json: Option<serde_json::Value>,
    pub due_date: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
}

const CREATE_TABLE_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        telegram_id BIGINT PRIMARY KEY,
        username TEXT,
        first_name TEXT,
        last_name TEXT,
        language_code TEXT,
        timezone TEXT NOT NULL DEFAULT 'UTC',
        default_reminder_time TIME NOT NULL DEFAULT '09:00',
        is_vip BOOLEAN NOT NULL DEFAULT FALSE,
        stt_count_today INTEGER NOT NULL DEFAULT 0,
        stt_count_date DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        note_id SERIAL PRIMARY KEY,
        telegram_id BIGINT NOT NULL REFERENCES users(telegram_id) ON DELETE CASCADE,
        original_stt_text TEXT,
        corrected_text TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT 'Общее',
        tags TEXT[],
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        note_taken_at TIMESTAMPTZ,
        original_audio_telegram_file_id TEXT,
        llm_analysis_json JSONB,
        due_date TIMESTAMPTZ,
        recurrence_rule TEXT,
        is_archived BOOLEAN NOT NULL DEFAULT FALSE,
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        is_pinned BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notes_telegram_id ON notes (telegram_id)",
    "CREATE INDEX IF NOT EXISTS idx_notes_due_date ON notes (due_date)",
    r#"
    CREATE TABLE IF NOT EXISTS birthdays (
        id SERIAL PRIMARY KEY,
        telegram_id BIGINT NOT NULL REFERENCES users(telegram_id) ON DELETE CASCADE,
        person_name TEXT NOT NULL,
        day INTEGER NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_birthdays_telegram_id ON birthdays (telegram_id)",
    r#"
    CREATE TABLE IF NOT EXISTS user_actions (
        action_id SERIAL PRIMARY KEY,
        telegram_id BIGINT NOT NULL,
        action TEXT NOT NULL,
        metadata JSONB,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Open the connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Create tables and indexes if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    info!("initializing database schema");
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    for statement in CREATE_TABLE_STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to execute schema statement: {statement}"))?;
    }
    tx.commit().await.context("failed to commit schema")?;
    info!("database schema initialized");
    Ok(())
}

// --- User operations ---

/// Insert the user or refresh their Telegram identity fields.
pub async fn upsert_user(
    pool: &PgPool,
    telegram_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    language_code: Option<&str>,
) -> Result<UserProfile> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        INSERT INTO users (telegram_id, username, first_name, last_name, language_code)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (telegram_id) DO UPDATE SET
            username = EXCLUDED.username,
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            language_code = EXCLUDED.language_code,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(telegram_id)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(language_code)
    .fetch_one(pool)
    .await
    .context("failed to upsert user")
}

pub async fn get_user_profile(pool: &PgPool, telegram_id: i64) -> Result<Option<UserProfile>> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user profile")
}

pub async fn set_user_timezone(pool: &PgPool, telegram_id: i64, timezone: &str) -> Result<bool> {
    let result =
        sqlx::query("UPDATE users SET timezone = $1, updated_at = NOW() WHERE telegram_id = $2")
            .bind(timezone)
            .bind(telegram_id)
            .execute(pool)
            .await
            .context("failed to set timezone")?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_default_reminder_time(
    pool: &PgPool,
    telegram_id: i64,
    time: NaiveTime,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET default_reminder_time = $1, updated_at = NOW() WHERE telegram_id = $2",
    )
    .bind(time)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to set default reminder time")?;
    Ok(result.rows_affected() == 1)
}

/// Today's recognition count, lazily reset when the stored date is stale.
pub async fn stt_recognitions_today(pool: &PgPool, telegram_id: i64) -> Result<i32> {
    let count = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE users
        SET stt_count_today = CASE
                WHEN stt_count_date IS NOT DISTINCT FROM CURRENT_DATE THEN stt_count_today
                ELSE 0
            END,
            stt_count_date = CURRENT_DATE
        WHERE telegram_id = $1
        RETURNING stt_count_today
        "#,
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("failed to read recognition counter")?;
    Ok(count.unwrap_or(0))
}

pub async fn increment_stt_count(pool: &PgPool, telegram_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET stt_count_today = stt_count_today + 1, stt_count_date = CURRENT_DATE
        WHERE telegram_id = $1
        "#,
    )
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to increment recognition counter")?;
    Ok(())
}

// --- Note operations ---

/// Insert a note and return its id.
pub async fn create_note(pool: &PgPool, note: NewNote) -> Result<i32> {
    let note_id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO notes (
            telegram_id, original_stt_text, corrected_text, category, tags,
            note_taken_at, original_audio_telegram_file_id, llm_analysis_json,
            due_date, recurrence_rule
        )
        VALUES ($1, $2, $3, COALESCE($4, 'Общее'), $5, $6, $7, $8, $9, $10)
        RETURNING note_id
        "#,
    )
    .bind(note.telegram_id)
    .bind(note.original_stt_text)
    .bind(note.corrected_text)
    .bind(note.category)
    .bind(note.tags)
    .bind(note.note_taken_at)
    .bind(note.original_audio_telegram_file_id)
    .bind(note.llm_analysis_json)
    .bind(note.due_date)
    .bind(note.recurrence_rule)
    .fetch_one(pool)
    .await
    .context("failed to insert note")?;
    info!(note_id, "note created");
    Ok(note_id)
}

/// Fetch a note only when it belongs to the given user.
pub async fn get_note(pool: &PgPool, note_id: i32, telegram_id: i64) -> Result<Option<Note>> {
    sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE note_id = $1 AND telegram_id = $2")
        .bind(note_id)
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch note")
}

/// One page of notes (pinned first, newest first) plus the total count for
/// the active or archived view.
pub async fn paginated_notes(
    pool: &PgPool,
    telegram_id: i64,
    page: i64,
    per_page: i64,
    archived: bool,
) -> Result<(Vec<Note>, i64)> {
    let page = page.max(1);
    let notes = sqlx::query_as::<_, Note>(
        r#"
        SELECT * FROM notes
        WHERE telegram_id = $1 AND is_archived = $2
        ORDER BY is_pinned DESC, created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(telegram_id)
    .bind(archived)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(pool)
    .await
    .context("failed to fetch notes page")?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notes WHERE telegram_id = $1 AND is_archived = $2",
    )
    .bind(telegram_id)
    .bind(archived)
    .fetch_one(pool)
    .await
    .context("failed to count notes")?;

    Ok((notes, total))
}

pub async fn update_note_text(
    pool: &PgPool,
    note_id: i32,
    telegram_id: i64,
    corrected_text: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notes SET corrected_text = $1, updated_at = NOW()
        WHERE note_id = $2 AND telegram_id = $3
        "#,
    )
    .bind(corrected_text)
    .bind(note_id)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to update note text")?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_note_archived(
    pool: &PgPool,
    note_id: i32,
    telegram_id: i64,
    archived: bool,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notes SET is_archived = $1, updated_at = NOW()
        WHERE note_id = $2 AND telegram_id = $3
        "#,
    )
    .bind(archived)
    .bind(note_id)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to update archive status")?;
    Ok(result.rows_affected() == 1)
}

/// Completion also archives: done tasks leave the active list.
pub async fn set_note_completed(pool: &PgPool, note_id: i32, telegram_id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notes SET is_completed = TRUE, is_archived = TRUE, updated_at = NOW()
        WHERE note_id = $1 AND telegram_id = $2
        "#,
    )
    .bind(note_id)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to complete note")?;
    Ok(result.rows_affected() == 1)
}

pub async fn update_note_due_date(
    pool: &PgPool,
    note_id: i32,
    telegram_id: i64,
    due_date: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notes SET due_date = $1, updated_at = NOW()
        WHERE note_id = $2 AND telegram_id = $3
        "#,
    )
    .bind(due_date)
    .bind(note_id)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to update due date")?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_note_recurrence_rule(
    pool: &PgPool,
    note_id: i32,
    telegram_id: i64,
    rule: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notes SET recurrence_rule = $1, updated_at = NOW()
        WHERE note_id = $2 AND telegram_id = $3
        "#,
    )
    .bind(rule)
    .bind(note_id)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("failed to update recurrence rule")?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_note(pool: &PgPool, note_id: i32, telegram_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM notes WHERE note_id = $1 AND telegram_id = $2")
        .bind(note_id)
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("failed to delete note")?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_active_notes(pool: &PgPool, telegram_id: i64) -> Result<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notes WHERE telegram_id = $1 AND NOT is_archived",
    )
    .bind(telegram_id)
    .fetch_one(pool)
    .await
    .context("failed to count active notes")
}

/// Notes whose reminders must be rebuilt after a restart.
pub async fn notes_with_pending_reminders(pool: &PgPool) -> Result<Vec<Note>> {
    sqlx::query_as::<_, Note>(
        r#"
        SELECT * FROM notes
        WHERE due_date IS NOT NULL AND due_date > NOW()
          AND NOT is_archived AND NOT is_completed
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch pending reminders")
}

// --- Birthday operations ---

pub async fn add_birthday(
    pool: &PgPool,
    telegram_id: i64,
    person_name: &str,
    day: i32,
    month: i32,
    year: Option<i32>,
) -> Result<Birthday> {
    sqlx::query_as::<_, Birthday>(
        r#"
        INSERT INTO birthdays (telegram_id, person_name, day, month, year)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(telegram_id)
    .bind(person_name)
    .bind(day)
    .bind(month)
    .bind(year)
    .fetch_one(pool)
    .await
    .context("failed to add birthday")
}

/// Bulk insert from a file import; returns the number of rows added.
pub async fn add_birthdays_bulk(
    pool: &PgPool,
    telegram_id: i64,
    entries: &[(String, i32, i32, Option<i32>)],
) -> Result<u64> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let mut added = 0u64;
    for (name, day, month, year) in entries {
        let result = sqlx::query(
            "INSERT INTO birthdays (telegram_id, person_name, day, month, year) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(telegram_id)
        .bind(name)
        .bind(day)
        .bind(month)
        .bind(year)
        .execute(&mut *tx)
        .await
        .context("failed to insert birthday")?;
        added += result.rows_affected();
    }
    tx.commit().await.context("failed to commit import")?;
    Ok(added)
}

pub async fn birthdays_page(
    pool: &PgPool,
    telegram_id: i64,
    page: i64,
    per_page: i64,
) -> Result<(Vec<Birthday>, i64)> {
    let page = page.max(1);
    let birthdays = sqlx::query_as::<_, Birthday>(
        r#"
        SELECT * FROM birthdays
        WHERE telegram_id = $1
        ORDER BY month, day, person_name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(telegram_id)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(pool)
    .await
    .context("failed to fetch birthdays page")?;

    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM birthdays WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_one(pool)
            .await
            .context("failed to count birthdays")?;

    Ok((birthdays, total))
}

pub async fn delete_birthday(pool: &PgPool, id: i32, telegram_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM birthdays WHERE id = $1 AND telegram_id = $2")
        .bind(id)
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("failed to delete birthday")?;
    Ok(result.rows_affected() > 0)
}

pub async fn birthdays_on(
    pool: &PgPool,
    telegram_id: i64,
    day: i32,
    month: i32,
) -> Result<Vec<Birthday>> {
    sqlx::query_as::<_, Birthday>(
        "SELECT * FROM birthdays WHERE telegram_id = $1 AND day = $2 AND month = $3",
    )
    .bind(telegram_id)
    .bind(day)
    .bind(month)
    .fetch_all(pool)
    .await
    .context("failed to fetch birthdays for date")
}

/// Users that keep at least one birthday entry (for the daily sweep).
pub async fn users_with_birthdays(pool: &PgPool) -> Result<Vec<UserProfile>> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT u.* FROM users u
        WHERE EXISTS (SELECT 1 FROM birthdays b WHERE b.telegram_id = u.telegram_id)
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch users with birthdays")
}

// --- Audit log ---

pub async fn log_user_action(
    pool: &PgPool,
    telegram_id: i64,
    action: &str,
    metadata: Option<serde_json::Value>,
) -> Result<()> {
    sqlx::query("INSERT INTO user_actions (telegram_id, action, metadata) VALUES ($1, $2, $3)")
        .bind(telegram_id)
        .bind(action)
        .bind(metadata)
        .execute(pool)
        .await
        .context("failed to log user action")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Tests run against a live database only when DATABASE_URL is set;
    /// otherwise they are skipped so the suite stays green everywhere.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = connect(&url).await.ok()?;
        init_schema(&pool).await.ok()?;
        Some(pool)
    }

    fn unique_id() -> i64 {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
        9_000_000_000 + now.as_nanos() as i64 % 1_000_000_000
    }

    #[tokio::test]
    async fn upsert_creates_and_refreshes_a_user() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let id = unique_id();

        let created = upsert_user(&pool, id, Some("tester"), Some("Test"), None, Some("ru"))
            .await
            .unwrap();
        assert_eq!(created.telegram_id, id);
        assert_eq!(created.timezone, "UTC");
        assert!(!created.is_vip);

        let updated = upsert_user(&pool, id, Some("renamed"), Some("Test"), None, Some("ru"))
            .await
            .unwrap();
        assert_eq!(updated.username.as_deref(), Some("renamed"));

        let fetched = get_user_profile(&pool, id).await.unwrap().unwrap();
        assert_eq!(fetched.username.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn note_lifecycle_roundtrip() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let id = unique_id();
        upsert_user(&pool, id, None, Some("Test"), None, None)
            .await
            .unwrap();

        let note_id = create_note(
            &pool,
            NewNote {
                telegram_id: id,
                corrected_text: "Позвонить маме завтра".into(),
                original_stt_text: Some("пазванить маме завтра".into()),
                llm_analysis_json: Some(
                    serde_json::json!({"corrected_text": "Позвонить маме завтра"}),
                ),
                due_date: Some(Utc::now() + chrono::Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let note = get_note(&pool, note_id, id).await.unwrap().unwrap();
        assert_eq!(note.corrected_text, "Позвонить маме завтра");
        assert_eq!(note.category, "Общее");
        assert!(!note.is_archived);

        // Ownership is enforced
        assert!(get_note(&pool, note_id, id + 1).await.unwrap().is_none());

        assert!(
            update_note_text(&pool, note_id, id, "Позвонить маме в субботу")
                .await
                .unwrap()
        );
        assert!(set_note_completed(&pool, note_id, id).await.unwrap());
        let done = get_note(&pool, note_id, id).await.unwrap().unwrap();
        assert!(done.is_completed && done.is_archived);

        assert!(delete_note(&pool, note_id, id).await.unwrap());
        assert!(!delete_note(&pool, note_id, id).await.unwrap());
    }

    #[tokio::test]
    async fn pagination_counts_and_orders() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let id = unique_id();
        upsert_user(&pool, id, None, Some("Test"), None, None)
            .await
            .unwrap();

        for i in 0..4 {
            create_note(
                &pool,
                NewNote {
                    telegram_id: id,
                    corrected_text: format!("заметка {i}"),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let (page1, total) = paginated_notes(&pool, id, 1, 3, false).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(page1.len(), 3);
        let (page2, _) = paginated_notes(&pool, id, 2, 3, false).await.unwrap();
        assert_eq!(page2.len(), 1);

        assert_eq!(count_active_notes(&pool, id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn stt_counter_resets_daily_and_increments() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let id = unique_id();
        upsert_user(&pool, id, None, Some("Test"), None, None)
            .await
            .unwrap();

        assert_eq!(stt_recognitions_today(&pool, id).await.unwrap(), 0);
        increment_stt_count(&pool, id).await.unwrap();
        increment_stt_count(&pool, id).await.unwrap();
        assert_eq!(stt_recognitions_today(&pool, id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn birthdays_crud_and_lookup() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let id = unique_id();
        upsert_user(&pool, id, None, Some("Test"), None, None)
            .await
            .unwrap();

        let bday = add_birthday(&pool, id, "Мама", 28, 5, Some(1976))
            .await
            .unwrap();
        assert_eq!(bday.person_name, "Мама");

        let added = add_birthdays_bulk(
            &pool,
            id,
            &[
                ("Иван Петров".to_string(), 13, 6, Some(1977)),
                ("Годовщина".to_string(), 5, 9, None),
            ],
        )
        .await
        .unwrap();
        assert_eq!(added, 2);

        let (page, total) = birthdays_page(&pool, id, 1, 10).await.unwrap();
        assert_eq!(total, 3);
        // Ordered by month then day
        assert_eq!(page[0].person_name, "Мама");

        let on_day = birthdays_on(&pool, id, 13, 6).await.unwrap();
        assert_eq!(on_day.len(), 1);

        assert!(delete_birthday(&pool, bday.id, id).await.unwrap());
        assert!(!delete_birthday(&pool, bday.id, id).await.unwrap());
    }
}
