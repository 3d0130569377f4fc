//! SQLite-backed record stores for conversation turns and mood entries.
//!
//! Both tables are append-only: the engine inserts and reads, never
//! updates or deletes. Recency queries run against the `created_at`
//! millisecond timestamp through descending indexes, so readers observe
//! turns in completion order regardless of submission order.

use crate::ai::sentiment::{Sentiment, SentimentLabel};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Authenticated-user reference handed in by the identity collaborator.
/// The engine trusts it as-is; ownership checks happen upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted user-message/AI-reply exchange. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub sentiment: Sentiment,
    pub audio_transcript: Option<String>,
    /// Unix milliseconds, UTC.
    pub created_at: i64,
}

/// Insert payload for a turn; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub user_id: UserId,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub sentiment: Sentiment,
    pub audio_transcript: Option<String>,
}

/// A self-reported emotional state sample, independent of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: i64,
    pub user_id: String,
    pub mood: String,
    /// Domain convention 1–10; stored verbatim, never clamped.
    pub intensity: f64,
    pub notes: Option<String>,
    pub triggers: Option<Vec<String>>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewMoodEntry {
    pub mood: String,
    pub intensity: f64,
    pub notes: Option<String>,
    pub triggers: Option<Vec<String>>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Open (creating if missing) the engine database and ensure the schema.
pub async fn connect(db_url: &str) -> Result<SqlitePool, EngineError> {
    let options = SqliteConnectOptions::from_str(db_url)
        .map_err(EngineError::Storage)?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Ensure tables and indexes exist. Idempotent; also used by tests
/// against `sqlite::memory:`.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), EngineError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            message TEXT NOT NULL,
            response TEXT NOT NULL,
            sentiment_score REAL NOT NULL,
            sentiment_label TEXT NOT NULL,
            sentiment_confidence REAL NOT NULL,
            audio_transcript TEXT,
            created_at INTEGER NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS turns_by_session ON turns (session_id, created_at);",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS turns_by_user ON turns (user_id, created_at);")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS mood_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            mood TEXT NOT NULL,
            intensity REAL NOT NULL,
            notes TEXT,
            triggers TEXT,
            created_at INTEGER NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS mood_entries_by_user ON mood_entries (user_id, created_at);",
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── Turn Store ─────────────────────────────────────────────

#[derive(Clone)]
pub struct TurnStore {
    pool: SqlitePool,
}

impl TurnStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a turn. The single durable side effect of the reply
    /// pipeline; rows are never touched again after this.
    pub async fn insert(&self, turn: NewTurn) -> Result<Turn, EngineError> {
        let created_at = now_millis();
        let result = sqlx::query(
            "INSERT INTO turns (user_id, session_id, message, response, sentiment_score, \
             sentiment_label, sentiment_confidence, audio_transcript, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(turn.user_id.as_str())
        .bind(&turn.session_id)
        .bind(&turn.message)
        .bind(&turn.response)
        .bind(turn.sentiment.score)
        .bind(turn.sentiment.label.as_str())
        .bind(turn.sentiment.confidence)
        .bind(&turn.audio_transcript)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Turn {
            id: result.last_insert_rowid(),
            user_id: turn.user_id.0,
            session_id: turn.session_id,
            message: turn.message,
            response: turn.response,
            sentiment: turn.sentiment,
            audio_transcript: turn.audio_transcript,
            created_at,
        })
    }

    /// Most recent turns for a session, newest first, bounded.
    pub async fn recent_for_session(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<Turn>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, user_id, session_id, message, response, sentiment_score, \
             sentiment_label, sentiment_confidence, audio_transcript, created_at \
             FROM turns WHERE session_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(turn_from_row).collect())
    }

    /// Most recent turns across all of a user's sessions, newest first.
    pub async fn recent_for_user(&self, user: &UserId, limit: i64) -> Result<Vec<Turn>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, user_id, session_id, message, response, sentiment_score, \
             sentiment_label, sentiment_confidence, audio_transcript, created_at \
             FROM turns WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(turn_from_row).collect())
    }

    /// Fetch a single turn by id.
    pub async fn get(&self, id: i64) -> Result<Option<Turn>, EngineError> {
        let row = sqlx::query(
            "SELECT id, user_id, session_id, message, response, sentiment_score, \
             sentiment_label, sentiment_confidence, audio_transcript, created_at \
             FROM turns WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(turn_from_row))
    }
}

fn turn_from_row(row: &sqlx::sqlite::SqliteRow) -> Turn {
    let label: String = row.get("sentiment_label");
    Turn {
        id: row.get("id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        message: row.get("message"),
        response: row.get("response"),
        sentiment: Sentiment {
            score: row.get("sentiment_score"),
            label: SentimentLabel::parse(&label),
            confidence: row.get("sentiment_confidence"),
        },
        audio_transcript: row.get("audio_transcript"),
        created_at: row.get("created_at"),
    }
}

// ── Mood Store ─────────────────────────────────────────────

#[derive(Clone)]
pub struct MoodStore {
    pool: SqlitePool,
}

impl MoodStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a mood entry. Values are stored verbatim — an intensity
    /// outside the documented 1–10 scale is the caller's to own.
    pub async fn insert(
        &self,
        user: &UserId,
        entry: NewMoodEntry,
    ) -> Result<MoodEntry, EngineError> {
        let created_at = now_millis();
        let triggers_json = match &entry.triggers {
            Some(triggers) => Some(
                serde_json::to_string(triggers)
                    .map_err(|e| EngineError::Config(format!("trigger encoding: {}", e)))?,
            ),
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO mood_entries (user_id, mood, intensity, notes, triggers, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.as_str())
        .bind(&entry.mood)
        .bind(entry.intensity)
        .bind(&entry.notes)
        .bind(&triggers_json)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(MoodEntry {
            id: result.last_insert_rowid(),
            user_id: user.0.clone(),
            mood: entry.mood,
            intensity: entry.intensity,
            notes: entry.notes,
            triggers: entry.triggers,
            created_at,
        })
    }

    /// Most recent mood entries for a user, newest first, bounded.
    pub async fn recent_for_user(
        &self,
        user: &UserId,
        limit: i64,
    ) -> Result<Vec<MoodEntry>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, user_id, mood, intensity, notes, triggers, created_at \
             FROM mood_entries WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let triggers_json: Option<String> = row.get("triggers");
                MoodEntry {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    mood: row.get("mood"),
                    intensity: row.get("intensity"),
                    notes: row.get("notes"),
                    triggers: triggers_json
                        .and_then(|json| serde_json::from_str(&json).ok()),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }
}
