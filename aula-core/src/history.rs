//! Persisted chat history.
//!
//! The whole history is one JSON list stored under a single key in a
//! SQLite key/value table, newest entry first. Every append reads the list,
//! prepends and writes it back.

use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Storage key of the history list
pub const HISTORY_KEY: &str = "chatHistory";

pub const EMPTY_HISTORY: &str = "No hay chats guardados.";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Corrupt history: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Failed to initialize history store: {0}")]
    InitializationError(String),
}

/// One saved question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    #[serde(rename = "date")]
    pub timestamp: String,
}

impl HistoryEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            timestamp: Local::now().format("%d/%m/%Y %H:%M:%S").to_string(),
        }
    }

    /// Label for the history panel
    pub fn label(&self) -> String {
        format!("{}: {}", self.timestamp, self.question)
    }
}

pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open (or create) the store at `db_path`
    #[instrument(skip_all)]
    pub async fn open(db_path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HistoryError::InitializationError(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        debug!("Connecting to SQLite database at: {}", db_path.display());
        let pool = SqlitePool::connect(&db_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("History store ready");
        Ok(Self { pool })
    }

    /// All entries, newest first
    pub async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(HISTORY_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Prepend a new entry and persist the whole list
    #[instrument(skip(self, answer), fields(answer_len = answer.len()))]
    pub async fn append(&self, question: &str, answer: &str) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry::new(question, answer);
        let mut entries = self.load().await?;
        entries.insert(0, entry.clone());

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(HISTORY_KEY)
        .bind(serde_json::to_string(&entries)?)
        .execute(&self.pool)
        .await?;

        debug!(total = entries.len(), "History entry saved");
        Ok(entry)
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(HISTORY_KEY)
            .execute(&self.pool)
            .await?;
        info!("History cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_is_newest_first() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("history.db")).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());

        store.append("primera", "uno").await.unwrap();
        store.append("segunda", "dos").await.unwrap();

        let entries = store.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question, "segunda");
        assert_eq!(entries[1].answer, "uno");
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        {
            let store = HistoryStore::open(&path).await.unwrap();
            store.append("¿Qué es?", "Una respuesta").await.unwrap();
        }
        let store = HistoryStore::open(&path).await.unwrap();
        assert_eq!(store.load().await.unwrap()[0].question, "¿Qué es?");
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(&dir.path().join("history.db")).await.unwrap();
        store.append("q", "a").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[test]
    fn test_entry_uses_date_field() {
        let entry = HistoryEntry {
            question: "q".to_string(),
            answer: "a".to_string(),
            timestamp: "01/02/2025 10:00:00".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "01/02/2025 10:00:00");
        assert!(json.get("timestamp").is_none());
        assert_eq!(entry.label(), "01/02/2025 10:00:00: q");
    }
}
