//! Session and session key-value queries

use super::models::Session;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

/// Create a dirty session and return its id
pub async fn create_session(pool: &SqlitePool, session_key: &str) -> Result<i64> {
    let created_at = Utc::now().to_rfc3339();
    let result = sqlx::query("INSERT INTO session (session_key, created_at, dirty) VALUES (?, ?, 1)")
        .bind(session_key)
        .bind(&created_at)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn load_session(pool: &SqlitePool, session_id: i64) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, session_key, created_at, dirty FROM session WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let created_at: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(Some(Session {
                id: row.get("id"),
                session_key: row.get("session_key"),
                created_at,
                dirty: row.get("dirty"),
            }))
        }
        None => Ok(None),
    }
}

pub async fn session_exists(pool: &SqlitePool, session_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session WHERE id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

pub async fn set_session_clean(pool: &SqlitePool, session_id: i64) -> Result<()> {
    let result = sqlx::query("UPDATE session SET dirty = 0 WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("session {}", session_id)));
    }
    Ok(())
}

/// Write or overwrite one session key
pub async fn update_session_key_value(
    pool: &SqlitePool,
    session_id: i64,
    key: &str,
    value: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session_key_value (session_ref, key, value) VALUES (?, ?, ?)
        ON CONFLICT(session_ref, key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(session_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_session_key_value(
    pool: &SqlitePool,
    session_id: i64,
    key: &str,
) -> Result<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar(
        "SELECT value FROM session_key_value WHERE session_ref = ? AND key = ?",
    )
    .bind(session_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(value.flatten())
}

pub async fn get_all_session_key_values(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT key, value FROM session_key_value WHERE session_ref = ?")
            .bind(session_id)
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}
