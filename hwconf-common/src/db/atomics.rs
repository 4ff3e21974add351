//! Atomic type queries (uncached)
//!
//! Package sets are queried as IN-lists. `crate::atomic_cache` keys its
//! scopes by the same package sets and picks the same row on duplicate names.

use super::models::AtomicType;
use crate::Result;
use sqlx::SqlitePool;

const ATOMIC_QUERY: &str = r#"
SELECT
  id,
  atomic_identifier AS identifier,
  name,
  description,
  atomic_size AS size,
  is_discrete,
  is_string,
  is_long,
  is_char,
  is_signed
FROM atomic
"#;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub async fn select_all_atomics(pool: &SqlitePool, package_ids: &[i64]) -> Result<Vec<AtomicType>> {
    if package_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{} WHERE package_ref IN ({}) ORDER BY atomic_identifier, id",
        ATOMIC_QUERY,
        placeholders(package_ids.len())
    );
    let mut query = sqlx::query_as::<_, AtomicType>(&sql);
    for id in package_ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn select_atomic_by_id(pool: &SqlitePool, id: i64) -> Result<Option<AtomicType>> {
    let sql = format!("{} WHERE id = ?", ATOMIC_QUERY);
    let atomic = sqlx::query_as::<_, AtomicType>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(atomic)
}

/// Not case sensitive
pub async fn select_atomic_by_name(
    pool: &SqlitePool,
    package_ids: &[i64],
    name: &str,
) -> Result<Option<AtomicType>> {
    if package_ids.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "{} WHERE package_ref IN ({}) AND UPPER(name) = ? ORDER BY atomic_identifier, id LIMIT 1",
        ATOMIC_QUERY,
        placeholders(package_ids.len())
    );
    let mut query = sqlx::query_as::<_, AtomicType>(&sql);
    for id in package_ids {
        query = query.bind(id);
    }

    Ok(query.bind(name.to_uppercase()).fetch_optional(pool).await?)
}

/// Install one atomic type definition for a package
pub async fn insert_atomic(pool: &SqlitePool, package_id: i64, atomic: &AtomicType) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO atomic (
            package_ref, atomic_identifier, name, description, atomic_size,
            is_discrete, is_string, is_long, is_char, is_signed
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(package_id)
    .bind(atomic.identifier)
    .bind(&atomic.name)
    .bind(&atomic.description)
    .bind(atomic.size)
    .bind(atomic.is_discrete)
    .bind(atomic.is_string)
    .bind(atomic.is_long)
    .bind(atomic.is_char)
    .bind(atomic.is_signed)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
