//! Package catalog queries

use super::models::{Package, PackageType};
use crate::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const PACKAGE_QUERY: &str = "SELECT id, path, type, version, description FROM package";

fn map_package(row: &SqliteRow) -> Package {
    let package_type: String = row.get("type");
    Package {
        id: row.get("id"),
        path: row.get("path"),
        package_type: PackageType::from(package_type),
        version: row.get("version"),
        description: row.get("description"),
    }
}

/// Register an installed package and return its id
pub async fn insert_package(
    pool: &SqlitePool,
    path: &str,
    package_type: &PackageType,
    version: Option<&str>,
    description: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO package (path, type, version, description) VALUES (?, ?, ?, ?)",
    )
    .bind(path)
    .bind(package_type.as_str())
    .bind(version)
    .bind(description)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Exact match on path, type and version (a missing version matches NULL)
pub async fn get_package_by_path_type_version(
    pool: &SqlitePool,
    path: &str,
    package_type: &PackageType,
    version: Option<&str>,
) -> Result<Option<Package>> {
    let row = sqlx::query(&format!(
        "{} WHERE path = ? AND type = ? AND version IS ?",
        PACKAGE_QUERY
    ))
    .bind(path)
    .bind(package_type.as_str())
    .bind(version)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(map_package))
}

pub async fn get_packages_by_type(
    pool: &SqlitePool,
    package_type: &PackageType,
) -> Result<Vec<Package>> {
    let rows = sqlx::query(&format!("{} WHERE type = ? ORDER BY id", PACKAGE_QUERY))
        .bind(package_type.as_str())
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(map_package).collect())
}

/// Associate a package with a session; re-linking an existing pair updates `required`
pub async fn insert_session_package(
    pool: &SqlitePool,
    session_id: i64,
    package_id: i64,
    required: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session_package (session_ref, package_ref, required, enabled)
        VALUES (?, ?, ?, 1)
        ON CONFLICT(session_ref, package_ref) DO UPDATE SET
            required = excluded.required,
            enabled = 1
        "#,
    )
    .bind(session_id)
    .bind(package_id)
    .bind(required)
    .execute(pool)
    .await?;

    Ok(())
}

/// Package ids linked to a session, in id order
pub async fn get_session_package_ids(pool: &SqlitePool, session_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT package_ref FROM session_package WHERE session_ref = ? ORDER BY package_ref",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}
