//! Database initialization
//!
//! Opens (or creates) the session store and creates every table the import
//! pipeline touches. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Imports fan out many concurrent writes; size the pool for it
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets readers proceed while one writer holds the lock
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Short busy timeout; longer waits are handled by retry_on_lock
    sqlx::query("PRAGMA busy_timeout = 250").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_package_table(pool).await?;
    create_session_tables(pool).await?;
    create_definition_tables(pool).await?;
    create_endpoint_tables(pool).await?;
    create_atomic_table(pool).await?;
    Ok(())
}

async fn create_package_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS package (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL,
            type TEXT NOT NULL,
            version TEXT,
            description TEXT,
            UNIQUE(path, type, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            dirty INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_package (
            session_ref INTEGER NOT NULL REFERENCES session(id) ON DELETE CASCADE,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            required INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            UNIQUE(session_ref, package_ref)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_key_value (
            session_ref INTEGER NOT NULL REFERENCES session(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT,
            UNIQUE(session_ref, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Definition tables filled by package loaders; imports only reference them
async fn create_definition_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            profile_id INTEGER,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cluster (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attribute (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cluster_ref INTEGER REFERENCES cluster(id) ON DELETE CASCADE,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            side TEXT,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS command (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cluster_ref INTEGER REFERENCES cluster(id) ON DELETE CASCADE,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            source TEXT,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_endpoint_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_ref INTEGER NOT NULL REFERENCES session(id) ON DELETE CASCADE,
            name TEXT,
            device_type_ref INTEGER REFERENCES device_type(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_ref INTEGER NOT NULL REFERENCES session(id) ON DELETE CASCADE,
            endpoint_type_ref INTEGER NOT NULL REFERENCES endpoint_type(id) ON DELETE CASCADE,
            endpoint_identifier INTEGER,
            network_identifier INTEGER,
            profile INTEGER,
            device_identifier INTEGER,
            device_version INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint_type_cluster (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_type_ref INTEGER NOT NULL REFERENCES endpoint_type(id) ON DELETE CASCADE,
            cluster_ref INTEGER REFERENCES cluster(id) ON DELETE SET NULL,
            cluster_code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            side TEXT,
            enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint_type_attribute (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_type_ref INTEGER NOT NULL REFERENCES endpoint_type(id) ON DELETE CASCADE,
            endpoint_type_cluster_ref INTEGER NOT NULL
                REFERENCES endpoint_type_cluster(id) ON DELETE CASCADE,
            attribute_ref INTEGER REFERENCES attribute(id) ON DELETE SET NULL,
            attribute_code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            side TEXT,
            included INTEGER NOT NULL DEFAULT 1,
            storage_option TEXT,
            singleton INTEGER NOT NULL DEFAULT 0,
            bounded INTEGER NOT NULL DEFAULT 0,
            default_value TEXT,
            reportable INTEGER NOT NULL DEFAULT 0,
            min_interval INTEGER,
            max_interval INTEGER,
            reportable_change INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS endpoint_type_command (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint_type_ref INTEGER NOT NULL REFERENCES endpoint_type(id) ON DELETE CASCADE,
            endpoint_type_cluster_ref INTEGER NOT NULL
                REFERENCES endpoint_type_cluster(id) ON DELETE CASCADE,
            command_ref INTEGER REFERENCES command(id) ON DELETE SET NULL,
            command_code INTEGER NOT NULL,
            manufacturer_code INTEGER,
            source TEXT,
            incoming INTEGER NOT NULL DEFAULT 0,
            outgoing INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_atomic_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS atomic (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_ref INTEGER NOT NULL REFERENCES package(id) ON DELETE CASCADE,
            atomic_identifier INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            atomic_size INTEGER,
            is_discrete INTEGER NOT NULL DEFAULT 0,
            is_string INTEGER NOT NULL DEFAULT 0,
            is_long INTEGER NOT NULL DEFAULT 0,
            is_char INTEGER NOT NULL DEFAULT 0,
            is_signed INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
