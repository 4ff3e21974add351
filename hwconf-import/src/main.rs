//! hwconf-import - project document importer
//!
//! Loads a project document, resolves its package references against the
//! packages installed in the store and merges its configuration into a
//! session. Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hwconf_common::config::{CliOverrides, ImportConfig};
use hwconf_common::db::{self, models::PackageType, SqliteStore};
use hwconf_common::{AtomicTypeCache, CacheScope};
use hwconf_import::paths::normalize_path;
use hwconf_import::{load_document_file, ImportOrchestrator};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for hwconf-import
#[derive(Parser, Debug)]
#[command(name = "hwconf-import")]
#[command(about = "Import hardware configuration documents into the session store")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge a project document into a new or existing session
    Import {
        file: PathBuf,

        /// Merge into this session instead of creating one
        #[arg(long)]
        session: Option<i64>,
    },

    /// List the atomic types of a package set, or look one up by name
    Atomics {
        #[arg(required = true)]
        package_ids: Vec<i64>,

        #[arg(long)]
        name: Option<String>,
    },

    /// Record an installed package so documents can resolve to it
    RegisterPackage {
        path: String,

        #[arg(long = "type")]
        package_type: String,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredPackage {
    package_id: i64,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ImportConfig::load(&CliOverrides {
        config_file: args.config.clone(),
        database_path: args.database.clone(),
        log_level: args.log_level.clone(),
    })
    .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("hwconf_import={0},hwconf_common={0}", config.log_level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("hwconf-import {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteStore::new(pool.clone(), config.lock_retry_max_wait_ms));

    match args.command {
        Command::Import { file, session } => {
            let document = load_document_file(&file, config.supported_feature_level)
                .await
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let outcome = ImportOrchestrator::new(store)
                .max_concurrent_writes(config.max_concurrent_writes)
                .run_import(&document, session)
                .await
                .context("Import failed")?;
            print_json(&outcome)?;
        }
        Command::Atomics { package_ids, name } => {
            let cache = AtomicTypeCache::with_enabled(store, config.cache_enabled);
            let scope = CacheScope::new(package_ids);
            match name {
                Some(name) => print_json(&cache.get_by_name(scope, &name).await?)?,
                None => print_json(&*cache.get_all(scope).await?)?,
            }
        }
        Command::RegisterPackage {
            path,
            package_type,
            version,
            description,
        } => {
            // Stored paths must match what document resolution produces
            let path = Path::new(&path);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .context("Failed to read current directory")?
                    .join(path)
            };
            let path = normalize_path(&absolute).to_string_lossy().into_owned();
            let package_id = db::packages::insert_package(
                &pool,
                &path,
                &PackageType::from(package_type),
                version.as_deref(),
                description.as_deref(),
            )
            .await?;
            info!(package_id, path = %path, "Package registered");
            print_json(&RegisteredPackage { package_id })?;
        }
    }

    pool.close().await;
    Ok(())
}
