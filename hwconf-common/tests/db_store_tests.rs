//! Integration tests for the SQLite store
//!
//! Exercises schema creation, package lookups, session writes and the
//! endpoint configuration inserts against an in-memory database.

use hwconf_common::db::models::{
    AtomicType, AttributeEntry, ClusterEntry, CommandEntry, EndpointRecord, EndpointTypeRecord,
    PackageType,
};
use hwconf_common::db::{atomics, endpoints, init, packages, sessions, SqliteStore};
use hwconf_common::{AtomicSource, AtomicTypeCache, PackageCatalog, SessionWriter};
use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn memory_pool() -> SqlitePool {
    // One connection: every connection to :memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
    init::create_schema(&pool).await.unwrap();
    pool
}

fn atomic(identifier: i64, name: &str) -> AtomicType {
    AtomicType {
        id: 0,
        identifier,
        name: name.to_string(),
        description: None,
        size: Some(1),
        is_discrete: false,
        is_string: false,
        is_long: false,
        is_char: false,
        is_signed: false,
    }
}

#[tokio::test]
async fn test_init_database_creates_file_and_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("hwconf.db");

    let pool = init::init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "Database file was not created");
    drop(pool);

    let reopened = init::init_database(&db_path).await;
    assert!(reopened.is_ok(), "Failed to reopen database: {:?}", reopened.err());
}

#[tokio::test]
async fn test_exact_package_match_requires_all_three_fields() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);

    let id = packages::insert_package(
        &pool,
        "/opt/zcl/zcl.json",
        &PackageType::ZclProperties,
        Some("1.0"),
        None,
    )
    .await
    .unwrap();

    let hit = store
        .package_by_path_type_version("/opt/zcl/zcl.json", &PackageType::ZclProperties, Some("1.0"))
        .await
        .unwrap();
    assert_eq!(hit.map(|p| p.id), Some(id));

    let wrong_version = store
        .package_by_path_type_version("/opt/zcl/zcl.json", &PackageType::ZclProperties, Some("2.0"))
        .await
        .unwrap();
    assert!(wrong_version.is_none());

    let wrong_type = store
        .package_by_path_type_version("/opt/zcl/zcl.json", &PackageType::GenTemplatesJson, Some("1.0"))
        .await
        .unwrap();
    assert!(wrong_type.is_none());
}

#[tokio::test]
async fn test_packages_by_type_in_insertion_order() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);
    let t = PackageType::from("zcl-xml-standalone");

    let a = packages::insert_package(&pool, "/b.xml", &t, Some("1"), None).await.unwrap();
    let b = packages::insert_package(&pool, "/a.xml", &t, Some("1"), None).await.unwrap();
    packages::insert_package(&pool, "/c.json", &PackageType::ZclProperties, None, None)
        .await
        .unwrap();

    let found = store.packages_by_type(&t).await.unwrap();
    let ids: Vec<i64> = found.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a, b]);
    assert!(found.iter().all(|p| p.package_type == t));
}

#[tokio::test]
async fn test_session_key_value_overwrites() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);

    let session_id = store.create_session("key-1").await.unwrap();
    store.upsert_session_key_value(session_id, "filePath", "/a.zap").await.unwrap();
    store.upsert_session_key_value(session_id, "filePath", "/b.zap").await.unwrap();

    let value = sessions::get_session_key_value(&pool, session_id, "filePath").await.unwrap();
    assert_eq!(value.as_deref(), Some("/b.zap"));
    assert_eq!(sessions::get_all_session_key_values(&pool, session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_clean_flag() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);

    let session_id = store.create_session("key-2").await.unwrap();
    assert!(sessions::load_session(&pool, session_id).await.unwrap().unwrap().dirty);

    store.set_session_clean(session_id).await.unwrap();
    assert!(!sessions::load_session(&pool, session_id).await.unwrap().unwrap().dirty);

    assert!(store.session_exists(session_id).await.unwrap());
    assert!(!store.session_exists(session_id + 100).await.unwrap());
    assert!(store.set_session_clean(session_id + 100).await.is_err());
}

#[tokio::test]
async fn test_endpoint_config_links_definitions_when_present() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);

    let package_id =
        packages::insert_package(&pool, "/zcl.json", &PackageType::ZclProperties, Some("1"), None)
            .await
            .unwrap();
    let cluster_def: i64 = sqlx::query("INSERT INTO cluster (package_ref, code, name) VALUES (?, 6, 'On/off')")
        .bind(package_id)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
    let attribute_def: i64 = sqlx::query(
        "INSERT INTO attribute (cluster_ref, package_ref, code, side, name) VALUES (?, ?, 0, 'server', 'on/off')",
    )
    .bind(cluster_def)
    .bind(package_id)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let session_id = store.create_session("key-3").await.unwrap();
    let endpoint_type_id = store
        .insert_endpoint_type(session_id, package_id, &EndpointTypeRecord::default())
        .await
        .unwrap();
    store
        .insert_endpoint(
            session_id,
            endpoint_type_id,
            &EndpointRecord { endpoint_type_index: 0, endpoint_id: Some(1), ..Default::default() },
        )
        .await
        .unwrap();

    let cluster = ClusterEntry { code: 6, side: Some("server".to_string()), enabled: true, ..Default::default() };
    let etc_id = store
        .insert_endpoint_type_cluster(package_id, endpoint_type_id, &cluster)
        .await
        .unwrap();
    let attribute = AttributeEntry { code: 0, side: Some("server".to_string()), included: true, ..Default::default() };
    store
        .insert_endpoint_type_attribute(package_id, endpoint_type_id, etc_id, 6, &attribute)
        .await
        .unwrap();
    // Undefined command code: stored with a NULL definition reference
    let command = CommandEntry { code: 0x40, incoming: true, ..Default::default() };
    store
        .insert_endpoint_type_command(package_id, endpoint_type_id, etc_id, 6, &command)
        .await
        .unwrap();

    let cluster_ref: Option<i64> =
        sqlx::query_scalar("SELECT cluster_ref FROM endpoint_type_cluster WHERE id = ?")
            .bind(etc_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(cluster_ref, Some(cluster_def));

    let attribute_ref: Option<i64> =
        sqlx::query_scalar("SELECT attribute_ref FROM endpoint_type_attribute WHERE endpoint_type_cluster_ref = ?")
            .bind(etc_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(attribute_ref, Some(attribute_def));

    let command_ref: Option<i64> =
        sqlx::query_scalar("SELECT command_ref FROM endpoint_type_command WHERE endpoint_type_cluster_ref = ?")
            .bind(etc_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(command_ref, None);

    let counts = endpoints::count_session_config(&pool, session_id).await.unwrap();
    assert_eq!(
        counts,
        endpoints::EndpointConfigCounts {
            endpoint_types: 1,
            endpoints: 1,
            clusters: 1,
            commands: 1,
            attributes: 1,
        }
    );
}

#[tokio::test]
async fn test_endpoint_requires_existing_endpoint_type() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);
    let session_id = store.create_session("key-4").await.unwrap();

    let result = store
        .insert_endpoint(session_id, 9999, &EndpointRecord::default())
        .await;
    assert!(result.is_err(), "Foreign key violation should surface as a store error");
}

#[tokio::test]
async fn test_atomics_ordered_and_case_insensitive() {
    let pool = memory_pool().await;
    let store = SqliteStore::new(pool.clone(), 1000);

    let p1 = packages::insert_package(&pool, "/p1", &PackageType::ZclProperties, None, None)
        .await
        .unwrap();
    let p2 = packages::insert_package(&pool, "/p2", &PackageType::ZclProperties, None, None)
        .await
        .unwrap();
    atomics::insert_atomic(&pool, p1, &atomic(0x21, "int16u")).await.unwrap();
    atomics::insert_atomic(&pool, p1, &atomic(0x20, "int8u")).await.unwrap();
    atomics::insert_atomic(&pool, p2, &atomic(0x10, "boolean")).await.unwrap();

    let only_p1 = store.select_all_atomics(&[p1]).await.unwrap();
    let names: Vec<&str> = only_p1.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["int8u", "int16u"]);

    let both = store.select_all_atomics(&[p1, p2]).await.unwrap();
    assert_eq!(both.len(), 3);
    assert_eq!(both[0].name, "boolean");

    let by_name = store.select_atomic_by_name(&[p1], "INT16U").await.unwrap().unwrap();
    assert_eq!(by_name.identifier, 0x21);
    assert!(store.select_atomic_by_name(&[p2], "int16u").await.unwrap().is_none());

    let by_id = store.select_atomic_by_id(by_name.id).await.unwrap();
    assert_eq!(by_id, Some(by_name));

    assert!(store.select_all_atomics(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_atomic_name_same_with_and_without_cache() {
    let pool = memory_pool().await;
    let p1 = packages::insert_package(&pool, "/p1", &PackageType::ZclProperties, None, None)
        .await
        .unwrap();
    let p2 = packages::insert_package(&pool, "/p2", &PackageType::ZclProperties, None, None)
        .await
        .unwrap();
    // Both packages define the name; the lower identifier sorts first
    atomics::insert_atomic(&pool, p1, &atomic(0x30, "enum8")).await.unwrap();
    atomics::insert_atomic(&pool, p2, &atomic(0x28, "ENUM8")).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool.clone(), 1000));

    let uncached = AtomicTypeCache::with_enabled(Arc::clone(&store), false)
        .get_by_name(&[p1, p2][..], "Enum8")
        .await
        .unwrap()
        .unwrap();
    let cached = AtomicTypeCache::new(Arc::clone(&store))
        .get_by_name(&[p1, p2][..], "Enum8")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(uncached.identifier, 0x28);
    assert_eq!(cached, uncached);
}
