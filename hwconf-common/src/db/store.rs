//! SQLite-backed implementation of the store contracts

use super::models::{
    AtomicType, AttributeEntry, ClusterEntry, CommandEntry, EndpointRecord, EndpointTypeRecord,
    Package, PackageType,
};
use super::retry::retry_on_lock;
use super::{atomics, endpoints, packages, sessions};
use crate::store::{AtomicSource, PackageCatalog, SessionWriter};
use crate::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Store client over a SQLite pool
///
/// Writes retry on lock contention for up to `lock_retry_max_wait_ms`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    lock_retry_max_wait_ms: u64,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, lock_retry_max_wait_ms: u64) -> Self {
        Self {
            pool,
            lock_retry_max_wait_ms,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PackageCatalog for SqliteStore {
    async fn package_by_path_type_version(
        &self,
        path: &str,
        package_type: &PackageType,
        version: Option<&str>,
    ) -> Result<Option<Package>> {
        packages::get_package_by_path_type_version(&self.pool, path, package_type, version).await
    }

    async fn packages_by_type(&self, package_type: &PackageType) -> Result<Vec<Package>> {
        packages::get_packages_by_type(&self.pool, package_type).await
    }
}

#[async_trait]
impl SessionWriter for SqliteStore {
    async fn create_session(&self, session_key: &str) -> Result<i64> {
        retry_on_lock("create_session", self.lock_retry_max_wait_ms, || {
            sessions::create_session(&self.pool, session_key)
        })
        .await
    }

    async fn session_exists(&self, session_id: i64) -> Result<bool> {
        sessions::session_exists(&self.pool, session_id).await
    }

    async fn insert_session_package(
        &self,
        session_id: i64,
        package_id: i64,
        required: bool,
    ) -> Result<()> {
        retry_on_lock("insert_session_package", self.lock_retry_max_wait_ms, || {
            packages::insert_session_package(&self.pool, session_id, package_id, required)
        })
        .await
    }

    async fn upsert_session_key_value(
        &self,
        session_id: i64,
        key: &str,
        value: &str,
    ) -> Result<()> {
        retry_on_lock("update_session_key_value", self.lock_retry_max_wait_ms, || {
            sessions::update_session_key_value(&self.pool, session_id, key, value)
        })
        .await
    }

    async fn insert_endpoint_type(
        &self,
        session_id: i64,
        package_id: i64,
        record: &EndpointTypeRecord,
    ) -> Result<i64> {
        retry_on_lock("insert_endpoint_type", self.lock_retry_max_wait_ms, || {
            endpoints::insert_endpoint_type(&self.pool, session_id, package_id, record)
        })
        .await
    }

    async fn insert_endpoint(
        &self,
        session_id: i64,
        endpoint_type_id: i64,
        record: &EndpointRecord,
    ) -> Result<i64> {
        retry_on_lock("insert_endpoint", self.lock_retry_max_wait_ms, || {
            endpoints::insert_endpoint(&self.pool, session_id, endpoint_type_id, record)
        })
        .await
    }

    async fn insert_endpoint_type_cluster(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        cluster: &ClusterEntry,
    ) -> Result<i64> {
        retry_on_lock("insert_endpoint_type_cluster", self.lock_retry_max_wait_ms, || {
            endpoints::insert_endpoint_type_cluster(&self.pool, package_id, endpoint_type_id, cluster)
        })
        .await
    }

    async fn insert_endpoint_type_command(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        cluster_code: i64,
        command: &CommandEntry,
    ) -> Result<i64> {
        retry_on_lock("insert_endpoint_type_command", self.lock_retry_max_wait_ms, || {
            endpoints::insert_endpoint_type_command(
                &self.pool,
                package_id,
                endpoint_type_id,
                endpoint_type_cluster_id,
                cluster_code,
                command,
            )
        })
        .await
    }

    async fn insert_endpoint_type_attribute(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        cluster_code: i64,
        attribute: &AttributeEntry,
    ) -> Result<i64> {
        retry_on_lock("insert_endpoint_type_attribute", self.lock_retry_max_wait_ms, || {
            endpoints::insert_endpoint_type_attribute(
                &self.pool,
                package_id,
                endpoint_type_id,
                endpoint_type_cluster_id,
                cluster_code,
                attribute,
            )
        })
        .await
    }

    async fn set_session_clean(&self, session_id: i64) -> Result<()> {
        retry_on_lock("set_session_clean", self.lock_retry_max_wait_ms, || {
            sessions::set_session_clean(&self.pool, session_id)
        })
        .await
    }
}

#[async_trait]
impl AtomicSource for SqliteStore {
    async fn select_all_atomics(&self, package_ids: &[i64]) -> Result<Vec<AtomicType>> {
        atomics::select_all_atomics(&self.pool, package_ids).await
    }

    async fn select_atomic_by_id(&self, id: i64) -> Result<Option<AtomicType>> {
        atomics::select_atomic_by_id(&self.pool, id).await
    }

    async fn select_atomic_by_name(
        &self,
        package_ids: &[i64],
        name: &str,
    ) -> Result<Option<AtomicType>> {
        atomics::select_atomic_by_name(&self.pool, package_ids, name).await
    }
}
