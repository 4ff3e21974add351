//! Store contracts consumed by the import pipeline and the atomic type cache
//!
//! The SQLite implementation lives in [`crate::db::SqliteStore`]; tests plug in
//! their own stubs to observe ordering or count queries.

use crate::db::models::{
    AtomicType, AttributeEntry, ClusterEntry, CommandEntry, EndpointRecord, EndpointTypeRecord,
    Package, PackageType,
};
use crate::Result;
use async_trait::async_trait;

/// Read-only view of installed packages
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    /// Exact match on absolute path, type and version
    async fn package_by_path_type_version(
        &self,
        path: &str,
        package_type: &PackageType,
        version: Option<&str>,
    ) -> Result<Option<Package>>;

    /// All installed packages of a type, in insertion order
    async fn packages_by_type(&self, package_type: &PackageType) -> Result<Vec<Package>>;
}

/// Session-scoped writes issued by an import
///
/// Every insert returns the generated row id consumed by child writes.
#[async_trait]
pub trait SessionWriter: Send + Sync {
    async fn create_session(&self, session_key: &str) -> Result<i64>;

    async fn session_exists(&self, session_id: i64) -> Result<bool>;

    async fn insert_session_package(
        &self,
        session_id: i64,
        package_id: i64,
        required: bool,
    ) -> Result<()>;

    /// Insert or overwrite one key of the session's key-value store
    async fn upsert_session_key_value(&self, session_id: i64, key: &str, value: &str)
        -> Result<()>;

    async fn insert_endpoint_type(
        &self,
        session_id: i64,
        package_id: i64,
        record: &EndpointTypeRecord,
    ) -> Result<i64>;

    async fn insert_endpoint(
        &self,
        session_id: i64,
        endpoint_type_id: i64,
        record: &EndpointRecord,
    ) -> Result<i64>;

    async fn insert_endpoint_type_cluster(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        cluster: &ClusterEntry,
    ) -> Result<i64>;

    async fn insert_endpoint_type_command(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        cluster_code: i64,
        command: &CommandEntry,
    ) -> Result<i64>;

    async fn insert_endpoint_type_attribute(
        &self,
        package_id: i64,
        endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        cluster_code: i64,
        attribute: &AttributeEntry,
    ) -> Result<i64>;

    async fn set_session_clean(&self, session_id: i64) -> Result<()>;
}

/// Bulk and point reads of atomic type descriptors
#[async_trait]
pub trait AtomicSource: Send + Sync {
    /// All atomics of the given packages, ordered by ascending atomic identifier
    async fn select_all_atomics(&self, package_ids: &[i64]) -> Result<Vec<AtomicType>>;

    async fn select_atomic_by_id(&self, id: i64) -> Result<Option<AtomicType>>;

    /// Case-insensitive name lookup within the given packages
    async fn select_atomic_by_name(
        &self,
        package_ids: &[i64],
        name: &str,
    ) -> Result<Option<AtomicType>>;
}
