//! In-memory store stubs shared by the unit tests

use async_trait::async_trait;
use hwconf_common::db::models::{
    AttributeEntry, ClusterEntry, CommandEntry, EndpointRecord, EndpointTypeRecord, Package,
    PackageType,
};
use hwconf_common::{Error, PackageCatalog, Result, SessionWriter};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// One observed write; `parent` is the row id the write referenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Write {
    Session { id: i64 },
    SessionPackage { session_id: i64, package_id: i64, required: bool },
    KeyValue { session_id: i64, key: String, value: String },
    EndpointType { id: i64, session_id: i64 },
    Endpoint { id: i64, parent: i64 },
    Cluster { id: i64, parent: i64, code: i64 },
    Command { id: i64, parent: i64 },
    Attribute { id: i64, parent: i64 },
    Clean { session_id: i64 },
}

impl Write {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Write::Session { .. } => "session",
            Write::SessionPackage { .. } => "session_package",
            Write::KeyValue { .. } => "key_value",
            Write::EndpointType { .. } => "endpoint_type",
            Write::Endpoint { .. } => "endpoint",
            Write::Cluster { .. } => "cluster",
            Write::Command { .. } => "command",
            Write::Attribute { .. } => "attribute",
            Write::Clean { .. } => "clean",
        }
    }

    fn ids(&self) -> (Option<i64>, Option<i64>) {
        match *self {
            Write::EndpointType { id, .. } => (Some(id), None),
            Write::Endpoint { id, parent }
            | Write::Cluster { id, parent, .. }
            | Write::Command { id, parent }
            | Write::Attribute { id, parent } => (Some(id), Some(parent)),
            _ => (None, None),
        }
    }
}

/// Records every write in the order it completed and hands out row ids
#[derive(Default)]
pub(crate) struct RecordingStore {
    next_id: AtomicI64,
    writes: Mutex<Vec<Write>>,
    sessions: Mutex<HashSet<i64>>,
    packages: Vec<Package>,
    fail_on: Option<&'static str>,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self { next_id: AtomicI64::new(100), ..Default::default() }
    }

    pub(crate) fn with_packages(packages: Vec<Package>) -> Self {
        Self { packages, ..Self::new() }
    }

    /// Every write of the given kind fails with a store error
    pub(crate) fn failing_on(mut self, kind: &'static str) -> Self {
        self.fail_on = Some(kind);
        self
    }

    pub(crate) fn with_session(self, session_id: i64) -> Self {
        self.sessions.lock().unwrap().insert(session_id);
        self
    }

    pub(crate) fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.writes().iter().filter(|w| w.kind() == kind).count()
    }

    /// Panics if any child write was recorded before its parent
    pub(crate) fn assert_parents_first(&self) {
        let mut seen = HashSet::new();
        for write in self.writes() {
            let (id, parent) = write.ids();
            if let Some(parent) = parent {
                assert!(seen.contains(&parent), "{:?} recorded before its parent", write);
            }
            if let Some(id) = id {
                seen.insert(id);
            }
        }
    }

    async fn record<F>(&self, kind: &'static str, make: F) -> Result<i64>
    where
        F: FnOnce(i64) -> Write,
    {
        // Give sibling tasks a chance to interleave
        tokio::task::yield_now().await;
        if self.fail_on == Some(kind) {
            return Err(Error::Internal(format!("{} write rejected", kind)));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.writes.lock().unwrap().push(make(id));
        Ok(id)
    }
}

#[async_trait]
impl PackageCatalog for RecordingStore {
    async fn package_by_path_type_version(
        &self,
        path: &str,
        package_type: &PackageType,
        version: Option<&str>,
    ) -> Result<Option<Package>> {
        Ok(self
            .packages
            .iter()
            .find(|p| p.path == path && &p.package_type == package_type && p.version.as_deref() == version)
            .cloned())
    }

    async fn packages_by_type(&self, package_type: &PackageType) -> Result<Vec<Package>> {
        Ok(self
            .packages
            .iter()
            .filter(|p| &p.package_type == package_type)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionWriter for RecordingStore {
    async fn create_session(&self, _session_key: &str) -> Result<i64> {
        let id = self.record("session", |id| Write::Session { id }).await?;
        self.sessions.lock().unwrap().insert(id);
        Ok(id)
    }

    async fn session_exists(&self, session_id: i64) -> Result<bool> {
        Ok(self.sessions.lock().unwrap().contains(&session_id))
    }

    async fn insert_session_package(&self, session_id: i64, package_id: i64, required: bool) -> Result<()> {
        self.record("session_package", |_| Write::SessionPackage { session_id, package_id, required })
            .await?;
        Ok(())
    }

    async fn upsert_session_key_value(&self, session_id: i64, key: &str, value: &str) -> Result<()> {
        self.record("key_value", |_| Write::KeyValue {
            session_id,
            key: key.to_string(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn insert_endpoint_type(
        &self,
        session_id: i64,
        _package_id: i64,
        _record: &EndpointTypeRecord,
    ) -> Result<i64> {
        self.record("endpoint_type", |id| Write::EndpointType { id, session_id }).await
    }

    async fn insert_endpoint(&self, _session_id: i64, endpoint_type_id: i64, _record: &EndpointRecord) -> Result<i64> {
        self.record("endpoint", |id| Write::Endpoint { id, parent: endpoint_type_id }).await
    }

    async fn insert_endpoint_type_cluster(
        &self,
        _package_id: i64,
        endpoint_type_id: i64,
        cluster: &ClusterEntry,
    ) -> Result<i64> {
        let code = cluster.code;
        self.record("cluster", |id| Write::Cluster { id, parent: endpoint_type_id, code }).await
    }

    async fn insert_endpoint_type_command(
        &self,
        _package_id: i64,
        _endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        _cluster_code: i64,
        _command: &CommandEntry,
    ) -> Result<i64> {
        self.record("command", |id| Write::Command { id, parent: endpoint_type_cluster_id }).await
    }

    async fn insert_endpoint_type_attribute(
        &self,
        _package_id: i64,
        _endpoint_type_id: i64,
        endpoint_type_cluster_id: i64,
        _cluster_code: i64,
        _attribute: &AttributeEntry,
    ) -> Result<i64> {
        self.record("attribute", |id| Write::Attribute { id, parent: endpoint_type_cluster_id }).await
    }

    async fn set_session_clean(&self, session_id: i64) -> Result<()> {
        self.record("clean", |_| Write::Clean { session_id }).await?;
        Ok(())
    }
}

pub(crate) fn package(id: i64, path: &str, package_type: &str, version: Option<&str>) -> Package {
    Package {
        id,
        path: path.to_string(),
        package_type: PackageType::from(package_type),
        version: version.map(str::to_string),
        description: None,
    }
}
