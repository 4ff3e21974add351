//! Import orchestration
//!
//! An import runs in three stages, each finishing before the next starts:
//!
//! - **Stage A**: resolve every declared package concurrently and classify the
//!   results into an [`ImportPlan`]. Nothing is written until this succeeds,
//!   so resolution failures leave the store untouched.
//! - **Stage B**: optional package links, key-value pairs and the endpoint
//!   configuration tree are written concurrently.
//! - **Stage C**: the session is marked clean.
//!
//! Stage B failures can leave a partial merge behind; concurrent writes are
//! not rolled back.

use crate::dependencies::import_dependencies;
use crate::document::NormalizedDocument;
use crate::error::{ImportError, ImportResult};
use crate::hierarchy::{HierarchyImporter, HierarchyStats, ImportTree};
use crate::paths::{FsProbe, PathProbe};
use crate::plan::{ImportPlan, PackageRoles};
use crate::resolver::PackageResolver;
use futures::future::try_join_all;
use hwconf_common::config::DEFAULT_MAX_CONCURRENT_WRITES;
use hwconf_common::{PackageCatalog, SessionWriter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result reported to the caller of a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub session_id: i64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub written: HierarchyStats,
}

pub struct ImportOrchestrator<S, P = FsProbe> {
    store: Arc<S>,
    probe: P,
    max_concurrent_writes: usize,
}

impl<S> ImportOrchestrator<S, FsProbe>
where
    S: PackageCatalog + SessionWriter,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_probe(store, FsProbe)
    }
}

impl<S, P> ImportOrchestrator<S, P>
where
    S: PackageCatalog + SessionWriter,
    P: PathProbe,
{
    pub fn with_probe(store: Arc<S>, probe: P) -> Self {
        Self {
            store,
            probe,
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
        }
    }

    /// Bound on in-flight writes per fan-out
    pub fn max_concurrent_writes(mut self, limit: usize) -> Self {
        self.max_concurrent_writes = limit.max(1);
        self
    }

    /// Merge `document` into a new session, or into `existing_session_id`
    /// when given (prior session data is kept)
    pub async fn run_import(
        &self,
        document: &NormalizedDocument,
        existing_session_id: Option<i64>,
    ) -> ImportResult<ImportOutcome> {
        info!(
            path = %document.file_path.display(),
            existing_session_id,
            "Starting import"
        );

        // Stage A
        let roles = self.resolve_packages(document).await?;
        if !document.endpoint_types.is_empty() && roles.package_id.is_none() {
            return Err(ImportError::MissingPrimaryPackage);
        }
        let session_id = self.target_session(existing_session_id).await?;
        let plan = ImportPlan::new(session_id, roles);
        info!(
            session_id,
            package_id = plan.package_id,
            other_packages = plan.other_ids.len(),
            optional_packages = plan.optional_ids.len(),
            "Packages resolved"
        );

        let mut warnings = Vec::new();
        let tree = ImportTree::build(&document.endpoint_types, &document.endpoints);
        if tree.orphaned_endpoints > 0 {
            warnings.push(format!(
                "Skipped {} endpoint(s) referencing a missing endpoint type",
                tree.orphaned_endpoints
            ));
        }

        // Stage B
        let written = self.write_session_data(&plan, document, &tree).await?;

        // Stage C
        self.store.set_session_clean(session_id).await?;
        info!(session_id, "Import complete");

        for warning in &warnings {
            warn!(session_id, "{}", warning);
        }
        Ok(ImportOutcome {
            session_id,
            errors: Vec::new(),
            warnings,
            written,
        })
    }

    async fn resolve_packages(&self, document: &NormalizedDocument) -> ImportResult<PackageRoles> {
        let resolver = PackageResolver::new(self.store.as_ref(), &self.probe);
        let resolved = try_join_all(
            document
                .packages
                .iter()
                .map(|declared| resolver.resolve(declared, Some(document.file_path.as_path()))),
        )
        .await?;
        PackageRoles::classify(&resolved)
    }

    async fn target_session(&self, existing_session_id: Option<i64>) -> ImportResult<i64> {
        match existing_session_id {
            Some(session_id) => {
                if !self.store.session_exists(session_id).await? {
                    return Err(ImportError::UnknownSession(session_id));
                }
                Ok(session_id)
            }
            None => {
                let session_id = self.store.create_session(&Uuid::new_v4().to_string()).await?;
                info!(session_id, "Created session");
                Ok(session_id)
            }
        }
    }

    async fn write_session_data(
        &self,
        plan: &ImportPlan,
        document: &NormalizedDocument,
        tree: &ImportTree<'_>,
    ) -> ImportResult<HierarchyStats> {
        let store = self.store.as_ref();
        let limit = self.max_concurrent_writes;

        let hierarchy = async {
            match plan.package_id {
                Some(package_id) if !tree.is_empty() => {
                    HierarchyImporter::new(store, plan.session_id, package_id, limit)
                        .import(tree)
                        .await
                }
                _ => Ok(HierarchyStats::default()),
            }
        };

        let (dependencies, hierarchy) = futures::join!(
            import_dependencies(store, plan, &document.key_value_pairs, limit),
            hierarchy,
        );
        dependencies?;
        hierarchy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;
    use crate::test_support::{package, RecordingStore, Write};
    use serde_json::json;
    use std::path::Path;

    struct NothingExists;

    impl PathProbe for NothingExists {
        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    fn document(value: serde_json::Value) -> NormalizedDocument {
        parse_document(Path::new("/work/light.zap"), &value.to_string(), 104).unwrap()
    }

    fn orchestrator(store: &Arc<RecordingStore>) -> ImportOrchestrator<RecordingStore, NothingExists> {
        ImportOrchestrator::with_probe(Arc::clone(store), NothingExists).max_concurrent_writes(4)
    }

    fn installed() -> Vec<hwconf_common::db::models::Package> {
        vec![
            package(1, "/a.xml", "zcl-properties", Some("1.0")),
            package(2, "/gen/templates.json", "gen-templates-json", None),
            package(3, "/custom.xml", "zcl-xml-standalone", None),
        ]
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let store = Arc::new(RecordingStore::with_packages(installed()));
        let doc = document(json!({
            "package": [
                { "path": "/a.xml", "type": "zcl-properties", "version": "1.0" },
                { "path": "/gen/templates.json", "type": "gen-templates-json" },
                { "path": "/custom.xml", "type": "zcl-xml-standalone" }
            ],
            "endpointTypes": [{ "clusters": [{ "code": 6, "attributes": [{ "code": 0 }] }] }],
            "endpoints": [{ "endpointTypeIndex": 0, "endpointId": 1 }]
        }));

        let outcome = orchestrator(&store).run_import(&doc, None).await.unwrap();
        assert!(outcome.errors.is_empty());
        assert!(outcome.warnings.is_empty());

        let writes = store.writes();
        assert_eq!(writes.first(), Some(&Write::Session { id: outcome.session_id }));
        assert_eq!(writes.last(), Some(&Write::Clean { session_id: outcome.session_id }));
        store.assert_parents_first();

        // Only the optional package is linked
        let links: Vec<&Write> = writes.iter().filter(|w| w.kind() == "session_package").collect();
        assert_eq!(
            links,
            vec![&Write::SessionPackage { session_id: outcome.session_id, package_id: 3, required: false }]
        );
        assert_eq!(outcome.written.attributes, 1);
        assert_eq!(outcome.written.endpoints, 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_writes_nothing() {
        let store = Arc::new(RecordingStore::with_packages(installed()));
        let doc = document(json!({
            "package": [
                { "path": "/a.xml", "type": "zcl-properties", "version": "1.0" },
                { "path": "/other.xml", "type": "zcl-xml-other" }
            ]
        }));

        let err = orchestrator(&store).run_import(&doc, None).await.unwrap_err();
        assert!(matches!(err, ImportError::Resolution { .. }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_templates_package_is_survivable() {
        let store = Arc::new(RecordingStore::with_packages(vec![package(1, "/a.xml", "zcl-properties", Some("1.0"))]));
        let doc = document(json!({
            "package": [
                { "path": "/a.xml", "type": "zcl-properties", "version": "1.0" },
                { "path": "/gen/templates.json", "type": "gen-templates-json" }
            ]
        }));

        let outcome = orchestrator(&store).run_import(&doc, None).await.unwrap();
        assert_eq!(store.count("clean"), 1);
        assert_eq!(store.count("key_value"), 1);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_types_need_primary_package() {
        let store = Arc::new(RecordingStore::new());
        let doc = document(json!({
            "package": [],
            "endpointTypes": [{ "clusters": [] }]
        }));

        let err = orchestrator(&store).run_import(&doc, None).await.unwrap_err();
        assert!(matches!(err, ImportError::MissingPrimaryPackage));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let store = Arc::new(RecordingStore::with_packages(installed()).with_session(42));
        let doc = document(json!({
            "package": [{ "path": "/a.xml", "type": "zcl-properties", "version": "1.0" }]
        }));

        let outcome = orchestrator(&store).run_import(&doc, Some(42)).await.unwrap();
        assert_eq!(outcome.session_id, 42);
        assert_eq!(store.count("session"), 0);

        let err = orchestrator(&store).run_import(&doc, Some(43)).await.unwrap_err();
        assert!(matches!(err, ImportError::UnknownSession(43)));
    }

    #[tokio::test]
    async fn test_store_failure_skips_clean_stage() {
        let store = Arc::new(RecordingStore::with_packages(installed()).failing_on("endpoint"));
        let doc = document(json!({
            "package": [{ "path": "/a.xml", "type": "zcl-properties", "version": "1.0" }],
            "endpointTypes": [{ "clusters": [{ "code": 6 }] }],
            "endpoints": [{ "endpointTypeIndex": 0, "endpointId": 1 }]
        }));

        let err = orchestrator(&store).run_import(&doc, None).await.unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
        assert_eq!(store.count("cluster"), 1);
        assert_eq!(store.count("clean"), 0);
    }

    #[tokio::test]
    async fn test_orphaned_endpoint_reported_as_warning() {
        let store = Arc::new(RecordingStore::with_packages(installed()));
        let doc = document(json!({
            "package": [{ "path": "/a.xml", "type": "zcl-properties", "version": "1.0" }],
            "endpointTypes": [{}],
            "endpoints": [{ "endpointTypeIndex": 3, "endpointId": 9 }]
        }));

        let outcome = orchestrator(&store).run_import(&doc, None).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(store.count("endpoint"), 0);
        assert_eq!(outcome.written.endpoint_types, 1);
    }
}
