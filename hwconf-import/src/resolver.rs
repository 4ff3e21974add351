//! Package resolution
//!
//! Matches a package reference declared in a project document to a package
//! installed in the store. Heuristics escalate until one yields a single
//! answer:
//!
//! 1. Exact match on absolute path, type and version.
//! 2. The only installed package of the declared type.
//! 3. The only package of that type with the declared version.
//! 4. Among several version matches, the first whose path exists on disk,
//!    otherwise the first version match.
//!
//! Running out of candidates fails the import, except for the survivable
//! package type (generation templates), which resolves to nothing instead.

use crate::error::{ImportError, ImportResult, ResolutionStage};
use crate::paths::{create_absolute_path, PathProbe};
use hwconf_common::db::models::{Package, PackageRef, PackageType};
use hwconf_common::PackageCatalog;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Which heuristic produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ResolutionStrategy {
    ExactMatch,
    OnlyOfType,
    OnlyOfVersion,
    OnlyExisting,
    FirstExisting { existing: usize },
    FirstOverall { candidates: usize },
}

/// Installed package chosen for a declared reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    pub package_id: i64,
    pub package_type: PackageType,
    pub strategy: ResolutionStrategy,
}

pub struct PackageResolver<'a, C: ?Sized, P: ?Sized> {
    catalog: &'a C,
    probe: &'a P,
}

impl<'a, C, P> PackageResolver<'a, C, P>
where
    C: PackageCatalog + ?Sized,
    P: PathProbe + ?Sized,
{
    pub fn new(catalog: &'a C, probe: &'a P) -> Self {
        Self { catalog, probe }
    }

    /// Resolve one declared package; `document_path` anchors relative paths
    pub async fn resolve(
        &self,
        declared: &PackageRef,
        document_path: Option<&Path>,
    ) -> ImportResult<Option<ResolvedPackage>> {
        let package_type = &declared.package_type;
        let version = declared.version.as_deref();
        let absolute_path = create_absolute_path(
            &declared.path,
            declared.path_relativity.as_deref(),
            document_path,
        );

        let exact = self
            .catalog
            .package_by_path_type_version(&absolute_path.to_string_lossy(), package_type, version)
            .await?;
        if let Some(package) = exact {
            return Ok(Some(resolved(&package, ResolutionStrategy::ExactMatch)));
        }

        info!(
            path = %absolute_path.display(),
            package_type = %package_type,
            "Packages from the file did not match loaded packages, making best bet"
        );

        let of_type = self.catalog.packages_by_type(package_type).await?;
        match of_type.len() {
            0 => return no_candidates(declared, 0, ResolutionStage::TypeFilter),
            1 => {
                info!(package_type = %package_type, "Only one package of given type present, using it");
                return Ok(Some(resolved(&of_type[0], ResolutionStrategy::OnlyOfType)));
            }
            _ => {}
        }

        let type_count = of_type.len();
        let of_version: Vec<Package> = of_type
            .into_iter()
            .filter(|p| p.version.as_deref() == version)
            .collect();
        match of_version.len() {
            0 => return no_candidates(declared, type_count, ResolutionStage::VersionFilter),
            1 => {
                info!(
                    package_type = %package_type,
                    version = version.unwrap_or_default(),
                    "Only one package of given type and version present, using it"
                );
                return Ok(Some(resolved(&of_version[0], ResolutionStrategy::OnlyOfVersion)));
            }
            _ => {}
        }

        let existing: Vec<&Package> = of_version
            .iter()
            .filter(|p| self.probe.exists(Path::new(&p.path)))
            .collect();

        let (package, strategy) = match existing.len() {
            0 => {
                let first = &of_version[0];
                warn!(package_id = first.id, "None of packages exist, so using first one overall");
                (
                    first,
                    ResolutionStrategy::FirstOverall {
                        candidates: of_version.len(),
                    },
                )
            }
            1 => {
                warn!(package_id = existing[0].id, "Using only package that exists");
                (existing[0], ResolutionStrategy::OnlyExisting)
            }
            n => {
                warn!(
                    package_id = existing[0].id,
                    existing = n,
                    "Using first package that exists"
                );
                (existing[0], ResolutionStrategy::FirstExisting { existing: n })
            }
        };

        Ok(Some(resolved(package, strategy)))
    }
}

fn resolved(package: &Package, strategy: ResolutionStrategy) -> ResolvedPackage {
    ResolvedPackage {
        package_id: package.id,
        package_type: package.package_type.clone(),
        strategy,
    }
}

fn no_candidates(
    declared: &PackageRef,
    candidates: usize,
    stage: ResolutionStage,
) -> ImportResult<Option<ResolvedPackage>> {
    let err = ImportError::Resolution {
        package_type: declared.package_type.clone(),
        version: declared.version.clone(),
        candidates,
        stage,
    };

    if declared.package_type.is_survivable() {
        // Generation templates are optional; the session can live without them
        info!(package_type = %declared.package_type, "{}", err);
        return Ok(None);
    }
    Err(err)
}
