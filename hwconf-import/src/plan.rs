//! Classification of resolved packages into an import plan

use crate::error::{ImportError, ImportResult};
use crate::resolver::ResolvedPackage;
use hwconf_common::db::models::PackageType;
use serde::Serialize;

/// Resolved packages grouped by the role they play in a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRoles {
    /// The single zcl-properties package
    pub package_id: Option<i64>,
    /// Generation-template packages, in declaration order
    pub other_ids: Vec<i64>,
    /// Every other package type, in declaration order
    pub optional_ids: Vec<i64>,
}

impl PackageRoles {
    /// Unresolved (survivable) entries are skipped
    pub fn classify<'a, I>(resolved: I) -> ImportResult<Self>
    where
        I: IntoIterator<Item = &'a Option<ResolvedPackage>>,
    {
        let mut roles = Self::default();
        for package in resolved.into_iter().flatten() {
            match package.package_type {
                PackageType::ZclProperties => match roles.package_id {
                    Some(first) if first != package.package_id => {
                        return Err(ImportError::DuplicatePrimaryPackage {
                            first,
                            second: package.package_id,
                        });
                    }
                    _ => roles.package_id = Some(package.package_id),
                },
                PackageType::GenTemplatesJson => roles.other_ids.push(package.package_id),
                PackageType::Other(_) => roles.optional_ids.push(package.package_id),
            }
        }
        Ok(roles)
    }
}

/// Everything Stage B needs: the target session and the classified packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlan {
    pub session_id: i64,
    pub package_id: Option<i64>,
    pub other_ids: Vec<i64>,
    pub optional_ids: Vec<i64>,
}

impl ImportPlan {
    pub fn new(session_id: i64, roles: PackageRoles) -> Self {
        Self {
            session_id,
            package_id: roles.package_id,
            other_ids: roles.other_ids,
            optional_ids: roles.optional_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionStrategy;

    fn resolved(id: i64, package_type: &str) -> Option<ResolvedPackage> {
        Some(ResolvedPackage {
            package_id: id,
            package_type: PackageType::from(package_type),
            strategy: ResolutionStrategy::ExactMatch,
        })
    }

    #[test]
    fn test_classify_by_type_preserving_order() {
        let resolved = vec![
            resolved(5, "zcl-xml-standalone"),
            resolved(1, "zcl-properties"),
            None,
            resolved(3, "gen-templates-json"),
            resolved(4, "json-custom"),
        ];

        let plan = ImportPlan::new(9, PackageRoles::classify(&resolved).unwrap());
        assert_eq!(plan.session_id, 9);
        assert_eq!(plan.package_id, Some(1));
        assert_eq!(plan.other_ids, vec![3]);
        assert_eq!(plan.optional_ids, vec![5, 4]);
    }

    #[test]
    fn test_two_distinct_primary_packages_rejected() {
        let resolved = vec![resolved(1, "zcl-properties"), resolved(2, "zcl-properties")];
        let err = PackageRoles::classify(&resolved).unwrap_err();
        assert!(matches!(err, ImportError::DuplicatePrimaryPackage { first: 1, second: 2 }));
    }

    #[test]
    fn test_same_primary_declared_twice_is_fine() {
        let resolved = vec![resolved(1, "zcl-properties"), resolved(1, "zcl-properties")];
        assert_eq!(PackageRoles::classify(&resolved).unwrap().package_id, Some(1));
    }
}
