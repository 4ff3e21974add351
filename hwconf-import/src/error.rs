//! Error types for hwconf-import
//!
//! Every failure of an import is one of these variants, so callers can branch
//! on the kind rather than on message text.

use hwconf_common::db::models::PackageType;
use std::fmt;
use thiserror::Error;

/// Filter step that left no candidate packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    /// No installed package has the declared type
    TypeFilter,
    /// Packages of the type exist, none with the declared version
    VersionFilter,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStage::TypeFilter => f.write_str("type"),
            ResolutionStage::VersionFilter => f.write_str("version"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    /// A required package could not be matched to an installed one
    #[error("{}", resolution_message(.package_type, .version.as_deref(), *.stage))]
    Resolution {
        package_type: PackageType,
        version: Option<String>,
        /// Candidates before the failing filter was applied
        candidates: usize,
        stage: ResolutionStage,
    },

    #[error("File requires feature level {required}, we only have {supported}. Please upgrade your tool!")]
    VersionIncompatibility { required: u32, supported: u32 },

    #[error("Store failure: {0}")]
    Store(#[from] hwconf_common::Error),

    #[error("Malformed document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Document declares endpoint types but no zcl-properties package resolved")]
    MissingPrimaryPackage,

    #[error("More than one zcl-properties package resolved ({first} and {second})")]
    DuplicatePrimaryPackage { first: i64, second: i64 },

    #[error("Session {0} does not exist")]
    UnknownSession(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn resolution_message(package_type: &PackageType, version: Option<&str>, stage: ResolutionStage) -> String {
    match stage {
        ResolutionStage::TypeFilter => {
            format!("No packages of type {} found in the database.", package_type)
        }
        ResolutionStage::VersionFilter => format!(
            "No packages of type {} that match version {} found in the database.",
            package_type,
            version.unwrap_or("<none>")
        ),
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
