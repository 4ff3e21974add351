//! Project document loading
//!
//! A project document is JSON. Its feature level is checked against the range
//! this build supports before the rest of the document is interpreted, since a
//! newer tool may have changed the shape. The normalized document always
//! carries the originating file path as a key-value pair.

use crate::error::{ImportError, ImportResult};
use hwconf_common::db::models::{
    session_key, EndpointRecord, EndpointTypeRecord, KeyValuePair, PackageRef,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Feature levels this build can import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLevelRange(RangeInclusive<u32>);

impl FeatureLevelRange {
    /// Everything from the oldest documents up to `max`
    pub fn up_to(max: u32) -> Self {
        Self(0..=max)
    }

    pub fn check(&self, level: u32) -> ImportResult<()> {
        if self.0.contains(&level) {
            Ok(())
        } else {
            Err(ImportError::VersionIncompatibility {
                required: level,
                supported: *self.0.end(),
            })
        }
    }
}

/// Wire shape of a project document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default)]
    pub feature_level: u32,
    #[serde(rename = "package")]
    pub packages: Vec<PackageRef>,
    #[serde(default)]
    pub key_value_pairs: Vec<KeyValuePair>,
    #[serde(default)]
    pub endpoint_types: Vec<EndpointTypeRecord>,
    #[serde(default)]
    pub endpoints: Vec<EndpointRecord>,
}

/// Validated document handed to the orchestrator
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    /// Anchor for package paths declared relative to the document
    pub file_path: PathBuf,
    pub feature_level: u32,
    pub packages: Vec<PackageRef>,
    pub key_value_pairs: Vec<KeyValuePair>,
    pub endpoint_types: Vec<EndpointTypeRecord>,
    pub endpoints: Vec<EndpointRecord>,
}

impl NormalizedDocument {
    fn from_document(file_path: &Path, document: ProjectDocument) -> Self {
        let mut key_value_pairs = document.key_value_pairs;
        key_value_pairs.push(KeyValuePair {
            key: session_key::FILE_PATH.to_string(),
            value: file_path.to_string_lossy().into_owned(),
        });

        Self {
            file_path: file_path.to_path_buf(),
            feature_level: document.feature_level,
            packages: document.packages,
            key_value_pairs,
            endpoint_types: document.endpoint_types,
            endpoints: document.endpoints,
        }
    }
}

/// Validate and normalize the raw text of a document read from `file_path`
pub fn parse_document(
    file_path: &Path,
    raw: &str,
    supported_feature_level: u32,
) -> ImportResult<NormalizedDocument> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let feature_level = match value.get("featureLevel") {
        None | Some(serde_json::Value::Null) => 0,
        Some(level) => u32::deserialize(level)?,
    };
    FeatureLevelRange::up_to(supported_feature_level).check(feature_level)?;

    let document: ProjectDocument = serde_json::from_value(value)?;
    debug!(
        packages = document.packages.len(),
        endpoint_types = document.endpoint_types.len(),
        endpoints = document.endpoints.len(),
        feature_level,
        "Document parsed"
    );
    Ok(NormalizedDocument::from_document(file_path, document))
}

/// Read a document from disk and parse it
pub async fn load_document_file(path: &Path, supported_feature_level: u32) -> ImportResult<NormalizedDocument> {
    info!(path = %path.display(), "Loading project document");
    let raw = tokio::fs::read_to_string(path).await?;
    parse_document(path, &raw, supported_feature_level)
}
