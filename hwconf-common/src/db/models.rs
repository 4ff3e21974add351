//! Database models and persisted-document records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Packages
// ============================================================================

/// Package type as stored in the `package` table
///
/// `zcl-properties` is the primary package of a session, `gen-templates-json`
/// the secondary (generation templates) one. Every other type string is kept
/// verbatim and treated as optional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PackageType {
    ZclProperties,
    GenTemplatesJson,
    Other(String),
}

impl PackageType {
    pub fn as_str(&self) -> &str {
        match self {
            PackageType::ZclProperties => "zcl-properties",
            PackageType::GenTemplatesJson => "gen-templates-json",
            PackageType::Other(s) => s,
        }
    }

    /// Packages of this type may fail to resolve without failing the import
    pub fn is_survivable(&self) -> bool {
        matches!(self, PackageType::GenTemplatesJson)
    }
}

impl From<&str> for PackageType {
    fn from(s: &str) -> Self {
        match s {
            "zcl-properties" => PackageType::ZclProperties,
            "gen-templates-json" => PackageType::GenTemplatesJson,
            other => PackageType::Other(other.to_string()),
        }
    }
}

impl From<String> for PackageType {
    fn from(s: String) -> Self {
        PackageType::from(s.as_str())
    }
}

impl From<PackageType> for String {
    fn from(t: PackageType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installed package row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: i64,
    pub path: String,
    pub package_type: PackageType,
    pub version: Option<String>,
    pub description: Option<String>,
}

// ============================================================================
// Atomic types
// ============================================================================

/// Atomic type descriptor from the `atomic` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AtomicType {
    pub id: i64,
    pub identifier: i64,
    pub name: String,
    pub description: Option<String>,
    pub size: Option<i64>,
    pub is_discrete: bool,
    pub is_string: bool,
    pub is_long: bool,
    pub is_char: bool,
    pub is_signed: bool,
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub session_key: String,
    pub created_at: DateTime<Utc>,
    pub dirty: bool,
}

/// Well-known session key-value keys
pub mod session_key {
    /// Path of the document a session was loaded from
    pub const FILE_PATH: &str = "filePath";
}

// ============================================================================
// Persisted-document records
// ============================================================================

/// Declared package reference as written in a project document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_relativity: Option<String>,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Endpoint type: the configuration template endpoints are stamped from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointTypeRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub device_type_code: Option<i64>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub device_type_profile_id: Option<i64>,
    #[serde(default)]
    pub clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    pub endpoint_type_index: usize,
    #[serde(default, deserialize_with = "codes::optional")]
    pub endpoint_id: Option<i64>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub network_id: Option<i64>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub profile_id: Option<i64>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub device_identifier: Option<i64>,
    #[serde(default, deserialize_with = "codes::optional")]
    pub endpoint_version: Option<i64>,
}

/// Cluster selected on an endpoint type. Missing `commands` / `attributes`
/// deserialize as empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    #[serde(deserialize_with = "codes::required")]
    pub code: i64,
    #[serde(default, deserialize_with = "codes::optional")]
    pub mfg_code: Option<i64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    #[serde(deserialize_with = "codes::required")]
    pub code: i64,
    #[serde(default, deserialize_with = "codes::optional")]
    pub mfg_code: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "flags::lenient")]
    pub incoming: bool,
    #[serde(default, deserialize_with = "flags::lenient")]
    pub outgoing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEntry {
    #[serde(deserialize_with = "codes::required")]
    pub code: i64,
    #[serde(default, deserialize_with = "codes::optional")]
    pub mfg_code: Option<i64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default = "default_true", deserialize_with = "flags::lenient")]
    pub included: bool,
    #[serde(default)]
    pub storage_option: Option<String>,
    #[serde(default, deserialize_with = "flags::lenient")]
    pub singleton: bool,
    #[serde(default, deserialize_with = "flags::lenient")]
    pub bounded: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default, deserialize_with = "flags::lenient")]
    pub reportable: bool,
    #[serde(default)]
    pub min_interval: Option<i64>,
    #[serde(default)]
    pub max_interval: Option<i64>,
    #[serde(default)]
    pub reportable_change: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// Numeric codes appear as JSON numbers, hex strings ("0x0006") or decimal strings
pub mod codes {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCode {
        Number(i64),
        Text(String),
    }

    pub fn parse(text: &str) -> Option<i64> {
        let text = text.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        }
    }

    fn convert<E: serde::de::Error>(raw: RawCode) -> Result<i64, E> {
        match raw {
            RawCode::Number(n) => Ok(n),
            RawCode::Text(s) => {
                parse(&s).ok_or_else(|| E::custom(format!("invalid numeric code: {:?}", s)))
            }
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        convert(RawCode::deserialize(d)?)
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<RawCode>::deserialize(d)? {
            Some(raw) => convert(raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Booleans written either as `true`/`false` or as `1`/`0`
pub mod flags {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Number(i64),
    }

    pub fn lenient<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<RawFlag>::deserialize(d)? {
            Some(RawFlag::Bool(b)) => b,
            Some(RawFlag::Number(n)) => n != 0,
            None => false,
        })
    }
}
