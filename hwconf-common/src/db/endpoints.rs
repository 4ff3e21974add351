//! Endpoint configuration writes
//!
//! Endpoint types, endpoints and the clusters, commands and attributes selected
//! on them. Declared codes are stored as-is; the reference to the matching
//! definition row of the package is resolved in the same statement and left
//! NULL when the package does not define the code.

use super::models::{
    AttributeEntry, ClusterEntry, CommandEntry, EndpointRecord, EndpointTypeRecord,
};
use crate::Result;
use sqlx::SqlitePool;

pub async fn insert_endpoint_type(
    pool: &SqlitePool,
    session_id: i64,
    package_id: i64,
    record: &EndpointTypeRecord,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO endpoint_type (session_ref, name, device_type_ref)
        VALUES (
            ?,
            ?,
            (SELECT id FROM device_type
             WHERE package_ref = ? AND code = ? AND (? IS NULL OR profile_id = ?)
             ORDER BY id LIMIT 1)
        )
        "#,
    )
    .bind(session_id)
    .bind(&record.name)
    .bind(package_id)
    .bind(record.device_type_code)
    .bind(record.device_type_profile_id)
    .bind(record.device_type_profile_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_endpoint(
    pool: &SqlitePool,
    session_id: i64,
    endpoint_type_id: i64,
    record: &EndpointRecord,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO endpoint (
            session_ref, endpoint_type_ref, endpoint_identifier, network_identifier,
            profile, device_identifier, device_version
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id)
    .bind(endpoint_type_id)
    .bind(record.endpoint_id)
    .bind(record.network_id)
    .bind(record.profile_id)
    .bind(record.device_identifier)
    .bind(record.endpoint_version)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_endpoint_type_cluster(
    pool: &SqlitePool,
    package_id: i64,
    endpoint_type_id: i64,
    cluster: &ClusterEntry,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO endpoint_type_cluster (
            endpoint_type_ref, cluster_ref, cluster_code, manufacturer_code, side, enabled
        ) VALUES (
            ?,
            (SELECT id FROM cluster
             WHERE package_ref = ? AND code = ? AND manufacturer_code IS ?
             ORDER BY id LIMIT 1),
            ?, ?, ?, ?
        )
        "#,
    )
    .bind(endpoint_type_id)
    .bind(package_id)
    .bind(cluster.code)
    .bind(cluster.mfg_code)
    .bind(cluster.code)
    .bind(cluster.mfg_code)
    .bind(&cluster.side)
    .bind(cluster.enabled)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_endpoint_type_command(
    pool: &SqlitePool,
    package_id: i64,
    endpoint_type_id: i64,
    endpoint_type_cluster_id: i64,
    cluster_code: i64,
    command: &CommandEntry,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO endpoint_type_command (
            endpoint_type_ref, endpoint_type_cluster_ref, command_ref, command_code,
            manufacturer_code, source, incoming, outgoing
        ) VALUES (
            ?, ?,
            (SELECT cmd.id FROM command cmd
             JOIN cluster c ON cmd.cluster_ref = c.id
             WHERE cmd.package_ref = ? AND c.code = ? AND cmd.code = ?
               AND cmd.manufacturer_code IS ?
               AND (? IS NULL OR cmd.source = ?)
             ORDER BY cmd.id LIMIT 1),
            ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(endpoint_type_id)
    .bind(endpoint_type_cluster_id)
    .bind(package_id)
    .bind(cluster_code)
    .bind(command.code)
    .bind(command.mfg_code)
    .bind(&command.source)
    .bind(&command.source)
    .bind(command.code)
    .bind(command.mfg_code)
    .bind(&command.source)
    .bind(command.incoming)
    .bind(command.outgoing)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_endpoint_type_attribute(
    pool: &SqlitePool,
    package_id: i64,
    endpoint_type_id: i64,
    endpoint_type_cluster_id: i64,
    cluster_code: i64,
    attribute: &AttributeEntry,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO endpoint_type_attribute (
            endpoint_type_ref, endpoint_type_cluster_ref, attribute_ref, attribute_code,
            manufacturer_code, side, included, storage_option, singleton, bounded,
            default_value, reportable, min_interval, max_interval, reportable_change
        ) VALUES (
            ?, ?,
            (SELECT a.id FROM attribute a
             JOIN cluster c ON a.cluster_ref = c.id
             WHERE a.package_ref = ? AND c.code = ? AND a.code = ?
               AND a.manufacturer_code IS ?
               AND (? IS NULL OR a.side = ?)
             ORDER BY a.id LIMIT 1),
            ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(endpoint_type_id)
    .bind(endpoint_type_cluster_id)
    .bind(package_id)
    .bind(cluster_code)
    .bind(attribute.code)
    .bind(attribute.mfg_code)
    .bind(&attribute.side)
    .bind(&attribute.side)
    .bind(attribute.code)
    .bind(attribute.mfg_code)
    .bind(&attribute.side)
    .bind(attribute.included)
    .bind(&attribute.storage_option)
    .bind(attribute.singleton)
    .bind(attribute.bounded)
    .bind(&attribute.default_value)
    .bind(attribute.reportable)
    .bind(attribute.min_interval)
    .bind(attribute.max_interval)
    .bind(attribute.reportable_change)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Row counts of one session's endpoint configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointConfigCounts {
    pub endpoint_types: i64,
    pub endpoints: i64,
    pub clusters: i64,
    pub commands: i64,
    pub attributes: i64,
}

pub async fn count_session_config(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<EndpointConfigCounts> {
    let (endpoint_types, endpoints, clusters, commands, attributes): (i64, i64, i64, i64, i64) =
        sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM endpoint_type WHERE session_ref = ?1),
                (SELECT COUNT(*) FROM endpoint WHERE session_ref = ?1),
                (SELECT COUNT(*) FROM endpoint_type_cluster etc
                 JOIN endpoint_type et ON etc.endpoint_type_ref = et.id
                 WHERE et.session_ref = ?1),
                (SELECT COUNT(*) FROM endpoint_type_command etcmd
                 JOIN endpoint_type et ON etcmd.endpoint_type_ref = et.id
                 WHERE et.session_ref = ?1),
                (SELECT COUNT(*) FROM endpoint_type_attribute eta
                 JOIN endpoint_type et ON eta.endpoint_type_ref = et.id
                 WHERE et.session_ref = ?1)
            "#,
        )
        .bind(session_id)
        .fetch_one(pool)
        .await?;

    Ok(EndpointConfigCounts {
        endpoint_types,
        endpoints,
        clusters,
        commands,
        attributes,
    })
}
