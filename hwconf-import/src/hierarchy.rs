//! Hierarchical endpoint configuration import
//!
//! The document's endpoint configuration is a four-level tree:
//!
//! ```text
//! endpoint type ─┬─ endpoint ...
//!                └─ cluster ─┬─ command ...
//!                            └─ attribute ...
//! ```
//!
//! Every node needs the row id of its parent, so the tree is walked top-down:
//! a node is written, then all of its children are issued concurrently with
//! the fresh id. Siblings are unordered. Each fan-out is bounded by the
//! configured concurrency limit.

use crate::error::ImportResult;
use crate::fanout::run_all;
use hwconf_common::db::models::{ClusterEntry, EndpointRecord, EndpointTypeRecord};
use hwconf_common::SessionWriter;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::{debug, info, warn};

/// Endpoint type with the endpoints that declared its index
#[derive(Debug, Clone)]
pub struct EndpointTypeNode<'a> {
    pub index: usize,
    pub record: &'a EndpointTypeRecord,
    pub endpoints: Vec<&'a EndpointRecord>,
}

/// Document endpoint configuration grouped into write order
#[derive(Debug, Clone, Default)]
pub struct ImportTree<'a> {
    pub endpoint_types: Vec<EndpointTypeNode<'a>>,
    /// Endpoints whose `endpointTypeIndex` names no endpoint type
    pub orphaned_endpoints: usize,
}

impl<'a> ImportTree<'a> {
    /// Partition endpoints by declared index, keeping their relative order
    pub fn build(endpoint_types: &'a [EndpointTypeRecord], endpoints: &'a [EndpointRecord]) -> Self {
        let mut nodes: Vec<EndpointTypeNode<'a>> = endpoint_types
            .iter()
            .enumerate()
            .map(|(index, record)| EndpointTypeNode {
                index,
                record,
                endpoints: Vec::new(),
            })
            .collect();

        let mut orphaned_endpoints = 0;
        for endpoint in endpoints {
            match nodes.get_mut(endpoint.endpoint_type_index) {
                Some(node) => node.endpoints.push(endpoint),
                None => {
                    warn!(
                        endpoint_type_index = endpoint.endpoint_type_index,
                        endpoint_id = endpoint.endpoint_id,
                        endpoint_types = endpoint_types.len(),
                        "Endpoint references a missing endpoint type, skipping it"
                    );
                    orphaned_endpoints += 1;
                }
            }
        }

        Self {
            endpoint_types: nodes,
            orphaned_endpoints,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoint_types.is_empty()
    }
}

/// Rows written by one hierarchy import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyStats {
    pub endpoint_types: usize,
    pub endpoints: usize,
    pub clusters: usize,
    pub commands: usize,
    pub attributes: usize,
}

impl AddAssign for HierarchyStats {
    fn add_assign(&mut self, other: Self) {
        self.endpoint_types += other.endpoint_types;
        self.endpoints += other.endpoints;
        self.clusters += other.clusters;
        self.commands += other.commands;
        self.attributes += other.attributes;
    }
}

fn total(parts: Vec<HierarchyStats>) -> HierarchyStats {
    parts.into_iter().fold(HierarchyStats::default(), |mut acc, part| {
        acc += part;
        acc
    })
}

/// Tree-walking writer for one session and primary package
pub struct HierarchyImporter<'a, S: ?Sized> {
    store: &'a S,
    session_id: i64,
    package_id: i64,
    max_fan_out: usize,
}

impl<'a, S> HierarchyImporter<'a, S>
where
    S: SessionWriter + ?Sized,
{
    pub fn new(store: &'a S, session_id: i64, package_id: i64, max_fan_out: usize) -> Self {
        Self {
            store,
            session_id,
            package_id,
            max_fan_out: max_fan_out.max(1),
        }
    }

    /// Write the whole tree; the first failure is returned once every issued
    /// write has settled
    pub async fn import(&self, tree: &ImportTree<'_>) -> ImportResult<HierarchyStats> {
        info!(
            session_id = self.session_id,
            package_id = self.package_id,
            endpoint_types = tree.endpoint_types.len(),
            "Importing endpoint configuration"
        );

        let subtrees = tree
            .endpoint_types
            .iter()
            .map(|node| self.import_endpoint_type(node));
        let stats = total(run_all(subtrees, self.max_fan_out).await?);

        info!(
            session_id = self.session_id,
            endpoint_types = stats.endpoint_types,
            endpoints = stats.endpoints,
            clusters = stats.clusters,
            commands = stats.commands,
            attributes = stats.attributes,
            "Endpoint configuration imported"
        );
        Ok(stats)
    }

    async fn import_endpoint_type(&self, node: &EndpointTypeNode<'_>) -> ImportResult<HierarchyStats> {
        let endpoint_type_id = self
            .store
            .insert_endpoint_type(self.session_id, self.package_id, node.record)
            .await?;
        debug!(index = node.index, endpoint_type_id, "Endpoint type written");

        let endpoints = node.endpoints.iter().map(|&endpoint| async move {
            self.store
                .insert_endpoint(self.session_id, endpoint_type_id, endpoint)
                .await?;
            Ok(())
        });
        let clusters = node
            .record
            .clusters
            .iter()
            .map(|cluster| self.import_cluster(endpoint_type_id, cluster));

        let (endpoints, clusters) = futures::join!(
            run_all(endpoints, self.max_fan_out),
            run_all(clusters, self.max_fan_out),
        );
        let endpoints = endpoints?;
        let clusters = clusters?;

        let mut stats = total(clusters);
        stats.endpoint_types += 1;
        stats.endpoints += endpoints.len();
        Ok(stats)
    }

    async fn import_cluster(&self, endpoint_type_id: i64, cluster: &ClusterEntry) -> ImportResult<HierarchyStats> {
        let cluster_id = self
            .store
            .insert_endpoint_type_cluster(self.package_id, endpoint_type_id, cluster)
            .await?;
        debug!(endpoint_type_id, cluster_id, code = cluster.code, "Cluster written");

        let commands = cluster.commands.iter().map(|command| async move {
            self.store
                .insert_endpoint_type_command(self.package_id, endpoint_type_id, cluster_id, cluster.code, command)
                .await?;
            Ok(())
        });
        let attributes = cluster.attributes.iter().map(|attribute| async move {
            self.store
                .insert_endpoint_type_attribute(
                    self.package_id,
                    endpoint_type_id,
                    cluster_id,
                    cluster.code,
                    attribute,
                )
                .await?;
            Ok(())
        });

        let (commands, attributes) = futures::join!(
            run_all(commands, self.max_fan_out),
            run_all(attributes, self.max_fan_out),
        );
        let commands = commands?;
        let attributes = attributes?;

        Ok(HierarchyStats {
            clusters: 1,
            commands: commands.len(),
            attributes: attributes.len(),
            ..Default::default()
        })
    }
}
