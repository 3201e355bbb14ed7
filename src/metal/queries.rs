// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Higher-level metal API queries shared by the reconcilers.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::types::{
    FirewallFindRequest, IpFindRequest, IpUpdateRequest, Machine, Network,
    NetworkAllocateRequest, NetworkFindRequest,
};
use super::MetalApi;
use crate::errors::{Error, Result};
use crate::labels::{cluster_id_of_tag, cluster_id_tag, IP_TYPE_EPHEMERAL, TAG_CLUSTER_ID};
use crate::metrics::{record_resource_created, record_resource_deleted};

/// Find the private network of a shoot by project and node CIDR.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no network matches and [`Error::Internal`]
/// if more than one does.
pub async fn get_private_network_from_node_network(
    api: &dyn MetalApi,
    project_id: &str,
    node_cidr: &str,
) -> Result<Network> {
    let mut networks = api
        .find_networks(&NetworkFindRequest {
            projectid: Some(project_id.to_string()),
            prefixes: vec![node_cidr.to_string()],
            ..Default::default()
        })
        .await?;

    match networks.len() {
        0 => Err(Error::not_found(
            "private network",
            format!("{project_id}/{node_cidr}"),
        )),
        1 => Ok(networks.remove(0)),
        n => Err(Error::Internal(format!(
            "found {n} private networks for project {project_id} and node network {node_cidr}, expected exactly one"
        ))),
    }
}

/// Find the firewall of a cluster.
///
/// # Errors
///
/// Returns [`Error::Conflict`] if more than one firewall is tagged with the cluster.
pub async fn find_cluster_firewall(
    api: &dyn MetalApi,
    project_id: &str,
    cluster_id: &str,
) -> Result<Option<Machine>> {
    let mut firewalls = api
        .find_firewalls(&FirewallFindRequest {
            allocation_project: Some(project_id.to_string()),
            tags: vec![cluster_id_tag(cluster_id)],
        })
        .await?;

    match firewalls.len() {
        0 => Ok(None),
        1 => Ok(Some(firewalls.remove(0))),
        n => Err(Error::Conflict(format!(
            "found {n} firewalls of cluster {cluster_id} in project {project_id}, expected at most one"
        ))),
    }
}

/// Find the private network previously allocated for a cluster.
///
/// Allocated networks carry the cluster id label, so an allocation whose node
/// CIDR never reached the infrastructure status is found again here.
///
/// # Errors
///
/// Returns [`Error::Internal`] if more than one network carries the label.
pub async fn find_cluster_private_network(
    api: &dyn MetalApi,
    project_id: &str,
    partition_id: &str,
    cluster_id: &str,
) -> Result<Option<Network>> {
    let mut networks: Vec<Network> = api
        .find_networks(&NetworkFindRequest {
            projectid: Some(project_id.to_string()),
            partitionid: Some(partition_id.to_string()),
            labels: BTreeMap::from([(TAG_CLUSTER_ID.to_string(), cluster_id.to_string())]),
            ..Default::default()
        })
        .await?
        .into_iter()
        .filter(|n| n.project() == project_id && n.labels.get(TAG_CLUSTER_ID).map(String::as_str) == Some(cluster_id))
        .collect();

    match networks.len() {
        0 => Ok(None),
        1 => Ok(Some(networks.remove(0))),
        n => Err(Error::Internal(format!(
            "found {n} private networks of cluster {cluster_id} in project {project_id}, expected at most one"
        ))),
    }
}

/// Allocate a private network for a shoot from the partition's private super network.
///
/// # Errors
///
/// Propagates metal API errors.
pub async fn allocate_private_network(
    api: &dyn MetalApi,
    project_id: &str,
    partition_id: &str,
    name: &str,
    cluster_id: &str,
) -> Result<Network> {
    let network = api
        .allocate_network(&NetworkAllocateRequest {
            projectid: project_id.to_string(),
            partitionid: partition_id.to_string(),
            name: name.to_string(),
            description: format!("private network of shoot {name}"),
            labels: BTreeMap::from([(TAG_CLUSTER_ID.to_string(), cluster_id.to_string())]),
        })
        .await?;
    record_resource_created("Network");
    info!(network = %network.id, project = %project_id, partition = %partition_id, "allocated private network");
    Ok(network)
}

/// Outcome of [`release_ephemeral_ips`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IpCleanup {
    /// Addresses released back to the network
    pub freed: Vec<String>,
    /// Addresses still used by other clusters that had this cluster's tags removed
    pub untagged: Vec<String>,
}

/// Release the ephemeral IPs of a cluster.
///
/// IPs referenced only by this cluster are freed; IPs shared with other
/// clusters keep their other tags and lose the ones pointing at this cluster.
///
/// # Errors
///
/// Propagates metal API errors.
pub async fn release_ephemeral_ips(
    api: &dyn MetalApi,
    project_id: &str,
    cluster_id: &str,
) -> Result<IpCleanup> {
    let ips = api
        .find_ips(&IpFindRequest {
            projectid: Some(project_id.to_string()),
            ip_type: Some(IP_TYPE_EPHEMERAL.to_string()),
        })
        .await?;

    let mut cleanup = IpCleanup::default();
    for ip in ips {
        let owners: Vec<&str> = ip.tags.iter().filter_map(|t| cluster_id_of_tag(t)).collect();
        if !owners.contains(&cluster_id) {
            continue;
        }

        if owners.iter().all(|owner| *owner == cluster_id) {
            debug!(ip = %ip.ipaddress, "freeing ephemeral ip");
            api.free_ip(&ip.ipaddress).await?;
            record_resource_deleted("IP");
            cleanup.freed.push(ip.ipaddress);
            continue;
        }

        let tags: Vec<String> = ip
            .tags
            .iter()
            .filter(|t| cluster_id_of_tag(t) != Some(cluster_id))
            .cloned()
            .collect();
        debug!(ip = %ip.ipaddress, "removing cluster tags from shared ephemeral ip");
        api.update_ip(&IpUpdateRequest {
            ipaddress: ip.ipaddress.clone(),
            ip_type: ip.ip_type.clone(),
            tags,
            name: ip.name.clone(),
            description: ip.description.clone(),
        })
        .await?;
        cleanup.untagged.push(ip.ipaddress);
    }

    Ok(cleanup)
}

/// Free every network of `project_id` whose prefixes are exactly `[node_cidr]`.
///
/// # Errors
///
/// Propagates metal API errors.
pub async fn delete_private_networks(
    api: &dyn MetalApi,
    project_id: &str,
    node_cidr: &str,
) -> Result<usize> {
    let networks = api
        .find_networks(&NetworkFindRequest {
            projectid: Some(project_id.to_string()),
            prefixes: vec![node_cidr.to_string()],
            ..Default::default()
        })
        .await?;

    let mut deleted = 0;
    for network in networks
        .iter()
        .filter(|n| n.project() == project_id && n.prefixes == [node_cidr])
    {
        api.free_network(&network.id).await?;
        record_resource_deleted("Network");
        info!(network = %network.id, "released private network");
        deleted += 1;
    }
    Ok(deleted)
}

/// Fetch networks by id.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if one of the ids does not exist.
pub async fn networks_by_id(
    api: &dyn MetalApi,
    ids: &[String],
) -> Result<BTreeMap<String, Network>> {
    let mut networks = BTreeMap::new();
    for id in ids {
        if networks.contains_key(id) {
            continue;
        }
        let network = api.get_network(id).await?;
        networks.insert(id.clone(), network);
    }
    Ok(networks)
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod queries_tests;
