// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Network lookups of the control plane values.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{ControllerConfig, DurosSeedConfig};
use crate::errors::{Error, Result};
use crate::labels::{NETWORK_LABEL_DEFAULT_EXTERNAL, NETWORK_LABEL_PARTITION_STORAGE};
use crate::metal::{MetalApi, Network};

/// Check that a user selected network may serve as default external network.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the network belongs to another
/// project, is an underlay or is a private super network.
pub fn check_default_external_network(network: &Network, project_id: &str) -> Result<()> {
    let project = network.project();
    if !project.is_empty() && project != project_id {
        return Err(Error::InvalidProviderConfig(format!(
            "default external network {} belongs to another project",
            network.id
        )));
    }
    if network.underlay {
        return Err(Error::InvalidProviderConfig(format!(
            "default external network {} is an underlay network",
            network.id
        )));
    }
    if network.privatesuper {
        return Err(Error::InvalidProviderConfig(format!(
            "default external network {} is a private super network",
            network.id
        )));
    }
    Ok(())
}

/// Resolve the network the cloud controller manager allocates service IPs in.
///
/// A user selection is verified against the metal API. Otherwise the first
/// firewall network labelled `network.default-external` wins.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the selection is not usable or
/// no firewall network carries the label, and propagates metal API errors.
pub async fn default_external_network(
    api: &dyn MetalApi,
    selected: Option<&str>,
    project_id: &str,
    firewall_networks: &[String],
    networks: &BTreeMap<String, Network>,
) -> Result<String> {
    if let Some(id) = selected.filter(|id| !id.is_empty()) {
        let network = match networks.get(id) {
            Some(network) => network.clone(),
            None => api.get_network(id).await.map_err(|e| match e {
                Error::NotFound { .. } => Error::InvalidProviderConfig(format!(
                    "default external network {id} does not exist"
                )),
                other => other,
            })?,
        };
        check_default_external_network(&network, project_id)?;
        return Ok(network.id);
    }

    let found = firewall_networks
        .iter()
        .filter_map(|id| networks.get(id))
        .find(|n| n.has_label(NETWORK_LABEL_DEFAULT_EXTERNAL))
        .ok_or_else(|| {
            Error::InvalidProviderConfig(
                "none of the firewall networks is labelled as default external network".to_string(),
            )
        })?;
    debug!(network = %found.id, "picked default external network");
    Ok(found.id.clone())
}

/// `true` if one of `networks` is the storage network of `partition`
#[must_use]
pub fn has_storage_network(networks: &BTreeMap<String, Network>, partition: &str) -> bool {
    networks
        .values()
        .any(|n| n.has_label(NETWORK_LABEL_PARTITION_STORAGE) && n.partition() == partition)
}

/// Duros configuration for a shoot, if it gets storage.
///
/// Storage needs duros enabled, the seed listed in the duros seed table and
/// a storage network in the shoot's partition among the firewall networks.
#[must_use]
pub fn storage_seed_config<'a>(
    config: &'a ControllerConfig,
    seed: &str,
    networks: &BTreeMap<String, Network>,
    partition: &str,
) -> Option<&'a DurosSeedConfig> {
    let duros = &config.storage.duros;
    if !duros.enabled {
        return None;
    }
    let seed_config = duros.seed_config.get(seed)?;
    has_storage_network(networks, partition).then_some(seed_config)
}

#[cfg(test)]
#[path = "networks_tests.rs"]
mod networks_tests;
