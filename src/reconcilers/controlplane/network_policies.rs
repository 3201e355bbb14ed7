// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Seed egress policies of the control plane add-ons.
//!
//! The policies live in the `firewall` namespace of the seed and are shared
//! by all shoots of the seed.

use kube::Client;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

use crate::constants::{
    ACCOUNTING_NETWORK_POLICY_NAME, ACCOUNTING_SINK_PORT, FIELD_MANAGER, FIREWALL_NAMESPACE,
    STORAGE_NETWORK_POLICY_NAME, STORAGE_PORTS,
};
use crate::errors::{Error, Result};
use crate::fcm::ClusterwideNetworkPolicy;
use crate::reconcilers::resources::create_or_apply;

/// Egress to the accounting sink
#[must_use]
pub fn accounting_policy() -> ClusterwideNetworkPolicy {
    ClusterwideNetworkPolicy::allow_tcp_egress(
        ACCOUNTING_NETWORK_POLICY_NAME,
        FIREWALL_NAMESPACE,
        &["0.0.0.0/0".to_string()],
        &[ACCOUNTING_SINK_PORT],
    )
}

/// Host CIDR of a storage endpoint given as `ip` or `ip:port`
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the endpoint holds no IP address.
pub fn endpoint_cidr(endpoint: &str) -> Result<String> {
    let ip = endpoint
        .parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| endpoint.parse::<IpAddr>())
        .map_err(|_| {
            Error::InvalidProviderConfig(format!("storage endpoint {endpoint} is not an IP address"))
        })?;
    Ok(match ip {
        IpAddr::V4(ip) => format!("{ip}/32"),
        IpAddr::V6(ip) => format!("{ip}/128"),
    })
}

/// Egress to the storage endpoints of the seed
///
/// # Errors
///
/// See [`endpoint_cidr`].
pub fn storage_policy(endpoints: &[String]) -> Result<ClusterwideNetworkPolicy> {
    let cidrs = endpoints
        .iter()
        .map(|e| endpoint_cidr(e))
        .collect::<Result<Vec<_>>>()?;
    Ok(ClusterwideNetworkPolicy::allow_tcp_egress(
        STORAGE_NETWORK_POLICY_NAME,
        FIREWALL_NAMESPACE,
        &cidrs,
        &STORAGE_PORTS,
    ))
}

/// Apply a policy to the seed.
///
/// # Errors
///
/// Propagates API errors.
pub async fn ensure_policy(client: &Client, policy: &ClusterwideNetworkPolicy) -> Result<()> {
    create_or_apply(client, FIREWALL_NAMESPACE, policy, FIELD_MANAGER).await?;
    debug!(
        policy = policy.metadata.name.as_deref().unwrap_or_default(),
        "ensured seed egress policy"
    );
    Ok(())
}

#[cfg(test)]
#[path = "network_policies_tests.rs"]
mod network_policies_tests;
