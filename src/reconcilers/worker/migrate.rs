// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Release a shoot's firewall resources on the seed it leaves.
//!
//! The resources are shallow-deleted: finalizers are dropped and the delete
//! orphans all children, so the firewall machines keep running until the
//! firewall-controller-manager on the new seed adopts them.

use kube::api::ListParams;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

use crate::errors::{Error, Result};
use crate::fcm::{Firewall, FirewallDeployment, FirewallSet};
use crate::gardener::extensions::Infrastructure;
use crate::reconcilers::finalizers::remove_all_finalizers;
use crate::reconcilers::resources::{delete_if_exists, orphan_delete_params};
use crate::reconcilers::status::patch_status;

/// Shallow-delete every object of a kind in a namespace.
///
/// Returns the number of deleted objects.
///
/// # Errors
///
/// Propagates API errors.
pub async fn shallow_delete_all<T>(client: &Client, namespace: &str) -> Result<usize>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let mut deleted = 0;
    for object in api.list(&ListParams::default()).await?.items {
        remove_all_finalizers(client, &object).await?;
        if delete_if_exists::<T>(client, namespace, &object.name_any(), &orphan_delete_params()).await? {
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// Hand the firewall resources of a namespace over to the new seed.
///
/// The node CIDR is written back to the infrastructure status first so the
/// new seed finds it without the shoot spec.
///
/// # Errors
///
/// Returns [`Error::Transient`] if the infrastructure carries no node CIDR
/// and propagates API errors.
pub async fn migrate_firewalls(client: &Client, infra: &Infrastructure) -> Result<()> {
    let namespace = infra.namespace().unwrap_or_default();
    let node_cidr = infra
        .status
        .as_ref()
        .and_then(|s| s.nodes_cidr.clone())
        .ok_or_else(|| {
            Error::transient(
                "migrate firewalls",
                format!("infrastructure of {namespace} has no node CIDR yet"),
            )
        })?;
    patch_status(client, infra, &json!({ "nodesCIDR": node_cidr })).await?;

    let firewalls: Api<Firewall> = Api::namespaced(client.clone(), &namespace);
    if firewalls.list(&ListParams::default()).await?.items.is_empty() {
        info!(namespace = %namespace, "no firewalls to migrate");
        return Ok(());
    }

    let deployments = shallow_delete_all::<FirewallDeployment>(client, &namespace).await?;
    let sets = shallow_delete_all::<FirewallSet>(client, &namespace).await?;
    let firewalls = shallow_delete_all::<Firewall>(client, &namespace).await?;
    info!(
        namespace = %namespace,
        deployments,
        sets,
        firewalls,
        "released firewall resources for migration"
    );
    Ok(())
}
