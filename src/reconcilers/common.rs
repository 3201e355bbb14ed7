// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lookups shared by the infrastructure, worker and control plane reconcilers.

use k8s_openapi::api::core::v1::{Secret, SecretReference};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::sync::Arc;
use tracing::debug;

use crate::apis::codec::decode_raw;
use crate::apis::helper::find_metal_control_plane;
use crate::apis::metal::{
    CloudProfileConfig, ControlPlaneConfig, InfrastructureConfig, InfrastructureStatus,
    MetalControlPlane, Partition,
};
use crate::constants::SHOOT_ACCESS_SECRET_NAME;
use crate::context::Context;
use crate::errors::{Error, Result};
use crate::gardener::extensions::{Cluster, ClusterContext, Infrastructure};
use crate::gardener::garden::Shoot;
use crate::metal::{Credentials, MetalApi};

/// Load the cluster of a seed namespace.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] if the cluster does not exist
/// and [`Error::InvalidProviderConfig`] if it is malformed.
pub async fn load_cluster(client: &Client, namespace: &str) -> Result<ClusterContext> {
    let clusters: Api<Cluster> = Api::all(client.clone());
    let cluster = clusters.get_opt(namespace).await?.ok_or_else(|| {
        Error::ExternalDependencyUnready(format!("cluster {namespace} does not exist"))
    })?;
    ClusterContext::from_cluster(&cluster)
}

/// Decode the cloud profile's provider config.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if it is missing or malformed.
pub fn cloud_profile_config(cluster: &ClusterContext) -> Result<CloudProfileConfig> {
    decode_raw(cluster.cloud_profile.spec.provider_config.as_ref(), false)?.ok_or_else(|| {
        Error::InvalidProviderConfig("cloud profile has no provider config".to_string())
    })
}

/// Decode the infrastructure config of a shoot.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if it is missing or malformed.
pub fn shoot_infrastructure_config(shoot: &Shoot) -> Result<InfrastructureConfig> {
    decode_raw(shoot.spec.provider.infrastructure_config.as_ref(), false)?.ok_or_else(|| {
        Error::InvalidProviderConfig("shoot has no infrastructure config".to_string())
    })
}

/// Decode the control plane config of a shoot; absent means all defaults.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if it is malformed.
pub fn shoot_control_plane_config(shoot: &Shoot) -> Result<ControlPlaneConfig> {
    Ok(decode_raw(shoot.spec.provider.control_plane_config.as_ref(), false)?.unwrap_or_default())
}

/// The infrastructure provider status recorded on an [`Infrastructure`]
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if it is malformed.
pub fn infrastructure_provider_status(infra: &Infrastructure) -> Result<Option<InfrastructureStatus>> {
    let raw = infra
        .status
        .as_ref()
        .and_then(|s| s.default.provider_status.as_ref());
    decode_raw(raw, false)
}

/// Find the infrastructure of a seed namespace.
///
/// # Errors
///
/// Propagates API errors.
pub async fn find_infrastructure(client: &Client, namespace: &str) -> Result<Option<Infrastructure>> {
    let api: Api<Infrastructure> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;
    Ok(list.items.into_iter().next())
}

/// The node CIDR of a shoot.
///
/// The value recorded in the infrastructure status wins over the shoot spec.
/// Only the infrastructure reconcile, which records it, prefers the spec; see
/// [`crate::reconcilers::infrastructure::desired_node_cidr`].
///
/// # Errors
///
/// Returns [`Error::Transient`] while neither carries a node CIDR.
pub fn node_cidr(infra: Option<&Infrastructure>, shoot: &Shoot) -> Result<String> {
    infra
        .and_then(|i| i.status.as_ref())
        .and_then(|s| s.nodes_cidr.clone())
        .or_else(|| shoot.spec.networking.as_ref().and_then(|n| n.nodes.clone()))
        .filter(|cidr| !cidr.is_empty())
        .ok_or_else(|| {
            Error::transient(
                "resolve node network",
                "node CIDR is neither recorded by the infrastructure nor set in the shoot",
            )
        })
}

/// Read metal credentials from the secret a resource references.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the secret is missing and
/// [`Error::Unauthorized`] if it holds no usable credentials.
pub async fn read_credentials(
    client: &Client,
    secret_ref: &SecretReference,
    default_namespace: &str,
) -> Result<Credentials> {
    let namespace = secret_ref.namespace.as_deref().unwrap_or(default_namespace);
    let name = secret_ref.name.as_deref().unwrap_or_default();
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets
        .get_opt(name)
        .await?
        .ok_or_else(|| Error::not_found("secret", format!("{namespace}/{name}")))?;
    Credentials::from_secret(&secret)
}

/// Secret key holding the shoot kubeconfig
const SECRET_KEY_KUBECONFIG: &str = "kubeconfig";

/// A client for the shoot cluster of a seed namespace.
///
/// The kubeconfig is taken from the shoot access secret the host platform
/// maintains in the namespace.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] while the secret or its
/// kubeconfig is missing and [`Error::Internal`] if the kubeconfig is unusable.
pub async fn shoot_client(client: &Client, namespace: &str) -> Result<Client> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets.get_opt(SHOOT_ACCESS_SECRET_NAME).await?.ok_or_else(|| {
        Error::ExternalDependencyUnready(format!(
            "shoot access secret {namespace}/{SHOOT_ACCESS_SECRET_NAME} does not exist"
        ))
    })?;
    let raw = secret
        .data
        .as_ref()
        .and_then(|d| d.get(SECRET_KEY_KUBECONFIG))
        .ok_or_else(|| {
            Error::ExternalDependencyUnready(format!(
                "shoot access secret {namespace}/{SHOOT_ACCESS_SECRET_NAME} has no kubeconfig"
            ))
        })?;

    let kubeconfig: Kubeconfig = serde_yaml::from_slice(&raw.0)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Internal(format!("shoot kubeconfig of {namespace} is unusable: {e}")))?;
    Client::try_from(config)
        .map_err(|e| Error::Internal(format!("cannot build shoot client for {namespace}: {e}")))
}

/// Everything a reconciler needs to talk to the metal API for one shoot
#[derive(Clone)]
pub struct ProviderSetup {
    /// Decoded infrastructure config of the shoot
    pub infrastructure_config: InfrastructureConfig,
    /// Name of the metal control plane serving the partition
    pub control_plane_name: String,
    /// The metal control plane serving the partition
    pub control_plane: MetalControlPlane,
    /// The shoot's partition
    pub partition: Partition,
    /// Credentials of the shoot's cloud provider secret
    pub credentials: Credentials,
    /// Client for the control plane's endpoint
    pub metal: Arc<dyn MetalApi>,
}

impl std::fmt::Debug for ProviderSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSetup")
            .field("infrastructure_config", &self.infrastructure_config)
            .field("control_plane_name", &self.control_plane_name)
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// Resolve the metal control plane, credentials and client of a shoot.
///
/// # Errors
///
/// Returns an error if a provider config is missing or malformed, the
/// partition is not served by any control plane, or the credentials are unusable.
pub async fn provider_setup(
    ctx: &Context,
    cluster: &ClusterContext,
    secret_ref: &SecretReference,
    namespace: &str,
) -> Result<ProviderSetup> {
    let profile = cloud_profile_config(cluster)?;
    let infrastructure_config = shoot_infrastructure_config(&cluster.shoot)?;
    let (name, control_plane, partition) =
        find_metal_control_plane(&profile, &infrastructure_config.partition_id)?;
    let credentials = read_credentials(&ctx.client, secret_ref, namespace).await?;
    let metal = ctx.metal_client(&control_plane.endpoint, &credentials)?;
    debug!(
        namespace = %namespace,
        control_plane = %name,
        partition = %infrastructure_config.partition_id,
        "resolved metal control plane"
    );
    Ok(ProviderSetup {
        control_plane_name: name.to_string(),
        control_plane: control_plane.clone(),
        partition: partition.clone(),
        infrastructure_config,
        credentials,
        metal,
    })
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod common_tests;
