// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Infrastructure reconciler.
//!
//! Owns the private network and the firewall machine of a shoot:
//!
//! - **Reconcile**: resolve (or allocate) the private network for the node
//!   CIDR, allocate the firewall once and follow its allocation until it
//!   succeeds. The machine id and the node CIDR are recorded in status.
//! - **Delete**: free the firewall, release the cluster's ephemeral IPs and
//!   the private network.
//! - **Migrate**: release the machine-controller finalizer of machine class
//!   secrets so the namespace can be deleted on the old seed.
//! - **Restore**: nothing to do here; the worker reconciler rebuilds the
//!   firewall resources.

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ListParams;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, Resource, ResourceExt};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::apis::codec::encode_value;
use crate::apis::helper::{decode_machine_id, encode_machine_id};
use crate::apis::metal::{FirewallStatus, InfrastructureConfig, InfrastructureStatus};
use crate::constants::{
    FIREWALL_ALLOCATION_ATTEMPTS, FIREWALL_ALLOCATION_REQUEUE_SECS, FIREWALL_ALLOCATION_RETRY_SECS,
    FIREWALL_NAME_SUFFIX_LEN,
};
use crate::context::{cached_private_network, Context, NetworkCache};
use crate::errors::{Error, Result};
use crate::gardener::extensions::{ClusterContext, Infrastructure};
use crate::labels::{
    cluster_id_tag, FINALIZER_MACHINE_CONTROLLER, LABEL_PURPOSE, PURPOSE_MACHINE_CLASS,
    TAG_CLUSTER_NAME, TAG_CLUSTER_PROJECT,
};
use crate::metal::queries::{
    allocate_private_network, delete_private_networks, find_cluster_firewall,
    find_cluster_private_network, release_ephemeral_ips,
};
use crate::metal::types::MachineAllocationNetwork;
use crate::metal::{FirewallCreateRequest, MetalApi, Network};
use crate::metrics::record_resource_created;
use crate::reconcilers::common::{infrastructure_provider_status, provider_setup};
use crate::reconcilers::finalizers::{has_finalizer, remove_finalizer};
use crate::reconcilers::operation::{error_policy, run, Actuator, Outcome};
use crate::reconcilers::retry::retry_fixed;
use crate::reconcilers::status::patch_status;

/// Actuator of [`Infrastructure`] resources
#[derive(Clone, Copy, Debug, Default)]
pub struct InfrastructureActuator;

/// Generate a firewall name: `<technical-id>-firewall-<5 random chars>`
#[must_use]
pub fn firewall_name(technical_id: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FIREWALL_NAME_SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{technical_id}-firewall-{suffix}")
}

/// Build the allocation request of a shoot's firewall.
///
/// The private network is auto-acquired; every configured firewall network
/// is attached as well.
#[must_use]
pub fn firewall_create_request(
    name: &str,
    config: &InfrastructureConfig,
    private_network: &Network,
    cluster_id: &str,
    cluster_name: &str,
    ssh_public_key: Option<&str>,
) -> FirewallCreateRequest {
    let mut networks = vec![MachineAllocationNetwork {
        networkid: private_network.id.clone(),
        autoacquire: true,
    }];
    networks.extend(
        config
            .firewall
            .networks
            .iter()
            .filter(|id| **id != private_network.id)
            .map(|id| MachineAllocationNetwork {
                networkid: id.clone(),
                autoacquire: true,
            }),
    );

    FirewallCreateRequest {
        name: name.to_string(),
        hostname: name.to_string(),
        description: format!("firewall of cluster {cluster_name}"),
        partitionid: config.partition_id.clone(),
        projectid: config.project_id.clone(),
        sizeid: config.firewall.size.clone(),
        imageid: config.firewall.image.clone(),
        networks,
        tags: vec![
            cluster_id_tag(cluster_id),
            format!("{TAG_CLUSTER_NAME}={cluster_name}"),
            format!("{TAG_CLUSTER_PROJECT}={}", config.project_id),
        ],
        ssh_pub_keys: ssh_public_key
            .filter(|k| !k.is_empty())
            .map(|k| vec![k.to_string()])
            .unwrap_or_default(),
        user_data: String::new(),
    }
}

/// Resolve the private network of a shoot.
///
/// Without a node CIDR, a network already allocated for the cluster is
/// adopted before a new one is allocated.
///
/// # Errors
///
/// Propagates metal API errors; see
/// [`crate::metal::queries::get_private_network_from_node_network`].
pub async fn ensure_private_network(
    cache: &NetworkCache,
    api: &dyn MetalApi,
    config: &InfrastructureConfig,
    node_cidr: Option<&str>,
    namespace: &str,
    cluster_id: &str,
) -> Result<Network> {
    match node_cidr {
        Some(cidr) => cached_private_network(cache, api, &config.project_id, cidr).await,
        None => {
            if let Some(network) =
                find_cluster_private_network(api, &config.project_id, &config.partition_id, cluster_id)
                    .await?
            {
                info!(network = %network.id, "adopting private network of cluster");
                return Ok(network);
            }
            allocate_private_network(api, &config.project_id, &config.partition_id, namespace, cluster_id)
                .await
        }
    }
}

/// Node CIDR the reconcile works with: the shoot's `networking.nodes`, else
/// the value recorded in status.
///
/// Readers other than this reconcile use the recorded value first, see
/// [`crate::reconcilers::common::node_cidr`].
#[must_use]
pub fn desired_node_cidr(shoot_nodes: Option<&str>, recorded: Option<&str>) -> Option<String> {
    shoot_nodes
        .or(recorded)
        .filter(|cidr| !cidr.is_empty())
        .map(str::to_string)
}

/// Drive the firewall allocation one step.
///
/// With a recorded machine id the firewall is re-queried; otherwise an
/// existing cluster firewall is adopted or a new one allocated. Allocation
/// is retried while the metal API answers `NotFound`.
///
/// # Errors
///
/// Returns [`Error::Transient`] if a recorded firewall disappeared and
/// propagates metal API errors otherwise.
pub async fn reconcile_firewall(
    api: &dyn MetalApi,
    current: &FirewallStatus,
    request: &FirewallCreateRequest,
    cluster_id: &str,
    retry_interval: Duration,
) -> Result<FirewallStatus> {
    if !current.machine_id.is_empty() {
        let id = decode_machine_id(&current.machine_id);
        let firewall = api.get_firewall(&id).await.map_err(|e| {
            if e.is_not_found() {
                Error::transient("get firewall", format!("recorded firewall {id} is not known: {e}"))
            } else {
                e
            }
        })?;
        return Ok(FirewallStatus {
            machine_id: current.machine_id.clone(),
            succeeded: firewall.allocation_succeeded(),
        });
    }

    if let Some(existing) = find_cluster_firewall(api, &request.projectid, cluster_id).await? {
        info!(firewall = %existing.id, "adopting existing cluster firewall");
        return Ok(FirewallStatus {
            machine_id: encode_machine_id(&request.partitionid, &existing.id),
            succeeded: existing.allocation_succeeded(),
        });
    }

    let firewall = retry_fixed(
        FIREWALL_ALLOCATION_ATTEMPTS,
        retry_interval,
        Error::is_not_found,
        || api.allocate_firewall(request),
        "allocate firewall",
    )
    .await?;
    record_resource_created("Firewall");
    info!(firewall = %firewall.id, name = %request.name, "allocated firewall");

    Ok(FirewallStatus {
        machine_id: encode_machine_id(&request.partitionid, &firewall.id),
        succeeded: firewall.allocation_succeeded(),
    })
}

/// Release everything a shoot allocated in the metal API.
///
/// # Errors
///
/// Propagates metal API errors; a firewall that is already gone is ignored.
pub async fn delete_metal_resources(
    api: &dyn MetalApi,
    project_id: &str,
    cluster_id: &str,
    machine_id: &str,
    node_cidr: Option<&str>,
) -> Result<()> {
    if !machine_id.is_empty() {
        let id = decode_machine_id(machine_id);
        match api.free_machine(&id).await {
            Ok(()) => info!(firewall = %id, "freed firewall"),
            Err(e) if e.is_not_found() => debug!(firewall = %id, "firewall already gone"),
            Err(e) => return Err(e),
        }
    }

    let cleanup = release_ephemeral_ips(api, project_id, cluster_id).await?;
    debug!(freed = cleanup.freed.len(), untagged = cleanup.untagged.len(), "released ephemeral ips");

    if let Some(cidr) = node_cidr {
        delete_private_networks(api, project_id, cidr).await?;
    }
    Ok(())
}

#[async_trait]
impl Actuator for InfrastructureActuator {
    type Resource = Infrastructure;

    async fn reconcile(
        &self,
        ctx: &Context,
        infra: &Infrastructure,
        cluster: &ClusterContext,
    ) -> Result<Outcome> {
        let namespace = infra.namespace().unwrap_or_default();
        let setup = provider_setup(ctx, cluster, &infra.spec.secret_ref, &namespace).await?;
        let cluster_id = cluster.shoot_uid();

        let recorded_cidr = infra.status.as_ref().and_then(|s| s.nodes_cidr.as_deref());
        let shoot_nodes = cluster.shoot.spec.networking.as_ref().and_then(|n| n.nodes.as_deref());
        let node_cidr = desired_node_cidr(shoot_nodes, recorded_cidr);

        let network = ensure_private_network(
            &ctx.network_cache,
            setup.metal.as_ref(),
            &setup.infrastructure_config,
            node_cidr.as_deref(),
            &namespace,
            &cluster_id,
        )
        .await?;
        let node_cidr = match node_cidr {
            Some(cidr) => cidr,
            None => {
                let cidr = network.prefixes.first().cloned().ok_or_else(|| {
                    Error::Internal(format!("allocated network {} has no prefix", network.id))
                })?;
                // the node CIDR must reach status before the firewall step
                patch_status(&ctx.client, infra, &json!({ "nodesCIDR": cidr })).await?;
                cidr
            }
        };

        let current = infrastructure_provider_status(infra)?.unwrap_or_default();
        let request = firewall_create_request(
            &firewall_name(&namespace),
            &setup.infrastructure_config,
            &network,
            &cluster_id,
            &namespace,
            infra.spec.ssh_public_key.as_deref(),
        );
        let firewall = reconcile_firewall(
            setup.metal.as_ref(),
            &current.firewall,
            &request,
            &cluster_id,
            Duration::from_secs(FIREWALL_ALLOCATION_RETRY_SECS),
        )
        .await?;

        let succeeded = firewall.succeeded;
        let status = json!({
            "providerStatus": encode_value(&InfrastructureStatus { firewall })?,
            "nodesCIDR": node_cidr,
        });
        if succeeded {
            Ok(Outcome::with_status(status))
        } else {
            debug!(namespace = %namespace, "firewall allocation still in progress");
            Ok(Outcome::pending(
                status,
                Duration::from_secs(FIREWALL_ALLOCATION_REQUEUE_SECS),
            ))
        }
    }

    async fn delete(
        &self,
        ctx: &Context,
        infra: &Infrastructure,
        cluster: &ClusterContext,
    ) -> Result<Outcome> {
        let namespace = infra.namespace().unwrap_or_default();
        let setup = provider_setup(ctx, cluster, &infra.spec.secret_ref, &namespace).await?;
        let status = infrastructure_provider_status(infra)?.unwrap_or_default();
        let node_cidr = infra
            .status
            .as_ref()
            .and_then(|s| s.nodes_cidr.clone())
            .or_else(|| cluster.shoot.spec.networking.as_ref().and_then(|n| n.nodes.clone()));

        delete_metal_resources(
            setup.metal.as_ref(),
            &setup.infrastructure_config.project_id,
            &cluster.shoot_uid(),
            &status.firewall.machine_id,
            node_cidr.as_deref(),
        )
        .await?;

        if let Some(cidr) = node_cidr {
            ctx.network_cache
                .invalidate(&(setup.infrastructure_config.project_id.clone(), cidr));
        }
        Ok(Outcome::done())
    }

    async fn migrate(
        &self,
        ctx: &Context,
        infra: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<Outcome> {
        let namespace = infra.namespace().unwrap_or_default();
        let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
        let selector = format!("{LABEL_PURPOSE}={PURPOSE_MACHINE_CLASS}");
        let list = secrets.list(&ListParams::default().labels(&selector)).await?;

        for secret in list.items.iter().filter(|s| has_finalizer(s.meta(), FINALIZER_MACHINE_CONTROLLER)) {
            remove_finalizer(&ctx.client, secret, FINALIZER_MACHINE_CONTROLLER).await?;
        }
        Ok(Outcome::done())
    }

    async fn restore(
        &self,
        _ctx: &Context,
        _infra: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<Outcome> {
        Ok(Outcome::done())
    }
}

/// Reconcile entry point of the infrastructure controller
///
/// # Errors
///
/// See [`run`].
pub async fn reconcile(infra: Arc<Infrastructure>, ctx: Arc<Context>) -> Result<Action> {
    run(&InfrastructureActuator, infra, ctx).await
}

/// Run the infrastructure controller until the watch ends.
pub async fn run_controller(ctx: Arc<Context>, concurrency: u16) {
    info!(concurrency, "Starting Infrastructure controller");
    let api = Api::<Infrastructure>::all(ctx.client.clone());
    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                warn!(error = %e, "Infrastructure reconcile failed");
            }
            futures::future::ready(())
        })
        .await;
}

#[cfg(test)]
#[path = "infrastructure_tests.rs"]
mod infrastructure_tests;
