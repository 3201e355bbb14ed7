// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Worker reconciler.
//!
//! Besides the machine classes and deployments of the worker pools, the
//! worker owns the shoot's firewall deployment:
//!
//! - **Reconcile**: deploy the machine plan, ensure the firewall deployment
//!   and record the firewall state in the infrastructure for migration.
//! - **Delete**: delete the firewall deployment, then the machine objects.
//! - **Migrate**: record the state, then shallow-delete the firewall resources.
//! - **Restore**: recreate firewalls and seed access from the recorded state
//!   and the shoot's firewall monitors, and move the migration secrets.
//!
//! ## Modules
//!
//! - [`machines`] - Machine classes and deployments
//! - [`firewall`] - The firewall deployment
//! - [`state`] - The migration state blob
//! - [`migrate`] - Shallow deletion on the old seed
//! - [`restore`] - Recreation on the new seed

pub mod firewall;
pub mod machines;
pub mod migrate;
pub mod restore;
pub mod state;

use async_trait::async_trait;
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, ResourceExt};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::apis::codec::{decode_raw, encode_value};
use crate::apis::metal::WorkerStatus;
use crate::constants::{
    DEPENDENCY_REQUEUE_SECS, FIREWALL_DELETION_POLL_SECS, FIREWALL_DELETION_TIMEOUT_SECS,
    IMAGE_NAME_FIREWALL_CONTROLLER,
};
use crate::context::{cached_private_network, Context};
use crate::errors::{Error, Result};
use crate::gardener::extensions::{ClusterContext, Worker};
use crate::reconcilers::common::{
    find_infrastructure, node_cidr, provider_setup, shoot_client, ProviderSetup,
};
use crate::reconcilers::operation::{error_policy, run, Actuator, Outcome};

use firewall::{
    delete_firewall_deployment, ensure_fcm_ready, ensure_firewall_deployment, firewall_spec,
    FirewallInput,
};
use machines::{
    build_machine_plan, delete_stale_classes, delete_stale_deployments, deploy_machine_plan,
    existing_replicas, MachineInput,
};
use state::{collect_state, persist_state, recorded_state};

/// Actuator of [`Worker`] resources
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerActuator;

fn previous_status(worker: &Worker) -> Result<WorkerStatus> {
    let raw = worker
        .status
        .as_ref()
        .and_then(|s| s.default.provider_status.as_ref());
    Ok(decode_raw(raw, false)?.unwrap_or_default())
}

/// Firewall inputs of a shoot resolved by [`provider_setup`]
///
/// # Errors
///
/// Returns an error if the bundled firewall controller is missing from the image vector.
pub(crate) fn firewall_input<'a>(
    ctx: &'a Context,
    setup: &'a ProviderSetup,
    private_network_id: &'a str,
) -> Result<FirewallInput<'a>> {
    Ok(FirewallInput {
        infrastructure_config: &setup.infrastructure_config,
        control_plane: &setup.control_plane,
        private_network_id,
        bundled_controller_tag: &ctx.image_vector.get(IMAGE_NAME_FIREWALL_CONTROLLER)?.tag,
        internal_prefixes: ctx.config.firewall_internal_prefixes(),
    })
}

#[async_trait]
impl Actuator for WorkerActuator {
    type Resource = Worker;

    async fn reconcile(&self, ctx: &Context, worker: &Worker, cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = worker.namespace().unwrap_or_default();
        let setup = provider_setup(ctx, cluster, &worker.spec.secret_ref, &namespace).await?;
        let infra = find_infrastructure(&ctx.client, &namespace).await?;
        let cidr = node_cidr(infra.as_ref(), &cluster.shoot)?;
        let project_id = setup.infrastructure_config.project_id.clone();
        let network =
            cached_private_network(&ctx.network_cache, setup.metal.as_ref(), &project_id, &cidr).await?;

        let cluster_id = cluster.shoot_uid();
        let previous = previous_status(worker)?;
        let input = MachineInput {
            namespace: &namespace,
            region: &worker.spec.region,
            cluster_id: &cluster_id,
            kubernetes_version: &cluster.shoot.spec.kubernetes.version,
            partition_id: &setup.infrastructure_config.partition_id,
            project_id: &project_id,
            network_id: &network.id,
            ssh_public_key: worker.spec.ssh_public_key.as_deref(),
            endpoint: &setup.control_plane.endpoint,
            credentials: &setup.credentials,
            config: &ctx.config,
            previous: &previous,
        };
        let replicas = existing_replicas(&ctx.client, &namespace).await?;
        let plan = build_machine_plan(&input, &worker.spec.pools, &replicas)?;
        let retiring = deploy_machine_plan(&ctx.client, &namespace, &plan).await?;

        let firewall = firewall_input(ctx, &setup, &network.id)?;
        ensure_firewall_deployment(&ctx.client, &namespace, &cluster_id, &firewall).await?;

        if let Some(infra) = infra.as_ref() {
            let state = collect_state(&ctx.client, &namespace).await?;
            persist_state(&ctx.client, infra, &state).await?;
        }

        let status = json!({
            "providerStatus": encode_value(&plan.status)?,
            "machineDeployments": plan.summaries,
        });
        if retiring > 0 {
            debug!(namespace = %namespace, retiring, "waiting for rollout before removing old machine classes");
            return Ok(Outcome::pending(
                status,
                Duration::from_secs(DEPENDENCY_REQUEUE_SECS),
            ));
        }
        Ok(Outcome::with_status(status))
    }

    async fn delete(&self, ctx: &Context, worker: &Worker, _cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = worker.namespace().unwrap_or_default();
        delete_firewall_deployment(
            &ctx.client,
            &namespace,
            Duration::from_secs(FIREWALL_DELETION_POLL_SECS),
            Duration::from_secs(FIREWALL_DELETION_TIMEOUT_SECS),
        )
        .await?;

        let remaining = delete_stale_deployments(&ctx.client, &namespace, &BTreeSet::new()).await?;
        if remaining > 0 {
            debug!(namespace = %namespace, remaining, "waiting for machine deployments to be deleted");
            return Ok(Outcome::pending(
                json!({}),
                Duration::from_secs(DEPENDENCY_REQUEUE_SECS),
            ));
        }
        let in_use = delete_stale_classes(&ctx.client, &namespace, &BTreeSet::new()).await?;
        if in_use > 0 {
            debug!(namespace = %namespace, in_use, "waiting for machines to release their classes");
            return Ok(Outcome::pending(
                json!({}),
                Duration::from_secs(DEPENDENCY_REQUEUE_SECS),
            ));
        }
        Ok(Outcome::done())
    }

    async fn migrate(&self, ctx: &Context, worker: &Worker, _cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = worker.namespace().unwrap_or_default();
        let Some(infra) = find_infrastructure(&ctx.client, &namespace).await? else {
            info!(namespace = %namespace, "no infrastructure, nothing to migrate");
            return Ok(Outcome::done());
        };

        let state = collect_state(&ctx.client, &namespace).await?;
        persist_state(&ctx.client, &infra, &state).await?;
        migrate::migrate_firewalls(&ctx.client, &infra).await?;
        Ok(Outcome::done())
    }

    async fn restore(&self, ctx: &Context, worker: &Worker, cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = worker.namespace().unwrap_or_default();
        ensure_fcm_ready(&ctx.client, &namespace).await?;

        let setup = provider_setup(ctx, cluster, &worker.spec.secret_ref, &namespace).await?;
        let infra = find_infrastructure(&ctx.client, &namespace).await?.ok_or_else(|| {
            Error::ExternalDependencyUnready(format!("infrastructure of {namespace} does not exist"))
        })?;

        if let Some(state) = recorded_state(&infra)? {
            restore::restore_from_state(&ctx.client, &namespace, &state).await?;
        }

        let cidr = node_cidr(Some(&infra), &cluster.shoot)?;
        let project_id = setup.infrastructure_config.project_id.clone();
        let network =
            cached_private_network(&ctx.network_cache, setup.metal.as_ref(), &project_id, &cidr).await?;
        let spec = firewall_spec(&firewall_input(ctx, &setup, &network.id)?, None)?;

        let shoot = shoot_client(&ctx.client, &namespace).await?;
        let restored = restore::restore_from_monitors(
            &ctx.client,
            &shoot,
            setup.metal.as_ref(),
            &namespace,
            &cluster.shoot_uid(),
            &project_id,
            &spec,
        )
        .await?;
        debug!(namespace = %namespace, restored, "restored firewalls from monitors");

        restore::restore_migration_secrets(&ctx.client, &shoot, &namespace).await?;
        Ok(Outcome::done())
    }
}

/// Reconcile entry point of the worker controller
///
/// # Errors
///
/// See [`run`].
pub async fn reconcile(worker: Arc<Worker>, ctx: Arc<Context>) -> Result<Action> {
    run(&WorkerActuator, worker, ctx).await
}

/// Run the worker controller until the watch ends.
pub async fn run_controller(ctx: Arc<Context>, concurrency: u16) {
    info!(concurrency, "Starting Worker controller");
    let api = Api::<Worker>::all(ctx.client.clone());
    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                warn!(error = %e, "Worker reconcile failed");
            }
            futures::future::ready(())
        })
        .await;
}
