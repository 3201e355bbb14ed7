// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control plane reconciler.
//!
//! Computes the values of the control plane charts and hands them to the
//! [`charts::ChartApplier`]:
//!
//! - `cloud-provider-config`: authentication webhook and audit switches
//! - `control-plane`: cloud controller manager, authentication, audit,
//!   accounting and storage in the seed
//! - `shoot-control-plane`: add-ons in the shoot, including the signed
//!   firewall spec
//!
//! Alongside the values it ensures the seed egress policies of enabled add-ons
//! and deploys the add-on certificates into the shoot.
//!
//! ## Modules
//!
//! - [`charts`] - Hand-off of chart values
//! - [`values`] - Value builders
//! - [`networks`] - Default external and storage network lookups
//! - [`network_policies`] - Seed egress policies
//! - [`certificates`] - Certificates in the shoot
//! - [`signing`] - Firewall spec signatures

pub mod certificates;
pub mod charts;
pub mod network_policies;
pub mod networks;
pub mod signing;
pub mod values;

use async_trait::async_trait;
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, ResourceExt};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::apis::codec::decode_raw;
use crate::apis::helper::merge_iam_config;
use crate::apis::metal::ControlPlaneConfig;
use crate::constants::{
    CHART_CLOUD_PROVIDER_CONFIG, CHART_CONTROL_PLANE, CHART_SHOOT_CONTROL_PLANE, SEED_CHART_IMAGES,
    SHOOT_CHART_IMAGES,
};
use crate::context::{cached_private_network, Context};
use crate::errors::{Error, Result};
use crate::gardener::extensions::{ClusterContext, ControlPlane};
use crate::metal::queries::networks_by_id;
use crate::reconcilers::common::{
    find_infrastructure, node_cidr, provider_setup, shoot_client, ProviderSetup,
};
use crate::reconcilers::operation::{error_policy, run, Actuator, Outcome};
use crate::reconcilers::worker::firewall::firewall_spec;
use crate::reconcilers::worker::firewall_input;

use certificates::{deploy_shoot_certificates, read_cluster_ca, ClusterCa};
use network_policies::{accounting_policy, ensure_policy, storage_policy};
use networks::{default_external_network, storage_seed_config};
use signing::{parse_rsa_key, sign_firewall_spec};
use values::{
    config_values, credentials_checksum, image_values, seed_chart_values, shoot_chart_values,
    ValuesInput, CHECKSUM_CLOUD_PROVIDER,
};

/// Purpose of control planes handled here
pub const PURPOSE_NORMAL: &str = "normal";

/// Charts of a shoot's control plane
pub const CHARTS: [&str; 3] = [
    CHART_CLOUD_PROVIDER_CONFIG,
    CHART_CONTROL_PLANE,
    CHART_SHOOT_CONTROL_PLANE,
];

/// Actuator of [`ControlPlane`] resources
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlPlaneActuator;

/// `true` if the control plane is one this provider renders
#[must_use]
pub fn handles_purpose(purpose: Option<&str>) -> bool {
    purpose.is_none_or(|p| p == PURPOSE_NORMAL)
}

/// Decode the control plane config of a resource; absent means defaults.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if it is malformed.
pub fn control_plane_config(cp: &ControlPlane) -> Result<ControlPlaneConfig> {
    Ok(decode_raw(cp.spec.provider_config.as_ref(), false)?.unwrap_or_default())
}

/// Signed firewall spec rendered into the shoot
fn firewall_values(ctx: &Context, setup: &ProviderSetup, private_network_id: &str, ca: &ClusterCa) -> Result<Value> {
    let spec = firewall_spec(&firewall_input(ctx, setup, private_network_id)?, None)?;
    let spec = serde_json::to_value(&spec)?;
    let signature = sign_firewall_spec(&parse_rsa_key(&ca.key_pem)?, &spec)?;
    Ok(json!({ "spec": spec, "signature": signature }))
}

async fn delete_charts(ctx: &Context, namespace: &str) -> Result<()> {
    for chart in CHARTS.iter().rev() {
        ctx.charts.delete(namespace, chart).await?;
    }
    Ok(())
}

#[async_trait]
impl Actuator for ControlPlaneActuator {
    type Resource = ControlPlane;

    async fn reconcile(&self, ctx: &Context, cp: &ControlPlane, cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = cp.namespace().unwrap_or_default();
        if !handles_purpose(cp.spec.purpose.as_deref()) {
            debug!(namespace = %namespace, purpose = ?cp.spec.purpose, "skipping control plane purpose");
            return Ok(Outcome::done());
        }

        let setup = provider_setup(ctx, cluster, &cp.spec.secret_ref, &namespace).await?;
        let cp_config = control_plane_config(cp)?;
        let iam = merge_iam_config(setup.control_plane.iam_config.as_ref(), cp_config.iam_config.as_ref())
            .ok_or_else(|| {
                Error::InvalidProviderConfig(
                    "neither the cloud profile nor the control plane config define an IAM config".to_string(),
                )
            })?;

        let infra = find_infrastructure(&ctx.client, &namespace).await?;
        let cidr = node_cidr(infra.as_ref(), &cluster.shoot)?;
        let infra_config = &setup.infrastructure_config;
        let private_network =
            cached_private_network(&ctx.network_cache, setup.metal.as_ref(), &infra_config.project_id, &cidr)
                .await?;
        let networks = networks_by_id(setup.metal.as_ref(), &infra_config.firewall.networks).await?;
        let selected = cp_config
            .cloud_controller_manager
            .as_ref()
            .and_then(|c| c.default_external_network.as_deref());
        let default_external = default_external_network(
            setup.metal.as_ref(),
            selected,
            &infra_config.project_id,
            &infra_config.firewall.networks,
            &networks,
        )
        .await?;

        let storage = storage_seed_config(&ctx.config, &cluster.seed_name(), &networks, &infra_config.partition_id);
        let checksums = BTreeMap::from([(
            CHECKSUM_CLOUD_PROVIDER.to_string(),
            credentials_checksum(&setup.credentials),
        )]);
        let input = ValuesInput {
            namespace: &namespace,
            cluster,
            control_plane_config: &cp_config,
            infrastructure_config: infra_config,
            metal_control_plane: &setup.control_plane,
            iam: &iam,
            config: &ctx.config,
            private_network_id: &private_network.id,
            default_external_network: &default_external,
            checksums: &checksums,
            storage,
        };

        if ctx.config.accounting_exporter.enabled {
            ensure_policy(&ctx.client, &accounting_policy()).await?;
        }
        if let Some(duros) = storage {
            ensure_policy(&ctx.client, &storage_policy(&duros.endpoints)?).await?;
        }

        ctx.charts
            .apply(&namespace, CHART_CLOUD_PROVIDER_CONFIG, &config_values(&input))
            .await?;
        let seed_images = image_values(&ctx.image_vector, &SEED_CHART_IMAGES)?;
        ctx.charts
            .apply(&namespace, CHART_CONTROL_PLANE, &seed_chart_values(&input, seed_images))
            .await?;

        if cluster.is_hibernated() {
            debug!(namespace = %namespace, "shoot is hibernated, skipping shoot control plane");
            return Ok(Outcome::done());
        }

        let ca = read_cluster_ca(&ctx.client, &namespace).await?;
        let shoot = shoot_client(&ctx.client, &namespace).await?;
        let issued = deploy_shoot_certificates(&shoot, &ca).await?;
        if issued > 0 {
            info!(namespace = %namespace, issued, "deployed shoot certificates");
        }

        let firewall = firewall_values(ctx, &setup, &private_network.id, &ca)?;
        let shoot_images = image_values(&ctx.image_vector, &SHOOT_CHART_IMAGES)?;
        ctx.charts
            .apply(
                &namespace,
                CHART_SHOOT_CONTROL_PLANE,
                &shoot_chart_values(&input, firewall, shoot_images),
            )
            .await?;
        Ok(Outcome::done())
    }

    async fn delete(&self, ctx: &Context, cp: &ControlPlane, _cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = cp.namespace().unwrap_or_default();
        delete_charts(ctx, &namespace).await?;
        Ok(Outcome::done())
    }

    async fn migrate(&self, ctx: &Context, cp: &ControlPlane, _cluster: &ClusterContext) -> Result<Outcome> {
        let namespace = cp.namespace().unwrap_or_default();
        delete_charts(ctx, &namespace).await?;
        Ok(Outcome::done())
    }

    async fn restore(&self, _ctx: &Context, _cp: &ControlPlane, _cluster: &ClusterContext) -> Result<Outcome> {
        // the reconcile following the restore renders everything anew
        Ok(Outcome::done())
    }
}

/// Reconcile entry point of the control plane controller
///
/// # Errors
///
/// See [`run`].
pub async fn reconcile(cp: Arc<ControlPlane>, ctx: Arc<Context>) -> Result<Action> {
    run(&ControlPlaneActuator, cp, ctx).await
}

/// Run the control plane controller until the watch ends.
pub async fn run_controller(ctx: Arc<Context>, concurrency: u16) {
    info!(concurrency, "Starting ControlPlane controller");
    let api = Api::<ControlPlane>::all(ctx.client.clone());
    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                warn!(error = %e, "ControlPlane reconcile failed");
            }
            futures::future::ready(())
        })
        .await;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
