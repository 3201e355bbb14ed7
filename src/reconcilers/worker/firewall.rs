// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The shoot's `FirewallDeployment`.
//!
//! The firewall-controller-manager turns the deployment into firewall sets and
//! firewalls. This module derives the desired spec from the shoot's
//! infrastructure config and the cloud profile, and guards its preconditions.

use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::DeleteParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::apis::helper::is_firewall_patch_update;
use crate::apis::metal::{InfrastructureConfig, MetalControlPlane};
use crate::constants::{
    FIELD_MANAGER, FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT, FIREWALL_DEPLOYMENT_NAME,
    FIREWALL_DEPLOYMENT_REPLICAS,
};
use crate::errors::{Error, Result};
use crate::fcm::{
    EgressRuleSnat, FirewallDeployment, FirewallDeploymentSpec, FirewallSpec,
    FirewallTemplateSpec, RateLimit, TemplateMetadata,
};
use crate::labels::{shoot_selector_label, LABEL_CLUSTER_ID};
use crate::reconcilers::resources::{create_or_apply, delete_if_exists};
use crate::validation::{resolve_firewall_controller_version, FirewallVersionError};

/// Inputs of the firewall spec of one shoot
#[derive(Clone, Debug)]
pub struct FirewallInput<'a> {
    pub infrastructure_config: &'a InfrastructureConfig,
    pub control_plane: &'a MetalControlPlane,
    pub private_network_id: &'a str,
    /// Tag of the firewall-controller image this extension bundles
    pub bundled_controller_tag: &'a str,
    pub internal_prefixes: Vec<String>,
}

/// Map configured rate limits; absent stays absent.
#[must_use]
pub fn rate_limits(limits: Option<&[crate::apis::metal::RateLimit]>) -> Option<Vec<RateLimit>> {
    limits.map(|limits| {
        limits
            .iter()
            .map(|l| RateLimit {
                network_id: l.network_id.clone(),
                rate: l.rate_limit,
            })
            .collect()
    })
}

/// Map configured SNAT egress rules; absent stays absent.
#[must_use]
pub fn egress_rules(rules: Option<&[crate::apis::metal::EgressRule]>) -> Option<Vec<EgressRuleSnat>> {
    rules.map(|rules| {
        rules
            .iter()
            .map(|r| EgressRuleSnat {
                network_id: r.network_id.clone(),
                ips: r.ips.clone(),
            })
            .collect()
    })
}

/// Derive the firewall spec of a shoot.
///
/// An undefined controller version keeps the one of `current`.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the controller version cannot
/// be resolved.
pub fn firewall_spec(input: &FirewallInput<'_>, current: Option<&FirewallSpec>) -> Result<FirewallSpec> {
    let firewall = &input.infrastructure_config.firewall;

    let mut networks = firewall.networks.clone();
    networks.push(input.private_network_id.to_string());

    let (controller_version, controller_url) = match resolve_firewall_controller_version(
        &input.control_plane.firewall_controller_versions,
        &firewall.controller_version,
        input.bundled_controller_tag,
    ) {
        Ok(version) => (version.version, version.url),
        Err(FirewallVersionError::SpecVersionUndefined) => current
            .map(|c| (c.controller_version.clone(), c.controller_url.clone()))
            .unwrap_or_default(),
        Err(e) => return Err(e.into()),
    };

    Ok(FirewallSpec {
        size: firewall.size.clone(),
        image: firewall.image.clone(),
        partition: input.infrastructure_config.partition_id.clone(),
        project: input.infrastructure_config.project_id.clone(),
        networks,
        rate_limits: rate_limits(firewall.rate_limits.as_deref()),
        internal_prefixes: input.internal_prefixes.clone(),
        egress_rules: egress_rules(firewall.egress_rules.as_deref()),
        controller_version,
        controller_url,
        nftables_exporter_version: input.control_plane.nftables_exporter.version.clone(),
        nftables_exporter_url: input.control_plane.nftables_exporter.url.clone(),
        log_accepted_connections: firewall.log_accepted_connections,
        ..Default::default()
    })
}

/// The firewall deployment of a shoot
#[must_use]
pub fn firewall_deployment(namespace: &str, cluster_id: &str, spec: FirewallSpec) -> FirewallDeployment {
    let selector = BTreeMap::from([(LABEL_CLUSTER_ID.to_string(), cluster_id.to_string())]);
    let (shoot_key, shoot_value) = shoot_selector_label(namespace);

    let mut deployment = FirewallDeployment::new(
        FIREWALL_DEPLOYMENT_NAME,
        FirewallDeploymentSpec {
            replicas: FIREWALL_DEPLOYMENT_REPLICAS,
            selector: selector.clone(),
            strategy: None,
            template: FirewallTemplateSpec {
                metadata: TemplateMetadata {
                    labels: selector,
                    annotations: BTreeMap::new(),
                },
                spec,
            },
        },
    );
    deployment.metadata.namespace = Some(namespace.to_string());
    deployment.metadata.labels = Some(BTreeMap::from([(shoot_key, shoot_value)]));
    deployment
}

/// Reject image changes other than patch updates.
///
/// # Errors
///
/// Returns [`Error::Immutable`] if the image changes across os, major or minor.
pub fn check_image_update(current: Option<&FirewallSpec>, desired: &FirewallSpec) -> Result<()> {
    let Some(current) = current else {
        return Ok(());
    };
    if current.image.is_empty() || current.image == desired.image {
        return Ok(());
    }
    if is_firewall_patch_update(&current.image, &desired.image)? {
        return Ok(());
    }
    Err(Error::Immutable {
        field: "spec.template.spec.image".to_string(),
        message: format!(
            "firewall image {} can only be updated to a newer patch, not to {}",
            current.image, desired.image
        ),
    })
}

/// Name of the shoot's mutating webhook of the firewall-controller-manager
#[must_use]
pub fn webhook_name(namespace: &str) -> String {
    format!("{FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT}-{namespace}")
}

/// Require the shoot's mutating webhook to exist.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] while it is missing.
pub async fn ensure_webhook(client: &Client, namespace: &str) -> Result<()> {
    let name = webhook_name(namespace);
    let api: Api<MutatingWebhookConfiguration> = Api::all(client.clone());
    if api.get_opt(&name).await?.is_none() {
        return Err(Error::ExternalDependencyUnready(format!(
            "mutating webhook configuration {name} does not exist yet"
        )));
    }
    Ok(())
}

/// `true` once every desired replica is ready
#[must_use]
pub fn deployment_ready(deployment: &Deployment) -> bool {
    let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    ready >= desired
}

/// Require the firewall-controller-manager of the namespace to be ready.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] while it is missing or not ready.
pub async fn ensure_fcm_ready(client: &Client, namespace: &str) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    match api.get_opt(FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT).await? {
        Some(deployment) if deployment_ready(&deployment) => Ok(()),
        Some(_) => Err(Error::ExternalDependencyUnready(format!(
            "{FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT} in {namespace} is not ready"
        ))),
        None => Err(Error::ExternalDependencyUnready(format!(
            "{FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT} in {namespace} does not exist"
        ))),
    }
}

/// Create or update the firewall deployment of a shoot.
///
/// # Errors
///
/// Returns an error if the webhook is missing, the image change is not a
/// patch update, or the API call fails.
pub async fn ensure_firewall_deployment(
    client: &Client,
    namespace: &str,
    cluster_id: &str,
    input: &FirewallInput<'_>,
) -> Result<FirewallDeployment> {
    ensure_webhook(client, namespace).await?;

    let api: Api<FirewallDeployment> = Api::namespaced(client.clone(), namespace);
    let existing = api.get_opt(FIREWALL_DEPLOYMENT_NAME).await?;
    let current = existing.as_ref().map(|d| &d.spec.template.spec);

    let spec = firewall_spec(input, current)?;
    check_image_update(current, &spec)?;

    let deployment = firewall_deployment(namespace, cluster_id, spec);
    let applied = create_or_apply(client, namespace, &deployment, FIELD_MANAGER).await?;
    debug!(namespace = %namespace, "firewall deployment is up to date");
    Ok(applied)
}

/// Delete the firewall deployment and wait until it is gone.
///
/// # Errors
///
/// Returns [`Error::Transient`] if the deployment still exists after `timeout`.
pub async fn delete_firewall_deployment(
    client: &Client,
    namespace: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<()> {
    if !delete_if_exists::<FirewallDeployment>(
        client,
        namespace,
        FIREWALL_DEPLOYMENT_NAME,
        &DeleteParams::default(),
    )
    .await?
    {
        return Ok(());
    }

    let api: Api<FirewallDeployment> = Api::namespaced(client.clone(), namespace);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if api.get_opt(FIREWALL_DEPLOYMENT_NAME).await?.is_none() {
            info!(namespace = %namespace, "firewall deployment deleted");
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::transient(
                "delete firewall deployment",
                format!("firewall deployment in {namespace} still exists after {timeout:?}"),
            ));
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
#[path = "firewall_tests.rs"]
mod firewall_tests;
