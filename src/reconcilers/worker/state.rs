// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! State a shoot needs to move its firewalls to another seed.
//!
//! The blob lives in `status.state` of the shoot's `Infrastructure`. It is
//! JSON on the outside with every object embedded as a YAML document, which
//! keeps states written by earlier releases readable.

use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::constants::FIREWALL_SEED_ACCESS_PREFIX;
use crate::errors::{Error, Result};
use crate::fcm::{strip_for_migration, Firewall, FirewallDeployment};
use crate::gardener::extensions::Infrastructure;
use crate::reconcilers::status::patch_status;

/// Firewalls and seed access of one shoot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureState {
    /// YAML encoded firewalls
    #[serde(default)]
    pub firewalls: Vec<String>,
    #[serde(default)]
    pub seed_access: Vec<SeedAccessState>,
}

/// A firewall controller's service account and its token secrets
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccessState {
    /// YAML encoded service account
    pub service_account: String,
    /// YAML encoded secrets
    #[serde(default)]
    pub service_account_secrets: Vec<String>,
}

/// Name of the seed access service account of a firewall deployment
#[must_use]
pub fn seed_access_name(deployment: &str) -> String {
    format!("{FIREWALL_SEED_ACCESS_PREFIX}{deployment}")
}

/// YAML of a firewall without the fields bound to the current seed
///
/// # Errors
///
/// Returns [`Error::Yaml`] if encoding fails.
pub fn encode_firewall(firewall: &Firewall) -> Result<String> {
    let mut firewall = firewall.clone();
    strip_for_migration(&mut firewall.metadata);
    firewall.status = None;
    Ok(serde_yaml::to_string(&firewall)?)
}

fn clear_version(meta: &mut ObjectMeta) {
    meta.resource_version = None;
}

/// Seed access entry of a service account and its secrets
///
/// # Errors
///
/// Returns [`Error::Yaml`] if encoding fails.
pub fn encode_seed_access(account: &ServiceAccount, secrets: &[Secret]) -> Result<SeedAccessState> {
    let mut account = account.clone();
    clear_version(&mut account.metadata);
    let service_account_secrets = secrets
        .iter()
        .map(|secret| {
            let mut secret = secret.clone();
            clear_version(&mut secret.metadata);
            serde_yaml::to_string(&secret).map_err(Error::from)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SeedAccessState {
        service_account: serde_yaml::to_string(&account)?,
        service_account_secrets,
    })
}

impl InfrastructureState {
    /// Decode the embedded firewalls
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if an entry is malformed.
    pub fn decode_firewalls(&self) -> Result<Vec<Firewall>> {
        self.firewalls
            .iter()
            .map(|raw| serde_yaml::from_str(raw).map_err(Error::from))
            .collect()
    }
}

impl SeedAccessState {
    /// Decode the embedded service account and secrets
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if an entry is malformed.
    pub fn decode(&self) -> Result<(ServiceAccount, Vec<Secret>)> {
        let account = serde_yaml::from_str(&self.service_account)?;
        let secrets = self
            .service_account_secrets
            .iter()
            .map(|raw| serde_yaml::from_str(raw).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        Ok((account, secrets))
    }
}

/// The state recorded on an infrastructure, if any
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the state is malformed.
pub fn recorded_state(infra: &Infrastructure) -> Result<Option<InfrastructureState>> {
    let Some(raw) = infra.status.as_ref().and_then(|s| s.default.state.as_ref()) else {
        return Ok(None);
    };
    if raw.0.is_null() {
        return Ok(None);
    }
    serde_json::from_value(raw.0.clone())
        .map(Some)
        .map_err(|e| Error::InvalidProviderConfig(format!("infrastructure state is malformed: {e}")))
}

/// Collect the firewalls and seed access of a namespace.
///
/// # Errors
///
/// Propagates API and encoding errors.
pub async fn collect_state(client: &Client, namespace: &str) -> Result<InfrastructureState> {
    let mut state = InfrastructureState::default();

    let firewalls: Api<Firewall> = Api::namespaced(client.clone(), namespace);
    for firewall in firewalls.list(&ListParams::default()).await?.items {
        state.firewalls.push(encode_firewall(&firewall)?);
    }

    let deployments: Api<FirewallDeployment> = Api::namespaced(client.clone(), namespace);
    let accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    for deployment in deployments.list(&ListParams::default()).await?.items {
        let name = seed_access_name(&deployment.name_any());
        let Some(account) = accounts.get_opt(&name).await? else {
            warn!(namespace = %namespace, service_account = %name, "seed access service account not found");
            continue;
        };

        let mut account_secrets = Vec::new();
        for reference in account.secrets.iter().flatten() {
            let Some(secret_name) = reference.name.as_deref() else {
                continue;
            };
            if let Some(secret) = secrets.get_opt(secret_name).await? {
                account_secrets.push(secret);
            }
        }
        state.seed_access.push(encode_seed_access(&account, &account_secrets)?);
    }

    debug!(
        namespace = %namespace,
        firewalls = state.firewalls.len(),
        seed_access = state.seed_access.len(),
        "collected infrastructure state"
    );
    Ok(state)
}

/// Store the state in the infrastructure's status.
///
/// # Errors
///
/// Propagates API errors.
pub async fn persist_state(client: &Client, infra: &Infrastructure, state: &InfrastructureState) -> Result<()> {
    patch_status(client, infra, &json!({ "state": state })).await
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
