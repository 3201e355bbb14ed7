// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Recreate a shoot's firewall resources on a new seed.
//!
//! Firewalls come from the recorded state first and from the firewall
//! monitors in the shoot second. An existing firewall always wins; drift
//! between it and the recreated spec is not reconciled here.

use k8s_openapi::api::core::v1::{ObjectReference, Secret, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, DynamicObject, ListParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::apis::helper::decode_machine_id;
use crate::constants::FIREWALL_NAMESPACE;
use crate::errors::{Error, Result};
use crate::fcm::{
    firewall_monitor_resource, monitor_machine_id, strip_for_migration, Firewall, FirewallSpec,
};
use crate::labels::{
    ANNOTATION_SERVICE_ACCOUNT_NAME, ANNOTATION_SERVICE_ACCOUNT_UID, LABEL_CLUSTER_ID,
    LABEL_MIGRATION_SECRET,
};
use crate::metal::{Machine, MetalApi};
use crate::reconcilers::resources::{create_if_absent, is_kube_not_found};

use super::state::InfrastructureState;

/// Firewall resource of a machine reported by a firewall monitor
#[must_use]
pub fn firewall_from_machine(
    name: &str,
    namespace: &str,
    cluster_id: &str,
    mut spec: FirewallSpec,
    machine: &Machine,
) -> Firewall {
    if let Some(allocation) = machine.allocation.as_ref() {
        spec.userdata.clone_from(&allocation.user_data);
        spec.ssh_public_keys.clone_from(&allocation.ssh_pub_keys);
    }
    let mut firewall = Firewall::new(name, spec);
    firewall.metadata.namespace = Some(namespace.to_string());
    firewall.metadata.labels = Some(BTreeMap::from([(
        LABEL_CLUSTER_ID.to_string(),
        cluster_id.to_string(),
    )]));
    firewall
}

/// Set the service account uid annotation of a token secret
#[must_use]
pub fn with_service_account_uid(mut secret: Secret, uid: &str) -> Secret {
    secret
        .annotations_mut()
        .insert(ANNOTATION_SERVICE_ACCOUNT_UID.to_string(), uid.to_string());
    secret
}

/// Seed-side service account and secret of a migration secret from the shoot.
///
/// Returns `None` if the secret names no service account.
#[must_use]
pub fn seed_objects_from_migration_secret(
    secret: &Secret,
    namespace: &str,
) -> Option<(ServiceAccount, Secret)> {
    let account_name = secret.annotations().get(ANNOTATION_SERVICE_ACCOUNT_NAME)?.clone();
    let secret_name = secret.name_any();

    let account = ServiceAccount {
        metadata: ObjectMeta {
            name: Some(account_name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        secrets: Some(vec![ObjectReference {
            name: Some(secret_name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let mut seed_secret = secret.clone();
    strip_for_migration(&mut seed_secret.metadata);
    seed_secret.metadata.namespace = Some(namespace.to_string());
    if let Some(labels) = seed_secret.metadata.labels.as_mut() {
        labels.remove(LABEL_MIGRATION_SECRET);
    }
    Some((account, seed_secret))
}

async fn recreate_service_account(
    client: &Client,
    namespace: &str,
    mut account: ServiceAccount,
    secrets: Vec<Secret>,
) -> Result<()> {
    strip_for_migration(&mut account.metadata);
    account.metadata.namespace = Some(namespace.to_string());
    let name = account.name_any();
    create_if_absent(client, namespace, &account).await?;

    let accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    let uid = accounts
        .get(&name)
        .await?
        .metadata
        .uid
        .ok_or_else(|| Error::Internal(format!("service account {namespace}/{name} has no uid")))?;

    for mut secret in secrets {
        strip_for_migration(&mut secret.metadata);
        secret.metadata.namespace = Some(namespace.to_string());
        create_if_absent(client, namespace, &with_service_account_uid(secret, &uid)).await?;
    }
    Ok(())
}

/// Recreate the firewalls and seed access recorded in a state blob.
///
/// # Errors
///
/// Propagates API and decoding errors.
pub async fn restore_from_state(client: &Client, namespace: &str, state: &InfrastructureState) -> Result<()> {
    for mut firewall in state.decode_firewalls()? {
        strip_for_migration(&mut firewall.metadata);
        firewall.metadata.namespace = Some(namespace.to_string());
        create_if_absent(client, namespace, &firewall).await?;
    }

    for entry in &state.seed_access {
        let (account, secrets) = entry.decode()?;
        recreate_service_account(client, namespace, account, secrets).await?;
    }
    info!(
        namespace = %namespace,
        firewalls = state.firewalls.len(),
        seed_access = state.seed_access.len(),
        "restored infrastructure state"
    );
    Ok(())
}

/// Recreate firewalls reported by the firewall monitors of the shoot.
///
/// Monitors whose machine belongs to another project are skipped.
///
/// # Errors
///
/// Propagates API and metal API errors.
pub async fn restore_from_monitors(
    client: &Client,
    shoot: &Client,
    metal: &dyn MetalApi,
    namespace: &str,
    cluster_id: &str,
    project_id: &str,
    spec: &FirewallSpec,
) -> Result<usize> {
    let monitors: Api<DynamicObject> =
        Api::namespaced_with(shoot.clone(), FIREWALL_NAMESPACE, &firewall_monitor_resource());
    let list = match monitors.list(&ListParams::default()).await {
        Ok(list) => list.items,
        Err(e) if is_kube_not_found(&e) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let mut restored = 0;
    for monitor in list {
        let name = monitor.name_any();
        let Some(machine_id) = monitor_machine_id(&monitor) else {
            debug!(monitor = %name, "firewall monitor reports no machine");
            continue;
        };
        let machine = metal.get_firewall(&decode_machine_id(&machine_id)).await?;
        if machine.project() != project_id {
            warn!(monitor = %name, machine = %machine.id, "firewall belongs to another project, skipping");
            continue;
        }

        let firewall = firewall_from_machine(&name, namespace, cluster_id, spec.clone(), &machine);
        if create_if_absent(client, namespace, &firewall).await? {
            restored += 1;
        }
    }
    Ok(restored)
}

/// Move the migration secrets of the shoot to the seed.
///
/// Each secret is recreated in the seed namespace together with the service
/// account it belongs to, then deleted from the shoot.
///
/// # Errors
///
/// Propagates API errors.
pub async fn restore_migration_secrets(client: &Client, shoot: &Client, namespace: &str) -> Result<usize> {
    let shoot_secrets: Api<Secret> = Api::namespaced(shoot.clone(), FIREWALL_NAMESPACE);
    let list = shoot_secrets
        .list(&ListParams::default().labels(LABEL_MIGRATION_SECRET))
        .await?;

    let mut moved = 0;
    for secret in list.items {
        let name = secret.name_any();
        let Some((account, seed_secret)) = seed_objects_from_migration_secret(&secret, namespace) else {
            warn!(secret = %name, "migration secret names no service account, skipping");
            continue;
        };
        recreate_service_account(client, namespace, account, vec![seed_secret]).await?;

        match shoot_secrets.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(e) if is_kube_not_found(&e) => {}
            Err(e) => return Err(e.into()),
        }
        moved += 1;
    }
    if moved > 0 {
        info!(namespace = %namespace, secrets = moved, "moved migration secrets to the seed");
    }
    Ok(moved)
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod restore_tests;
