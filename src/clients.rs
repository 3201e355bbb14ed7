// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes clients for the seed and for shoot clusters.
//!
//! The seed client comes from `--kubeconfig` or the default discovery
//! (in-cluster service account, then `~/.kube/config`). A shoot client is built
//! from the `kubeconfig` key of the access secret the host platform maintains
//! in the shoot's seed namespace.

use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;
use tracing::debug;

use crate::constants::SHOOT_ACCESS_SECRET_NAME;
use crate::errors::{Error, Result};

/// Key of the kubeconfig inside the shoot access secret
pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Build the seed client.
///
/// # Errors
///
/// Returns an error if the kubeconfig cannot be read or no configuration is
/// discoverable.
pub async fn seed_client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::Internal(format!("failed to read kubeconfig {}: {e}", path.display()))
            })?;
            client_from_kubeconfig(kubeconfig).await
        }
        None => Ok(Client::try_default().await?),
    }
}

/// Build a client for the shoot of `namespace`.
///
/// # Errors
///
/// Returns [`Error::ExternalDependencyUnready`] while the access secret does
/// not exist or carries no kubeconfig yet.
pub async fn shoot_client(seed: &Client, namespace: &str) -> Result<Client> {
    let secrets: Api<Secret> = Api::namespaced(seed.clone(), namespace);
    let secret = secrets.get_opt(SHOOT_ACCESS_SECRET_NAME).await?.ok_or_else(|| {
        Error::ExternalDependencyUnready(format!(
            "shoot access secret {namespace}/{SHOOT_ACCESS_SECRET_NAME} does not exist yet"
        ))
    })?;

    let raw = kubeconfig_from_secret(&secret).ok_or_else(|| {
        Error::ExternalDependencyUnready(format!(
            "shoot access secret {namespace}/{SHOOT_ACCESS_SECRET_NAME} has no {KUBECONFIG_KEY}"
        ))
    })?;

    let kubeconfig = Kubeconfig::from_yaml(&raw)
        .map_err(|e| Error::Internal(format!("shoot kubeconfig of {namespace} is malformed: {e}")))?;
    debug!(namespace = %namespace, "built shoot client");
    client_from_kubeconfig(kubeconfig).await
}

/// The kubeconfig stored in a secret
#[must_use]
pub fn kubeconfig_from_secret(secret: &Secret) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_KEY))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .filter(|raw| !raw.trim().is_empty())
}

async fn client_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Client> {
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::Internal(format!("failed to load kubeconfig: {e}")))?;
    Ok(Client::try_from(config)?)
}
