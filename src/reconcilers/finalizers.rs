// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! Extension resources carry [`EXTENSION_FINALIZER`](crate::constants::EXTENSION_FINALIZER)
//! while this provider manages them. Migration additionally strips foreign
//! finalizers: the machine-controller finalizer from machine class secrets and
//! all finalizers of firewall resources before they are orphaned.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::info;

use crate::errors::Result;

/// Namespaced objects whose finalizers can be merge-patched.
pub trait Namespaced:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
{
}

impl<T> Namespaced for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + Serialize
        + DeserializeOwned
{
}

/// `true` if `meta` carries `finalizer`
#[must_use]
pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|existing| existing == finalizer))
}

/// The finalizers of `meta` without `finalizer`, or `None` if it is absent
#[must_use]
pub fn finalizers_without(meta: &ObjectMeta, finalizer: &str) -> Option<Vec<String>> {
    if !has_finalizer(meta, finalizer) {
        return None;
    }
    Some(
        meta.finalizers
            .iter()
            .flatten()
            .filter(|existing| *existing != finalizer)
            .cloned()
            .collect(),
    )
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<T: Namespaced>(client: &Client, resource: &T, finalizer: &str) -> Result<()> {
    if has_finalizer(resource.meta(), finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(kind = %T::kind(&()), %namespace, %name, finalizer, "Adding finalizer");

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    patch_finalizers::<T>(client, &namespace, &name, &finalizers).await
}

/// Remove a finalizer from a resource.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<T: Namespaced>(client: &Client, resource: &T, finalizer: &str) -> Result<()> {
    let Some(finalizers) = finalizers_without(resource.meta(), finalizer) else {
        return Ok(());
    };

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(kind = %T::kind(&()), %namespace, %name, finalizer, "Removing finalizer");
    patch_finalizers::<T>(client, &namespace, &name, &finalizers).await
}

/// Remove every finalizer of a resource.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_all_finalizers<T: Namespaced>(client: &Client, resource: &T) -> Result<()> {
    if resource.meta().finalizers.as_ref().is_none_or(Vec::is_empty) {
        return Ok(());
    }
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(kind = %T::kind(&()), %namespace, %name, "Removing all finalizers");
    patch_finalizers::<T>(client, &namespace, &name, &[]).await
}

async fn patch_finalizers<T: Namespaced>(
    client: &Client,
    namespace: &str,
    name: &str,
    finalizers: &[String],
) -> Result<()> {
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
