// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource creation, update and deletion helpers.
//!
//! # Strategies
//!
//! - **Apply**: server-side apply for objects this provider owns
//! - **Create if absent**: create and treat `AlreadyExists` as success, used
//!   when restoring objects whose first writer wins
//! - **Delete**: tolerate `NotFound`; shallow deletes orphan the children

use kube::api::{
    ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PostParams, PropagationPolicy,
};
use kube::core::{ClusterResourceScope, NamespaceResourceScope};
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::metrics::{record_resource_created, record_resource_deleted};
use crate::reconcilers::retry::retry_api_call;

/// `true` if the error is a Kubernetes `AlreadyExists` conflict
#[must_use]
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

/// `true` if the error is a Kubernetes `NotFound`
#[must_use]
pub fn is_kube_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

/// Delete parameters that leave dependents in place
#[must_use]
pub fn orphan_delete_params() -> DeleteParams {
    DeleteParams {
        propagation_policy: Some(PropagationPolicy::Orphan),
        ..DeleteParams::default()
    }
}

/// Create or update a resource with server-side apply.
///
/// # Errors
///
/// Returns an error if the resource has no name or the apply fails.
pub async fn create_or_apply<T>(
    client: &Client,
    namespace: &str,
    resource: &T,
    field_manager: &str,
) -> Result<T>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::Internal(format!("{} must have a name", T::kind(&()))))?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    debug!(
        namespace = %namespace,
        name = %name,
        kind = %T::kind(&()),
        "Applying resource"
    );

    let applied = api
        .patch(
            &name,
            &PatchParams::apply(field_manager).force(),
            &Patch::Apply(resource),
        )
        .await?;
    debug!("Applied {} {}/{}", T::kind(&()), namespace, name);
    Ok(applied)
}

/// Create or update a cluster-scoped resource with server-side apply,
/// retrying transient API errors.
///
/// # Errors
///
/// Returns an error if the resource has no name or the apply fails.
pub async fn apply_cluster_scoped<T>(client: &Client, resource: &T, field_manager: &str) -> Result<T>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::Internal(format!("{} must have a name", T::kind(&()))))?;

    let api: Api<T> = Api::all(client.clone());
    let params = PatchParams::apply(field_manager).force();
    let patch = Patch::Apply(resource);
    let applied = retry_api_call(
        || api.patch(&name, &params, &patch),
        "apply cluster-scoped resource",
    )
    .await?;
    debug!("Applied {} {}", T::kind(&()), name);
    Ok(applied)
}

/// Server-side apply a dynamic object.
///
/// # Errors
///
/// Returns an error if the object has no name or the apply fails.
pub async fn apply_dynamic(
    client: &Client,
    namespace: &str,
    resource: &ApiResource,
    object: &DynamicObject,
    field_manager: &str,
) -> Result<()> {
    let name = object
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::Internal(format!("{} must have a name", resource.kind)))?;

    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, resource);
    api.patch(
        &name,
        &PatchParams::apply(field_manager).force(),
        &Patch::Apply(object),
    )
    .await?;
    debug!("Applied {} {}/{}", resource.kind, namespace, name);
    Ok(())
}

/// Create a resource unless it exists.
///
/// Returns `true` if the resource was created.
///
/// # Errors
///
/// Returns an error if creation fails for any reason but `AlreadyExists`.
pub async fn create_if_absent<T>(client: &Client, namespace: &str, resource: &T) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    match api.create(&PostParams::default(), resource).await {
        Ok(created) => {
            info!("Created {} {}/{}", T::kind(&()), namespace, created.name_any());
            record_resource_created(&T::kind(&()));
            Ok(true)
        }
        Err(e) if is_already_exists(&e) => {
            debug!(
                "{} {}/{} already exists, skipping",
                T::kind(&()),
                namespace,
                resource.name_any()
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a resource; a missing resource counts as deleted.
///
/// Returns `true` if a delete was issued.
///
/// # Errors
///
/// Returns an error if the delete fails for any reason but `NotFound`.
pub async fn delete_if_exists<T>(
    client: &Client,
    namespace: &str,
    name: &str,
    params: &DeleteParams,
) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    match api.delete(name, params).await {
        Ok(_) => {
            info!("Deleted {} {}/{}", T::kind(&()), namespace, name);
            record_resource_deleted(&T::kind(&()));
            Ok(true)
        }
        Err(e) if is_kube_not_found(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
