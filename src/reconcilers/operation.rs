// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Extension operation protocol.
//!
//! Every extension resource runs through the same lifecycle:
//!
//! 1. Skip resources of another provider type
//! 2. Pick the operation from the deletion timestamp and the
//!    `gardener.cloud/operation` annotation
//! 3. Add the finalizer, report `Processing`
//! 4. Run the [`Actuator`] for the operation
//! 5. Report the outcome in `status`, drop the finalizer after delete and
//!    migrate, drop the annotation after migrate and restore
//!
//! The resource specific work lives in the actuators of the
//! infrastructure, worker and control plane reconcilers.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::constants::{EXTENSION_FINALIZER, PROVIDER_TYPE, RESYNC_INTERVAL_SECS};
use crate::context::Context;
use crate::errors::{Error, Result};
use crate::gardener::extensions::{
    ClusterContext, ControlPlane, DefaultStatus, Infrastructure, LastOperationType, Worker,
};
use crate::labels::{ANNOTATION_OPERATION, OPERATION_MIGRATE, OPERATION_RESTORE};
use crate::metrics::{
    record_error, record_reconciliation_error, record_reconciliation_requeue,
    record_reconciliation_success,
};
use crate::reconcilers::common::load_cluster;
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use crate::reconcilers::status::{
    error_patch, merge_objects, patch_status, processing_patch, success_patch,
};

/// The operation requested for an extension resource
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Reconcile,
    Delete,
    Migrate,
    Restore,
}

impl Operation {
    /// Name used in logs, metrics and error context
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reconcile => "reconcile",
            Self::Delete => "delete",
            Self::Migrate => "migrate",
            Self::Restore => "restore",
        }
    }

    /// `lastOperation.type` reported for this operation.
    ///
    /// A reconcile of a resource that never reported an operation is a create.
    #[must_use]
    pub fn last_operation_type(self, status: Option<&DefaultStatus>) -> LastOperationType {
        match self {
            Self::Reconcile => {
                if status.and_then(|s| s.last_operation.as_ref()).is_some() {
                    LastOperationType::Reconcile
                } else {
                    LastOperationType::Create
                }
            }
            Self::Delete => LastOperationType::Delete,
            Self::Migrate => LastOperationType::Migrate,
            Self::Restore => LastOperationType::Restore,
        }
    }

    /// `true` if the finalizer is removed after success
    #[must_use]
    pub fn releases_finalizer(self) -> bool {
        matches!(self, Self::Delete | Self::Migrate)
    }

    /// `true` if the operation annotation is removed after success
    #[must_use]
    pub fn consumes_annotation(self) -> bool {
        matches!(self, Self::Migrate | Self::Restore)
    }
}

/// Pick the operation for a resource.
///
/// Deletion wins over the annotation; a migrate request wins over restore.
#[must_use]
pub fn determine_operation(meta: &ObjectMeta) -> Operation {
    if meta.deletion_timestamp.is_some() {
        return Operation::Delete;
    }
    let requested = meta
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_OPERATION))
        .map(String::as_str);
    match requested {
        Some(OPERATION_MIGRATE) => Operation::Migrate,
        Some(OPERATION_RESTORE) => Operation::Restore,
        _ => Operation::Reconcile,
    }
}

/// `true` if this provider handles resources of `provider_type`
#[must_use]
pub fn is_metal(provider_type: &str) -> bool {
    provider_type == PROVIDER_TYPE
}

/// Extension resources driven by [`run`]
pub trait ExtensionResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + serde::Serialize
    + for<'de> serde::Deserialize<'de>
    + Send
    + Sync
    + 'static
{
    /// `spec.type`
    fn provider_type(&self) -> &str;

    /// Status fields shared by all extension resources
    fn default_status(&self) -> Option<&DefaultStatus>;
}

impl ExtensionResource for Infrastructure {
    fn provider_type(&self) -> &str {
        &self.spec.provider_type
    }

    fn default_status(&self) -> Option<&DefaultStatus> {
        self.status.as_ref().map(|s| &s.default)
    }
}

impl ExtensionResource for Worker {
    fn provider_type(&self) -> &str {
        &self.spec.provider_type
    }

    fn default_status(&self) -> Option<&DefaultStatus> {
        self.status.as_ref().map(|s| &s.default)
    }
}

impl ExtensionResource for ControlPlane {
    fn provider_type(&self) -> &str {
        &self.spec.provider_type
    }

    fn default_status(&self) -> Option<&DefaultStatus> {
        self.status.as_ref().map(|s| &s.default)
    }
}

/// Result of one actuator call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
    /// Provider specific status fields merged into `status`
    pub status: Value,
    /// Requeue early; the operation is reported as still processing
    pub pending: Option<Duration>,
}

impl Outcome {
    /// Finished without status fields
    #[must_use]
    pub fn done() -> Self {
        Self {
            status: json!({}),
            pending: None,
        }
    }

    /// Finished with status fields
    #[must_use]
    pub fn with_status(status: Value) -> Self {
        Self {
            status,
            pending: None,
        }
    }

    /// Not finished yet; requeue after `after`
    #[must_use]
    pub fn pending(status: Value, after: Duration) -> Self {
        Self {
            status,
            pending: Some(after),
        }
    }

    /// Combine two outcomes; fields and pending state of `later` win.
    #[must_use]
    pub fn then(mut self, later: Outcome) -> Self {
        if self.status.is_object() {
            merge_objects(&mut self.status, later.status);
        } else {
            self.status = later.status;
        }
        self.pending = later.pending.or(self.pending);
        self
    }
}

/// Resource specific behaviour of an extension controller
#[async_trait]
pub trait Actuator: Send + Sync {
    /// The resource this actuator handles
    type Resource: ExtensionResource;

    /// Create or update everything the resource describes
    async fn reconcile(
        &self,
        ctx: &Context,
        resource: &Self::Resource,
        cluster: &ClusterContext,
    ) -> Result<Outcome>;

    /// Tear everything down
    async fn delete(
        &self,
        ctx: &Context,
        resource: &Self::Resource,
        cluster: &ClusterContext,
    ) -> Result<Outcome>;

    /// Hand the resource over to another seed
    async fn migrate(
        &self,
        ctx: &Context,
        resource: &Self::Resource,
        cluster: &ClusterContext,
    ) -> Result<Outcome>;

    /// Take the resource over from another seed
    async fn restore(
        &self,
        ctx: &Context,
        resource: &Self::Resource,
        cluster: &ClusterContext,
    ) -> Result<Outcome>;
}

/// Drive one resource through the operation protocol.
///
/// # Errors
///
/// Returns the actuator error wrapped with the resource and operation; the
/// error is also written to `status.lastError`.
pub async fn run<A: Actuator>(
    actuator: &A,
    resource: Arc<A::Resource>,
    ctx: Arc<Context>,
) -> Result<Action> {
    let kind = A::Resource::kind(&()).to_string();
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    if !is_metal(resource.provider_type()) {
        debug!(kind = %kind, namespace = %namespace, name = %name, "ignoring resource of another provider");
        return Ok(Action::await_change());
    }

    let operation = determine_operation(resource.meta());
    if operation == Operation::Delete && !has_finalizer(resource.meta(), EXTENSION_FINALIZER) {
        debug!(kind = %kind, namespace = %namespace, name = %name, "deleted resource carries no finalizer");
        return Ok(Action::await_change());
    }

    info!(
        kind = %kind,
        namespace = %namespace,
        name = %name,
        operation = operation.as_str(),
        "running operation"
    );
    let start = Instant::now();
    let last_operation_type = operation.last_operation_type(resource.default_status());

    let result = execute(actuator, &ctx, &resource, &namespace, operation, last_operation_type).await;

    match result {
        Ok(outcome) => {
            record_reconciliation_success(&kind, start.elapsed());
            match outcome.pending {
                Some(after) => {
                    record_reconciliation_requeue(&kind, "pending");
                    Ok(Action::requeue(after))
                }
                None if operation.releases_finalizer() => Ok(Action::await_change()),
                None => Ok(Action::requeue(Duration::from_secs(RESYNC_INTERVAL_SECS))),
            }
        }
        Err(err) => {
            let err = err.context(&kind, &format!("{namespace}/{name}"), operation.as_str());
            error!(kind = %kind, namespace = %namespace, name = %name, error = %err, "operation failed");
            record_reconciliation_error(&kind, start.elapsed());
            record_error(&kind, err.code());

            match error_patch(last_operation_type, &err) {
                Ok(patch) => {
                    if let Err(e) = patch_status(&ctx.client, resource.as_ref(), &patch).await {
                        warn!(kind = %kind, namespace = %namespace, name = %name, error = %e, "failed to report error in status");
                    }
                }
                Err(e) => warn!(error = %e, "failed to build error status"),
            }
            Err(err)
        }
    }
}

async fn execute<A: Actuator>(
    actuator: &A,
    ctx: &Context,
    resource: &A::Resource,
    namespace: &str,
    operation: Operation,
    last_operation_type: LastOperationType,
) -> Result<Outcome> {
    if operation != Operation::Delete {
        ensure_finalizer(&ctx.client, resource, EXTENSION_FINALIZER).await?;
    }
    patch_status(&ctx.client, resource, &processing_patch(last_operation_type)?).await?;

    let cluster = load_cluster(&ctx.client, namespace).await?;
    let outcome = match operation {
        Operation::Reconcile => actuator.reconcile(ctx, resource, &cluster).await?,
        Operation::Delete => actuator.delete(ctx, resource, &cluster).await?,
        Operation::Migrate => actuator.migrate(ctx, resource, &cluster).await?,
        Operation::Restore => {
            let restored = actuator.restore(ctx, resource, &cluster).await?;
            restored.then(actuator.reconcile(ctx, resource, &cluster).await?)
        }
    };

    let patch = success_patch(
        last_operation_type,
        resource.meta().generation,
        outcome.status.clone(),
        outcome.pending.is_some(),
    )?;
    patch_status(&ctx.client, resource, &patch).await?;

    if outcome.pending.is_none() {
        if operation.consumes_annotation() {
            remove_operation_annotation(&ctx.client, resource).await?;
        }
        if operation.releases_finalizer() {
            remove_finalizer(&ctx.client, resource, EXTENSION_FINALIZER).await?;
        }
    }
    Ok(outcome)
}

/// Remove the `gardener.cloud/operation` annotation.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_operation_annotation<T>(client: &Client, resource: &T) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "annotations": { ANNOTATION_OPERATION: Value::Null } } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    debug!(kind = %T::kind(&()), namespace = %namespace, name = %name, "removed operation annotation");
    Ok(())
}

/// Requeue policy shared by the extension controllers
pub fn error_policy<K>(_resource: Arc<K>, err: &Error, _ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    match err.requeue_after() {
        Some(after) => {
            record_reconciliation_requeue(&K::kind(&()), err.code());
            Action::requeue(after)
        }
        None => Action::await_change(),
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod operation_tests;
