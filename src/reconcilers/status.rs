// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status helpers for extension resources.
//!
//! Extension resources report progress through `status.lastOperation`,
//! `status.lastError` and `status.observedGeneration`. Reconcilers build JSON
//! merge patches with the functions here and send them through
//! [`patch_status`]; provider specific status fields are merged into the same
//! patch so one reconcile writes its status once.

use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::gardener::extensions::{LastError, LastOperation, LastOperationState, LastOperationType};

/// Progress reported while an operation is running
const PROGRESS_PROCESSING: i32 = 1;

/// Progress reported once an operation finished
const PROGRESS_DONE: i32 = 100;

/// A `lastOperation` stamped with the current time
#[must_use]
pub fn last_operation(
    operation_type: LastOperationType,
    state: LastOperationState,
    description: impl Into<String>,
) -> LastOperation {
    let progress = match state {
        LastOperationState::Succeeded => PROGRESS_DONE,
        _ => PROGRESS_PROCESSING,
    };
    LastOperation {
        operation_type,
        state,
        description: description.into(),
        last_update_time: Utc::now(),
        progress,
    }
}

/// A `lastError` describing `err`
#[must_use]
pub fn last_error(err: &Error) -> LastError {
    LastError {
        description: err.to_string(),
        codes: vec![err.root().code().to_string()],
        last_update_time: Some(Utc::now()),
    }
}

/// Status patch marking the start of an operation
///
/// # Errors
///
/// Returns an error if the status cannot be serialized.
pub fn processing_patch(operation_type: LastOperationType) -> Result<Value> {
    let operation = last_operation(
        operation_type,
        LastOperationState::Processing,
        format!("{} is being processed", describe(operation_type)),
    );
    Ok(json!({ "status": { "lastOperation": serde_json::to_value(operation)? } }))
}

/// Status patch for a finished operation.
///
/// `extra` holds provider specific status fields and is merged into the
/// status object. With `pending` the operation stays `Processing`.
///
/// # Errors
///
/// Returns an error if the status cannot be serialized.
pub fn success_patch(
    operation_type: LastOperationType,
    generation: Option<i64>,
    extra: Value,
    pending: bool,
) -> Result<Value> {
    let (state, description) = if pending {
        (
            LastOperationState::Processing,
            format!("{} is waiting for external resources", describe(operation_type)),
        )
    } else {
        (
            LastOperationState::Succeeded,
            format!("{} succeeded", describe(operation_type)),
        )
    };
    let operation = last_operation(operation_type, state, description);

    let mut status = json!({
        "lastOperation": serde_json::to_value(operation)?,
        "lastError": Value::Null,
    });
    if !pending {
        if let Some(generation) = generation {
            status["observedGeneration"] = json!(generation);
        }
    }
    merge_objects(&mut status, extra);
    Ok(json!({ "status": status }))
}

/// Status patch for a failed operation
///
/// # Errors
///
/// Returns an error if the status cannot be serialized.
pub fn error_patch(operation_type: LastOperationType, err: &Error) -> Result<Value> {
    let state = if err.requeue_after().is_some() {
        LastOperationState::Error
    } else {
        LastOperationState::Failed
    };
    let operation = last_operation(operation_type, state, err.to_string());
    Ok(json!({
        "status": {
            "lastOperation": serde_json::to_value(operation)?,
            "lastError": serde_json::to_value(last_error(err))?,
        }
    }))
}

/// Merge the top-level keys of `extra` into `target`; later keys win.
pub fn merge_objects(target: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

/// Apply a JSON merge patch to the status subresource.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn patch_status<T>(client: &Client, resource: &T, patch: &Value) -> Result<()>
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
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    debug!(kind = %T::kind(&()), namespace = %namespace, name = %name, "patched status");
    Ok(())
}

fn describe(operation_type: LastOperationType) -> &'static str {
    match operation_type {
        LastOperationType::Create => "creation",
        LastOperationType::Reconcile => "reconciliation",
        LastOperationType::Delete => "deletion",
        LastOperationType::Migrate => "migration",
        LastOperationType::Restore => "restoration",
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
