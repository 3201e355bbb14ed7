// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Extension resources of the host platform (`extensions.gardener.cloud/v1alpha1`).
//!
//! These CRDs are owned by the host platform; this crate only watches them and
//! patches their status. Provider payloads stay opaque [`RawExtension`]s until
//! decoded through [`crate::apis::codec`].

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{SecretReference, Taint};
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::garden::{CloudProfile, Seed, Shoot};
use crate::errors::{Error, Result};

/// Type of the last operation run on an extension resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationType {
    Create,
    Reconcile,
    Delete,
    Migrate,
    Restore,
}

/// State of the last operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationState {
    Processing,
    Succeeded,
    Error,
    Failed,
}

/// `status.lastOperation`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation_type: LastOperationType,
    pub state: LastOperationState,
    #[serde(default)]
    pub description: String,
    pub last_update_time: DateTime<Utc>,
    #[serde(default)]
    pub progress: i32,
}

/// `status.lastError`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
}

/// Status fields shared by all extension resources
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<RawExtension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RawExtension>,
}

// ============================================================================
// Infrastructure
// ============================================================================

/// Infrastructure of one shoot
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Infrastructure",
    namespaced,
    status = "InfrastructureStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<RawExtension>,
    #[serde(default)]
    pub region: String,
    pub secret_ref: SecretReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
}

/// Status of an [`Infrastructure`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    #[serde(flatten)]
    pub default: DefaultStatus,
    #[serde(rename = "nodesCIDR", default, skip_serializing_if = "Option::is_none")]
    pub nodes_cidr: Option<String>,
}

// ============================================================================
// Worker
// ============================================================================

/// Machine pools of one shoot
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Worker",
    namespaced,
    status = "WorkerStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<RawExtension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider_status: Option<RawExtension>,
    #[serde(default)]
    pub region: String,
    pub secret_ref: SecretReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(default)]
    pub pools: Vec<WorkerPool>,
}

/// One machine pool
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    pub name: String,
    pub machine_type: String,
    pub machine_image: MachineImageRef,
    #[serde(default)]
    pub minimum: i32,
    #[serde(default)]
    pub maximum: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<RawExtension>,
    /// Base64 encoded user data
    #[serde(default)]
    pub user_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Machine image name and version of a pool
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImageRef {
    pub name: String,
    pub version: String,
}

/// Status of a [`Worker`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    #[serde(flatten)]
    pub default: DefaultStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_deployments: Vec<MachineDeploymentSummary>,
}

/// A generated machine deployment as reported in [`WorkerStatus`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDeploymentSummary {
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
}

// ============================================================================
// ControlPlane
// ============================================================================

/// Provider-specific control plane of one shoot
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "ControlPlane",
    namespaced,
    status = "ControlPlaneStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<RawExtension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider_status: Option<RawExtension>,
    #[serde(default)]
    pub region: String,
    pub secret_ref: SecretReference,
    /// `normal` or `exposure`; only `normal` is handled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// Status of a [`ControlPlane`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneStatus {
    #[serde(flatten)]
    pub default: DefaultStatus,
}

// ============================================================================
// Cluster
// ============================================================================

/// Snapshot of a shoot together with its cloud profile and seed.
///
/// The cluster resource is named after the shoot's seed namespace.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Cluster",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub cloud_profile: RawExtension,
    pub seed: RawExtension,
    pub shoot: RawExtension,
}

/// A [`Cluster`] with its embedded objects decoded
#[derive(Clone, Debug)]
pub struct ClusterContext {
    pub cloud_profile: CloudProfile,
    pub seed: Seed,
    pub shoot: Shoot,
}

impl ClusterContext {
    /// Decode the embedded objects of a [`Cluster`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProviderConfig`] if any embedded object is malformed.
    pub fn from_cluster(cluster: &Cluster) -> Result<Self> {
        Ok(Self {
            cloud_profile: decode_embedded(&cluster.spec.cloud_profile, "cloudProfile")?,
            seed: decode_embedded(&cluster.spec.seed, "seed")?,
            shoot: decode_embedded(&cluster.spec.shoot, "shoot")?,
        })
    }

    /// UID of the shoot, used as cluster id on metal entities
    #[must_use]
    pub fn shoot_uid(&self) -> String {
        self.shoot.metadata.uid.clone().unwrap_or_default()
    }

    /// Name of the seed hosting the shoot's control plane
    #[must_use]
    pub fn seed_name(&self) -> String {
        self.seed.metadata.name.clone().unwrap_or_default()
    }

    /// `true` if the shoot is (being) hibernated
    #[must_use]
    pub fn is_hibernated(&self) -> bool {
        self.shoot
            .spec
            .hibernation
            .as_ref()
            .and_then(|h| h.enabled)
            .unwrap_or(false)
    }
}

fn decode_embedded<T: serde::de::DeserializeOwned>(raw: &RawExtension, field: &str) -> Result<T> {
    serde_json::from_value(raw.0.clone())
        .map_err(|e| Error::InvalidProviderConfig(format!("cluster {field} is malformed: {e}")))
}
