// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resources of the machine-controller-manager (`machine.sapcloud.io/v1alpha1`).
//!
//! `MachineClass` carries its provider payload at the top level instead of in
//! a `spec`, so it is handled as a [`DynamicObject`].

use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ApiResource, GroupVersionKind};
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API group of the machine-controller-manager
pub const MACHINE_API_GROUP: &str = "machine.sapcloud.io";

/// API version of the machine-controller-manager resources
pub const MACHINE_API_VERSION: &str = "v1alpha1";

/// Kind of machine classes
pub const MACHINE_CLASS_KIND: &str = "MachineClass";

/// API resource of `MachineClass`
#[must_use]
pub fn machine_class_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        MACHINE_API_GROUP,
        MACHINE_API_VERSION,
        MACHINE_CLASS_KIND,
    ))
}

/// Kind of machine sets
pub const MACHINE_SET_KIND: &str = "MachineSet";

/// Kind of machines
pub const MACHINE_KIND: &str = "Machine";

/// API resource of `MachineSet`
#[must_use]
pub fn machine_set_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        MACHINE_API_GROUP,
        MACHINE_API_VERSION,
        MACHINE_SET_KIND,
    ))
}

/// API resource of `Machine`
#[must_use]
pub fn machine_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        MACHINE_API_GROUP,
        MACHINE_API_VERSION,
        MACHINE_KIND,
    ))
}

/// Provider payload of a metal machine class (`providerSpec`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalMachineClassSpec {
    pub partition: String,
    pub size: String,
    pub project: String,
    /// Private network id of the shoot
    pub network: String,
    pub image: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sshkeys: Vec<String>,
}

/// Rolling set of machines of one worker pool
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "machine.sapcloud.io",
    version = "v1alpha1",
    kind = "MachineDeployment",
    namespaced,
    status = "MachineDeploymentStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentSpec {
    pub replicas: i32,
    #[serde(default)]
    pub min_ready_seconds: i32,
    pub strategy: MachineDeploymentStrategy,
    pub selector: MachineSelector,
    pub template: MachineTemplateSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdate>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<IntOrString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineTemplateSpec {
    #[serde(default)]
    pub metadata: MachineTemplateMetadata,
    pub spec: MachineSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineTemplateMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    pub class: ClassSpec,
    #[serde(default)]
    pub node_template: NodeTemplateSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub kind: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplateSpec {
    #[serde(default)]
    pub metadata: NodeTemplateMetadata,
    #[serde(default)]
    pub spec: NodeTemplateNodeSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplateMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplateNodeSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
}

/// Status reported by the machine-controller-manager
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
}
