// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire format `metal.provider.extensions.gardener.cloud/v1alpha1`.
//!
//! These types are embedded as raw extensions (`spec.providerConfig`,
//! `status.providerStatus`) in host platform resources. Field names are part of
//! the persisted format and must not change.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CloudProfileConfig
// ============================================================================

/// Provider section of a host `CloudProfile`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metal_control_planes: BTreeMap<String, MetalControlPlane>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetalControlPlane {
    #[serde(default)]
    pub endpoint: String,
    #[serde(rename = "iamconfig", default, skip_serializing_if = "Option::is_none")]
    pub iam_config: Option<IamConfig>,
    #[serde(default)]
    pub partitions: BTreeMap<String, Partition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firewall_images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firewall_controller_versions: Vec<FirewallControllerVersion>,
    #[serde(default)]
    pub nftables_exporter: NftablesExporter,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firewall_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_isolation: Option<NetworkIsolation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkIsolation {
    #[serde(default)]
    pub allowed_networks: AllowedNetworks,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_mirrors: Vec<RegistryMirror>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowedNetworks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMirror {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirror_of: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirewallControllerVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NftablesExporter {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_config: Option<IssuerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idm_config: Option<IdmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_config: Option<NamespaceGroupConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub client_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdmConfig {
    #[serde(rename = "idmtype", default)]
    pub idm_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceGroupConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excluded_namespaces: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expected_groups_list: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_max_length: Option<i64>,
}

// ============================================================================
// InfrastructureConfig / InfrastructureStatus
// ============================================================================

/// Provider section of an `Infrastructure` spec
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "partitionID", default)]
    pub partition_id: String,
    #[serde(rename = "projectID", default)]
    pub project_id: String,
    #[serde(default)]
    pub firewall: Firewall,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<Vec<RateLimit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_rules: Option<Vec<EgressRule>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub log_accepted_connections: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub controller_version: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    #[serde(rename = "networkID", default)]
    pub network_id: String,
    #[serde(default)]
    pub rate_limit: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EgressRule {
    #[serde(rename = "networkID", default)]
    pub network_id: String,
    #[serde(default)]
    pub ips: Vec<String>,
}

/// Provider section of an `Infrastructure` status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub firewall: FirewallStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FirewallStatus {
    #[serde(rename = "machineID", default)]
    pub machine_id: String,
    #[serde(default)]
    pub succeeded: bool,
}

// ============================================================================
// ControlPlaneConfig
// ============================================================================

/// Provider section of a `ControlPlane` spec
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<CloudControllerManagerConfig>,
    #[serde(rename = "iamconfig", default, skip_serializing_if = "Option::is_none")]
    pub iam_config: Option<IamConfig>,
    #[serde(default)]
    pub feature_gates: ControlPlaneFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_default_storage_class: Option<CustomDefaultStorageClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_access_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudControllerManagerConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_external_network: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_audit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_to_splunk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duros_storage_encryption: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomDefaultStorageClass {
    #[serde(default)]
    pub class_name: String,
}

// ============================================================================
// WorkerConfig / WorkerStatus
// ============================================================================

/// Provider section of a worker pool
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,
}

/// Provider section of a `Worker` status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MachineImage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub image: String,
}
