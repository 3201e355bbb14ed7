// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resources of the firewall-controller-manager (`firewall.metal-stack.io/v2`)
//! and the cluster-wide network policies of the firewall controller
//! (`metal-stack.io/v1`).
//!
//! The firewall-controller-manager owns these CRDs. This crate creates
//! [`FirewallDeployment`]s, reads and restores [`Firewall`]s during migration
//! and manages [`ClusterwideNetworkPolicy`] objects for control plane egress.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API group of the firewall-controller-manager
pub const FIREWALL_API_GROUP: &str = "firewall.metal-stack.io";

/// API version of the firewall-controller-manager resources
pub const FIREWALL_API_VERSION: &str = "v2";

/// Status of the firewall resources is owned by the firewall-controller-manager
pub type FirewallManagedStatus = serde_json::Value;

/// Desired firewall fleet of one shoot
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "firewall.metal-stack.io",
    version = "v2",
    kind = "FirewallDeployment",
    namespaced,
    status = "FirewallManagedStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct FirewallDeploymentSpec {
    pub replicas: i32,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub template: FirewallTemplateSpec,
}

/// One revision of a firewall deployment
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "firewall.metal-stack.io",
    version = "v2",
    kind = "FirewallSet",
    namespaced,
    status = "FirewallManagedStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct FirewallSetSpec {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub template: FirewallTemplateSpec,
}

/// Template of the firewalls of a deployment or set
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallTemplateSpec {
    #[serde(default)]
    pub metadata: TemplateMetadata,
    #[serde(default)]
    pub spec: FirewallSpec,
}

/// Labels and annotations stamped onto templated firewalls
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A single firewall machine
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "firewall.metal-stack.io",
    version = "v2",
    kind = "Firewall",
    namespaced,
    status = "FirewallManagedStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct FirewallSpec {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub userdata: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_public_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<Vec<RateLimit>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_rules: Option<Vec<EgressRuleSnat>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub controller_version: String,
    #[serde(rename = "controllerURL", default, skip_serializing_if = "String::is_empty")]
    pub controller_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nftables_exporter_version: String,
    #[serde(rename = "nftablesExporterURL", default, skip_serializing_if = "String::is_empty")]
    pub nftables_exporter_url: String,
    #[serde(default)]
    pub log_accepted_connections: bool,
}

/// Bandwidth limit of a firewall network
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(rename = "networkID")]
    pub network_id: String,
    pub rate: u32,
}

/// SNAT egress IPs of a firewall network
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRuleSnat {
    #[serde(rename = "networkID")]
    pub network_id: String,
    #[serde(default)]
    pub ips: Vec<String>,
}

// ============================================================================
// ClusterwideNetworkPolicy
// ============================================================================

/// Egress policy enforced by the firewall controller
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "metal-stack.io",
    version = "v1",
    kind = "ClusterwideNetworkPolicy",
    namespaced,
    schema = "disabled"
)]
pub struct PolicySpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<EgressRule>,
}

/// One egress rule of a [`ClusterwideNetworkPolicy`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EgressRule {
    #[serde(default)]
    pub to: Vec<IpBlock>,
    #[serde(default)]
    pub ports: Vec<PolicyPort>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IpBlock {
    pub cidr: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyPort {
    pub protocol: String,
    pub port: i32,
}

impl ClusterwideNetworkPolicy {
    /// A policy allowing TCP egress to `cidrs` on `ports`
    #[must_use]
    pub fn allow_tcp_egress(name: &str, namespace: &str, cidrs: &[String], ports: &[i32]) -> Self {
        let mut policy = Self::new(
            name,
            PolicySpec {
                egress: vec![EgressRule {
                    to: cidrs
                        .iter()
                        .map(|cidr| IpBlock { cidr: cidr.clone() })
                        .collect(),
                    ports: ports
                        .iter()
                        .map(|port| PolicyPort {
                            protocol: "TCP".to_string(),
                            port: *port,
                        })
                        .collect(),
                }],
            },
        );
        policy.metadata.namespace = Some(namespace.to_string());
        policy
    }
}

// ============================================================================
// FirewallMonitor
// ============================================================================

/// `FirewallMonitor` objects live in the shoot and are written by the firewall
/// controller; they are read dynamically because only the machine id matters.
#[must_use]
pub fn firewall_monitor_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(
        FIREWALL_API_GROUP,
        FIREWALL_API_VERSION,
        "FirewallMonitor",
    ))
}

/// Machine id reported by a firewall monitor (`machineStatus.machineID`).
#[must_use]
pub fn monitor_machine_id(monitor: &DynamicObject) -> Option<String> {
    monitor
        .data
        .get("machineStatus")
        .and_then(|status| status.get("machineID"))
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Clear the fields that must not survive a move to another seed.
pub fn strip_for_migration(meta: &mut ObjectMeta) {
    meta.resource_version = None;
    meta.owner_references = None;
    meta.uid = None;
    meta.creation_timestamp = None;
    meta.managed_fields = None;
    meta.generation = None;
}

#[cfg(test)]
#[path = "fcm_tests.rs"]
mod fcm_tests;
