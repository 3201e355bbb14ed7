// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Internal (version-independent) provider configuration types.
//!
//! Reconcilers, validation and admission only ever see these types. The wire
//! representation lives in [`crate::apis::v1alpha1`]; [`crate::apis::codec`]
//! converts between the two.

use std::collections::BTreeMap;

/// Firewall-controller version classification: not yet recommended
pub const CLASSIFICATION_PREVIEW: &str = "preview";
/// Firewall-controller version classification: recommended
pub const CLASSIFICATION_SUPPORTED: &str = "supported";
/// Firewall-controller version classification: still allowed, being phased out
pub const CLASSIFICATION_DEPRECATED: &str = "deprecated";

/// All accepted classification values
pub const CLASSIFICATIONS: [&str; 3] = [
    CLASSIFICATION_PREVIEW,
    CLASSIFICATION_SUPPORTED,
    CLASSIFICATION_DEPRECATED,
];

/// Network access type: unrestricted
pub const NETWORK_ACCESS_BASELINE: &str = "baseline";
/// Network access type: egress only through the partition's isolation config
pub const NETWORK_ACCESS_RESTRICTED: &str = "restricted";
/// Network access type: no external egress at all
pub const NETWORK_ACCESS_FORBIDDEN: &str = "forbidden";

/// All accepted network access types
pub const NETWORK_ACCESS_TYPES: [&str; 3] = [
    NETWORK_ACCESS_BASELINE,
    NETWORK_ACCESS_RESTRICTED,
    NETWORK_ACCESS_FORBIDDEN,
];

// ============================================================================
// CloudProfileConfig
// ============================================================================

/// Catalog of metal control planes offered by a cloud profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloudProfileConfig {
    /// Metal control planes keyed by logical name (e.g. `prod`)
    pub metal_control_planes: BTreeMap<String, MetalControlPlane>,
}

/// One metal-API deployment and what it offers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetalControlPlane {
    /// Metal-API endpoint URL
    pub endpoint: String,
    /// Cloud-profile level IAM defaults
    pub iam_config: Option<IamConfig>,
    /// Partitions keyed by name; names match the host cloud-profile zones
    pub partitions: BTreeMap<String, Partition>,
    /// Allowed firewall OS images (`<os>-<semver>`)
    pub firewall_images: Vec<String>,
    /// Allowed firewall-controller versions
    pub firewall_controller_versions: Vec<FirewallControllerVersion>,
    /// nftables exporter shipped to firewalls
    pub nftables_exporter: NftablesExporter,
}

/// A partition of a metal control plane.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Machine sizes usable for firewalls; the first one is the default
    pub firewall_types: Vec<String>,
    /// Egress/ingress restrictions for non-baseline network access
    pub network_isolation: Option<NetworkIsolation>,
}

/// Network isolation settings of a partition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkIsolation {
    /// CIDRs reachable from isolated clusters
    pub allowed_networks: AllowedNetworks,
    /// DNS servers usable by isolated clusters (at most three)
    pub dns_servers: Vec<String>,
    /// NTP servers usable by isolated clusters
    pub ntp_servers: Vec<String>,
    /// Registry mirrors reachable from isolated clusters
    pub registry_mirrors: Vec<RegistryMirror>,
}

/// Allowed ingress and egress CIDRs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowedNetworks {
    pub ingress: Vec<String>,
    pub egress: Vec<String>,
}

/// A container registry mirror.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryMirror {
    /// Display name
    pub name: String,
    /// `http(s)://` endpoint of the mirror
    pub endpoint: String,
    /// IP address the endpoint resolves to
    pub ip: String,
    /// TCP port of the endpoint
    pub port: i32,
    /// Registry hosts this mirror serves
    pub mirror_of: Vec<String>,
}

/// An allowed firewall-controller release.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirewallControllerVersion {
    /// Semantic version tag (e.g. `v2.0.3`)
    pub version: String,
    /// Download URL of the binary
    pub url: String,
    /// One of [`CLASSIFICATIONS`]
    pub classification: Option<String>,
}

/// nftables exporter release.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NftablesExporter {
    pub version: String,
    pub url: String,
}

/// Identity and access configuration of a cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IamConfig {
    pub issuer_config: Option<IssuerConfig>,
    pub idm_config: Option<IdmConfig>,
    pub group_config: Option<NamespaceGroupConfig>,
}

/// OIDC issuer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IssuerConfig {
    pub url: String,
    pub client_id: String,
}

/// Identity management backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdmConfig {
    pub idm_type: String,
}

/// Parameters of the group-rolebinding controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceGroupConfig {
    /// Comma separated namespaces to ignore
    pub excluded_namespaces: String,
    /// Comma separated groups expected per namespace
    pub expected_groups_list: String,
    /// Maximum namespace name length; positive when set
    pub namespace_max_length: Option<i64>,
}

// ============================================================================
// InfrastructureConfig / InfrastructureStatus
// ============================================================================

/// Provider configuration of an `Infrastructure` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfrastructureConfig {
    pub partition_id: String,
    pub project_id: String,
    pub firewall: Firewall,
}

/// The per-shoot firewall.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Firewall {
    /// Machine size
    pub size: String,
    /// OS image (`<os>-<semver>`)
    pub image: String,
    /// External network ids
    pub networks: Vec<String>,
    pub rate_limits: Option<Vec<RateLimit>>,
    /// SNAT egress rules
    pub egress_rules: Option<Vec<EgressRule>>,
    pub log_accepted_connections: bool,
    /// Firewall-controller version or [`crate::constants::FIREWALL_CONTROLLER_VERSION_AUTO`]
    pub controller_version: String,
}

/// Bandwidth limit of one firewall network in MBit/s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub network_id: String,
    pub rate_limit: u32,
}

/// SNAT egress IPs of one firewall network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EgressRule {
    pub network_id: String,
    pub ips: Vec<String>,
}

/// Provider status of an `Infrastructure` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfrastructureStatus {
    pub firewall: FirewallStatus,
}

/// Allocation state of the firewall machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirewallStatus {
    /// Encoded machine id (`metal:///<partition>/<uuid>`); empty until allocated
    pub machine_id: String,
    /// `true` once the metal API reports a finished allocation
    pub succeeded: bool,
}

// ============================================================================
// ControlPlaneConfig
// ============================================================================

/// Provider configuration of a `ControlPlane` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlPlaneConfig {
    pub cloud_controller_manager: Option<CloudControllerManagerConfig>,
    pub iam_config: Option<IamConfig>,
    pub feature_gates: ControlPlaneFeatures,
    pub custom_default_storage_class: Option<CustomDefaultStorageClass>,
    /// One of [`NETWORK_ACCESS_TYPES`]; `None` means baseline
    pub network_access_type: Option<String>,
}

impl ControlPlaneConfig {
    /// Effective network access type.
    #[must_use]
    pub fn network_access_type(&self) -> &str {
        self.network_access_type
            .as_deref()
            .unwrap_or(NETWORK_ACCESS_BASELINE)
    }
}

/// Cloud-controller-manager overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloudControllerManagerConfig {
    pub feature_gates: BTreeMap<String, bool>,
    /// Network used for `LoadBalancer` IPs instead of the labelled default
    pub default_external_network: Option<String>,
}

/// Opt-in control plane add-ons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlPlaneFeatures {
    pub cluster_audit: Option<bool>,
    pub audit_to_splunk: Option<bool>,
    pub duros_storage_encryption: Option<bool>,
}

/// Storage class to mark as default instead of the provider's.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomDefaultStorageClass {
    pub class_name: String,
}

// ============================================================================
// WorkerConfig / WorkerStatus
// ============================================================================

/// Provider configuration of a worker pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerConfig {
    pub feature_gates: BTreeMap<String, bool>,
}

/// Provider status of a `Worker` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Images in use; kept so reconciliation works after a cloud-profile removal
    pub machine_images: Vec<MachineImage>,
}

/// A resolved machine image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MachineImage {
    pub name: String,
    pub version: String,
    /// Metal image id
    pub image: String,
}
