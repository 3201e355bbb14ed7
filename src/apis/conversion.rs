// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Conversions between the internal types and the `v1alpha1` wire types.
//!
//! Conversions are total in both directions. Top-level wire values leave
//! `apiVersion`/`kind` unset; [`crate::apis::codec::encode`] fills them in.

use super::metal as internal;
use super::v1alpha1 as wire;

fn map_vec<A, B: From<A>>(items: Vec<A>) -> Vec<B> {
    items.into_iter().map(B::from).collect()
}

fn map_opt_vec<A, B: From<A>>(items: Option<Vec<A>>) -> Option<Vec<B>> {
    items.map(map_vec)
}

// ============================================================================
// CloudProfileConfig
// ============================================================================

impl From<wire::CloudProfileConfig> for internal::CloudProfileConfig {
    fn from(w: wire::CloudProfileConfig) -> Self {
        Self {
            metal_control_planes: w
                .metal_control_planes
                .into_iter()
                .map(|(name, cp)| (name, cp.into()))
                .collect(),
        }
    }
}

impl From<internal::CloudProfileConfig> for wire::CloudProfileConfig {
    fn from(i: internal::CloudProfileConfig) -> Self {
        Self {
            api_version: None,
            kind: None,
            metal_control_planes: i
                .metal_control_planes
                .into_iter()
                .map(|(name, cp)| (name, cp.into()))
                .collect(),
        }
    }
}

impl From<wire::MetalControlPlane> for internal::MetalControlPlane {
    fn from(w: wire::MetalControlPlane) -> Self {
        Self {
            endpoint: w.endpoint,
            iam_config: w.iam_config.map(Into::into),
            partitions: w
                .partitions
                .into_iter()
                .map(|(name, p)| (name, p.into()))
                .collect(),
            firewall_images: w.firewall_images,
            firewall_controller_versions: map_vec(w.firewall_controller_versions),
            nftables_exporter: w.nftables_exporter.into(),
        }
    }
}

impl From<internal::MetalControlPlane> for wire::MetalControlPlane {
    fn from(i: internal::MetalControlPlane) -> Self {
        Self {
            endpoint: i.endpoint,
            iam_config: i.iam_config.map(Into::into),
            partitions: i
                .partitions
                .into_iter()
                .map(|(name, p)| (name, p.into()))
                .collect(),
            firewall_images: i.firewall_images,
            firewall_controller_versions: map_vec(i.firewall_controller_versions),
            nftables_exporter: i.nftables_exporter.into(),
        }
    }
}

impl From<wire::Partition> for internal::Partition {
    fn from(w: wire::Partition) -> Self {
        Self {
            firewall_types: w.firewall_types,
            network_isolation: w.network_isolation.map(Into::into),
        }
    }
}

impl From<internal::Partition> for wire::Partition {
    fn from(i: internal::Partition) -> Self {
        Self {
            firewall_types: i.firewall_types,
            network_isolation: i.network_isolation.map(Into::into),
        }
    }
}

impl From<wire::NetworkIsolation> for internal::NetworkIsolation {
    fn from(w: wire::NetworkIsolation) -> Self {
        Self {
            allowed_networks: internal::AllowedNetworks {
                ingress: w.allowed_networks.ingress,
                egress: w.allowed_networks.egress,
            },
            dns_servers: w.dns_servers,
            ntp_servers: w.ntp_servers,
            registry_mirrors: map_vec(w.registry_mirrors),
        }
    }
}

impl From<internal::NetworkIsolation> for wire::NetworkIsolation {
    fn from(i: internal::NetworkIsolation) -> Self {
        Self {
            allowed_networks: wire::AllowedNetworks {
                ingress: i.allowed_networks.ingress,
                egress: i.allowed_networks.egress,
            },
            dns_servers: i.dns_servers,
            ntp_servers: i.ntp_servers,
            registry_mirrors: map_vec(i.registry_mirrors),
        }
    }
}

impl From<wire::RegistryMirror> for internal::RegistryMirror {
    fn from(w: wire::RegistryMirror) -> Self {
        Self {
            name: w.name,
            endpoint: w.endpoint,
            ip: w.ip,
            port: w.port,
            mirror_of: w.mirror_of,
        }
    }
}

impl From<internal::RegistryMirror> for wire::RegistryMirror {
    fn from(i: internal::RegistryMirror) -> Self {
        Self {
            name: i.name,
            endpoint: i.endpoint,
            ip: i.ip,
            port: i.port,
            mirror_of: i.mirror_of,
        }
    }
}

impl From<wire::FirewallControllerVersion> for internal::FirewallControllerVersion {
    fn from(w: wire::FirewallControllerVersion) -> Self {
        Self {
            version: w.version,
            url: w.url,
            classification: w.classification,
        }
    }
}

impl From<internal::FirewallControllerVersion> for wire::FirewallControllerVersion {
    fn from(i: internal::FirewallControllerVersion) -> Self {
        Self {
            version: i.version,
            url: i.url,
            classification: i.classification,
        }
    }
}

impl From<wire::NftablesExporter> for internal::NftablesExporter {
    fn from(w: wire::NftablesExporter) -> Self {
        Self {
            version: w.version,
            url: w.url,
        }
    }
}

impl From<internal::NftablesExporter> for wire::NftablesExporter {
    fn from(i: internal::NftablesExporter) -> Self {
        Self {
            version: i.version,
            url: i.url,
        }
    }
}

impl From<wire::IamConfig> for internal::IamConfig {
    fn from(w: wire::IamConfig) -> Self {
        Self {
            issuer_config: w.issuer_config.map(|c| internal::IssuerConfig {
                url: c.url,
                client_id: c.client_id,
            }),
            idm_config: w.idm_config.map(|c| internal::IdmConfig {
                idm_type: c.idm_type,
            }),
            group_config: w.group_config.map(|c| internal::NamespaceGroupConfig {
                excluded_namespaces: c.excluded_namespaces,
                expected_groups_list: c.expected_groups_list,
                namespace_max_length: c.namespace_max_length,
            }),
        }
    }
}

impl From<internal::IamConfig> for wire::IamConfig {
    fn from(i: internal::IamConfig) -> Self {
        Self {
            issuer_config: i.issuer_config.map(|c| wire::IssuerConfig {
                url: c.url,
                client_id: c.client_id,
            }),
            idm_config: i.idm_config.map(|c| wire::IdmConfig {
                idm_type: c.idm_type,
            }),
            group_config: i.group_config.map(|c| wire::NamespaceGroupConfig {
                excluded_namespaces: c.excluded_namespaces,
                expected_groups_list: c.expected_groups_list,
                namespace_max_length: c.namespace_max_length,
            }),
        }
    }
}

// ============================================================================
// InfrastructureConfig / InfrastructureStatus
// ============================================================================

impl From<wire::InfrastructureConfig> for internal::InfrastructureConfig {
    fn from(w: wire::InfrastructureConfig) -> Self {
        Self {
            partition_id: w.partition_id,
            project_id: w.project_id,
            firewall: w.firewall.into(),
        }
    }
}

impl From<internal::InfrastructureConfig> for wire::InfrastructureConfig {
    fn from(i: internal::InfrastructureConfig) -> Self {
        Self {
            api_version: None,
            kind: None,
            partition_id: i.partition_id,
            project_id: i.project_id,
            firewall: i.firewall.into(),
        }
    }
}

impl From<wire::Firewall> for internal::Firewall {
    fn from(w: wire::Firewall) -> Self {
        Self {
            size: w.size,
            image: w.image,
            networks: w.networks,
            rate_limits: map_opt_vec(w.rate_limits),
            egress_rules: map_opt_vec(w.egress_rules),
            log_accepted_connections: w.log_accepted_connections,
            controller_version: w.controller_version,
        }
    }
}

impl From<internal::Firewall> for wire::Firewall {
    fn from(i: internal::Firewall) -> Self {
        Self {
            size: i.size,
            image: i.image,
            networks: i.networks,
            rate_limits: map_opt_vec(i.rate_limits),
            egress_rules: map_opt_vec(i.egress_rules),
            log_accepted_connections: i.log_accepted_connections,
            controller_version: i.controller_version,
        }
    }
}

impl From<wire::RateLimit> for internal::RateLimit {
    fn from(w: wire::RateLimit) -> Self {
        Self {
            network_id: w.network_id,
            rate_limit: w.rate_limit,
        }
    }
}

impl From<internal::RateLimit> for wire::RateLimit {
    fn from(i: internal::RateLimit) -> Self {
        Self {
            network_id: i.network_id,
            rate_limit: i.rate_limit,
        }
    }
}

impl From<wire::EgressRule> for internal::EgressRule {
    fn from(w: wire::EgressRule) -> Self {
        Self {
            network_id: w.network_id,
            ips: w.ips,
        }
    }
}

impl From<internal::EgressRule> for wire::EgressRule {
    fn from(i: internal::EgressRule) -> Self {
        Self {
            network_id: i.network_id,
            ips: i.ips,
        }
    }
}

impl From<wire::InfrastructureStatus> for internal::InfrastructureStatus {
    fn from(w: wire::InfrastructureStatus) -> Self {
        Self {
            firewall: internal::FirewallStatus {
                machine_id: w.firewall.machine_id,
                succeeded: w.firewall.succeeded,
            },
        }
    }
}

impl From<internal::InfrastructureStatus> for wire::InfrastructureStatus {
    fn from(i: internal::InfrastructureStatus) -> Self {
        Self {
            api_version: None,
            kind: None,
            firewall: wire::FirewallStatus {
                machine_id: i.firewall.machine_id,
                succeeded: i.firewall.succeeded,
            },
        }
    }
}

// ============================================================================
// ControlPlaneConfig
// ============================================================================

impl From<wire::ControlPlaneConfig> for internal::ControlPlaneConfig {
    fn from(w: wire::ControlPlaneConfig) -> Self {
        Self {
            cloud_controller_manager: w.cloud_controller_manager.map(|c| {
                internal::CloudControllerManagerConfig {
                    feature_gates: c.feature_gates,
                    default_external_network: c.default_external_network,
                }
            }),
            iam_config: w.iam_config.map(Into::into),
            feature_gates: internal::ControlPlaneFeatures {
                cluster_audit: w.feature_gates.cluster_audit,
                audit_to_splunk: w.feature_gates.audit_to_splunk,
                duros_storage_encryption: w.feature_gates.duros_storage_encryption,
            },
            custom_default_storage_class: w.custom_default_storage_class.map(|c| {
                internal::CustomDefaultStorageClass {
                    class_name: c.class_name,
                }
            }),
            network_access_type: w.network_access_type,
        }
    }
}

impl From<internal::ControlPlaneConfig> for wire::ControlPlaneConfig {
    fn from(i: internal::ControlPlaneConfig) -> Self {
        Self {
            api_version: None,
            kind: None,
            cloud_controller_manager: i.cloud_controller_manager.map(|c| {
                wire::CloudControllerManagerConfig {
                    feature_gates: c.feature_gates,
                    default_external_network: c.default_external_network,
                }
            }),
            iam_config: i.iam_config.map(Into::into),
            feature_gates: wire::ControlPlaneFeatures {
                cluster_audit: i.feature_gates.cluster_audit,
                audit_to_splunk: i.feature_gates.audit_to_splunk,
                duros_storage_encryption: i.feature_gates.duros_storage_encryption,
            },
            custom_default_storage_class: i.custom_default_storage_class.map(|c| {
                wire::CustomDefaultStorageClass {
                    class_name: c.class_name,
                }
            }),
            network_access_type: i.network_access_type,
        }
    }
}

// ============================================================================
// WorkerConfig / WorkerStatus
// ============================================================================

impl From<wire::WorkerConfig> for internal::WorkerConfig {
    fn from(w: wire::WorkerConfig) -> Self {
        Self {
            feature_gates: w.feature_gates,
        }
    }
}

impl From<internal::WorkerConfig> for wire::WorkerConfig {
    fn from(i: internal::WorkerConfig) -> Self {
        Self {
            api_version: None,
            kind: None,
            feature_gates: i.feature_gates,
        }
    }
}

impl From<wire::WorkerStatus> for internal::WorkerStatus {
    fn from(w: wire::WorkerStatus) -> Self {
        Self {
            machine_images: w
                .machine_images
                .into_iter()
                .map(|m| internal::MachineImage {
                    name: m.name,
                    version: m.version,
                    image: m.image,
                })
                .collect(),
        }
    }
}

impl From<internal::WorkerStatus> for wire::WorkerStatus {
    fn from(i: internal::WorkerStatus) -> Self {
        Self {
            api_version: None,
            kind: None,
            machine_images: i
                .machine_images
                .into_iter()
                .map(|m| wire::MachineImage {
                    name: m.name,
                    version: m.version,
                    image: m.image,
                })
                .collect(),
        }
    }
}
