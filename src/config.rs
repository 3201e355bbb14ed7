// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! [`ControllerConfig`] is read from the YAML file passed to the controller
//! manager with `--config-file`. [`DefaulterConfig`] is read once from the
//! `DEFAULTER_*` environment variables by the admission server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::constants::DEFAULT_MAX_CONCURRENT_RECONCILES;
use crate::errors::{Error, Result};

// ============================================================================
// Controller configuration
// ============================================================================

/// Configuration of the controller manager
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Mapping of worker machine images to metal image ids
    pub machine_images: Vec<MachineImageMapping>,
    /// Audit log forwarding of the shoot API server
    pub cluster_audit: Toggle,
    /// Forwarding of audit logs to splunk
    pub audit_to_splunk: Toggle,
    pub accounting_exporter: AccountingExporterConfig,
    pub storage: StorageConfig,
    pub concurrency: ConcurrencyConfig,
}

impl ControllerConfig {
    /// Read the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidProviderConfig(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse the configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Yaml`] if the input is malformed.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Metal image id configured for a machine image, if any
    #[must_use]
    pub fn machine_image(&self, name: &str, version: &str) -> Option<&str> {
        self.machine_images
            .iter()
            .find(|m| m.name == name && m.version == version)
            .map(|m| m.image.as_str())
    }

    /// Internal prefixes handed to the firewall; empty unless network traffic
    /// accounting is enabled
    #[must_use]
    pub fn firewall_internal_prefixes(&self) -> Vec<String> {
        let traffic = &self.accounting_exporter.network_traffic;
        if self.accounting_exporter.enabled && traffic.enabled {
            traffic.internal_networks.clone()
        } else {
            Vec::new()
        }
    }
}

/// Maps a worker machine image to a metal image id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImageMapping {
    pub name: String,
    pub version: String,
    pub image: String,
}

/// A feature switch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

/// Accounting exporter of the shoot control plane
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountingExporterConfig {
    pub enabled: bool,
    pub network_traffic: NetworkTrafficConfig,
    pub client: AccountingClientConfig,
}

/// Network traffic accounting on the firewall
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkTrafficConfig {
    pub enabled: bool,
    pub internal_networks: Vec<String>,
}

/// Connection to the accounting sink
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountingClientConfig {
    pub hostname: String,
    pub port: i32,
    pub ca: String,
    pub cert: String,
    pub cert_key: String,
}

/// Storage integrations
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub duros: DurosConfig,
}

/// Duros storage keyed by seed name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurosConfig {
    pub enabled: bool,
    pub seed_config: BTreeMap<String, DurosSeedConfig>,
}

/// Duros endpoints and credentials of one seed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurosSeedConfig {
    pub endpoints: Vec<String>,
    pub admin_key: String,
    pub admin_token: String,
    pub storage_classes: Vec<DurosStorageClass>,
}

/// A storage class offered to the shoot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurosStorageClass {
    pub name: String,
    pub replica_count: i32,
    pub compression: bool,
    pub encryption: bool,
}

/// Concurrency defaults of the controllers; command line flags take precedence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcurrencyConfig {
    pub control_plane: Option<u16>,
    pub infrastructure: Option<u16>,
    pub worker: Option<u16>,
}

impl ConcurrencyConfig {
    /// Effective concurrency of a controller: flag, then file, then the default.
    /// Zero counts as unset.
    #[must_use]
    pub fn resolve(flag: Option<u16>, configured: Option<u16>) -> u16 {
        flag.filter(|c| *c > 0)
            .or(configured.filter(|c| *c > 0))
            .unwrap_or(DEFAULT_MAX_CONCURRENT_RECONCILES)
    }
}

// ============================================================================
// Defaulter configuration
// ============================================================================

/// Defaults applied to shoots by the mutating webhook
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaulterConfig {
    pub allowed_privileged_containers: bool,
    pub max_pods: i32,
    pub node_cidr_mask_size: i32,
    pub pods_cidr: String,
    pub services_cidr: String,
    pub network_type: String,
    pub calico_backend: String,
    pub calico_kube_proxy_enabled: bool,
    pub calico_pool_mode: String,
    pub calico_typha_enabled: bool,
    pub cilium_hubble_enabled: bool,
    pub cilium_kube_proxy_enabled: bool,
    pub cilium_psp_enabled: bool,
    pub cilium_tunnel: String,
    pub cilium_devices: Vec<String>,
    pub cilium_direct_routing_device: String,
    pub cilium_bgp_control_plane: bool,
    pub cilium_ipv4_native_routing_cidr_enabled: bool,
    pub cilium_load_balancing_mode: String,
    pub cilium_mtu: i32,
}

impl Default for DefaulterConfig {
    fn default() -> Self {
        Self {
            allowed_privileged_containers: true,
            max_pods: 250,
            node_cidr_mask_size: 23,
            pods_cidr: "10.240.0.0/13".to_string(),
            services_cidr: "10.248.0.0/18".to_string(),
            network_type: "calico".to_string(),
            calico_backend: "none".to_string(),
            calico_kube_proxy_enabled: true,
            calico_pool_mode: "Never".to_string(),
            calico_typha_enabled: false,
            cilium_hubble_enabled: true,
            cilium_kube_proxy_enabled: false,
            cilium_psp_enabled: false,
            cilium_tunnel: "disabled".to_string(),
            cilium_devices: vec!["lan+".to_string(), "lo".to_string()],
            cilium_direct_routing_device: "lo".to_string(),
            cilium_bgp_control_plane: true,
            cilium_ipv4_native_routing_cidr_enabled: true,
            cilium_load_balancing_mode: "DSR".to_string(),
            cilium_mtu: 1440,
        }
    }
}

/// Prefix of the defaulter environment variables
pub const DEFAULTER_ENV_PREFIX: &str = "DEFAULTER_";

impl DefaulterConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a full variable
    /// name to its value. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |name: &str| {
            lookup(&format!("{DEFAULTER_ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        parse_into(&get, "ALLOWEDPRIVILEGEDCONTAINERS", &mut config.allowed_privileged_containers);
        parse_into(&get, "MAXPODS", &mut config.max_pods);
        parse_into(&get, "NODECIDRMASKSIZE", &mut config.node_cidr_mask_size);
        parse_into(&get, "PODSCIDR", &mut config.pods_cidr);
        parse_into(&get, "SERVICESCIDR", &mut config.services_cidr);
        parse_into(&get, "NETWORKTYPE", &mut config.network_type);
        parse_into(&get, "CALICOBACKEND", &mut config.calico_backend);
        parse_into(&get, "CALICOKUBEPROXYENABLED", &mut config.calico_kube_proxy_enabled);
        parse_into(&get, "CALICOPOOLMODE", &mut config.calico_pool_mode);
        parse_into(&get, "CALICOTYPHAENABLED", &mut config.calico_typha_enabled);
        parse_into(&get, "CILIUMHUBBLEENABLED", &mut config.cilium_hubble_enabled);
        parse_into(&get, "CILIUMKUBEPROXYENABLED", &mut config.cilium_kube_proxy_enabled);
        parse_into(&get, "CILIUMPSPENABLED", &mut config.cilium_psp_enabled);
        parse_into(&get, "CILIUMTUNNEL", &mut config.cilium_tunnel);
        parse_into(&get, "CILIUMDIRECTROUTINGDEVICE", &mut config.cilium_direct_routing_device);
        parse_into(&get, "CILIUMBGPCONTROLPLANE", &mut config.cilium_bgp_control_plane);
        parse_into(
            &get,
            "CILIUMIPV4NATIVEROUTINGCIDRENABLED",
            &mut config.cilium_ipv4_native_routing_cidr_enabled,
        );
        parse_into(&get, "CILIUMLOADBALANCINGMODE", &mut config.cilium_load_balancing_mode);
        parse_into(&get, "CILIUMMTU", &mut config.cilium_mtu);

        if let Some(devices) = get("CILIUMDEVICES") {
            config.cilium_devices = devices
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }
}

fn parse_into<T>(get: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(name) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => warn!(
            variable = %format!("{DEFAULTER_ENV_PREFIX}{name}"),
            value = %raw,
            error = %e,
            "ignoring malformed defaulter setting"
        ),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
