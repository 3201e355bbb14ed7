// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shoot defaulting.
//!
//! Defaults are applied to the raw shoot JSON so fields this extension does
//! not model survive untouched. Every default only fills an unset field, which
//! makes defaulting idempotent.

use json_patch::Patch;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::apis::codec::decode_value;
use crate::apis::helper::{find_metal_control_plane, latest_firewall_image};
use crate::apis::metal::{CloudProfileConfig, InfrastructureConfig};
use crate::config::DefaulterConfig;
use crate::constants::{
    CALICO_CONFIG_API_VERSION, CILIUM_CONFIG_API_VERSION, NETWORK_CONFIG_KIND, NETWORK_TYPE_CALICO,
    NETWORK_TYPE_CILIUM,
};
use crate::errors::Result;

/// Object under `key`, created when absent. `None` if the field holds
/// something else, which is then left alone.
fn object_at<'a>(parent: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

/// Set `key` unless it already holds a non-null value
fn set_default(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get(key) {
        Some(existing) if !existing.is_null() => {}
        _ => {
            map.insert(key.to_string(), value);
        }
    }
}

fn is_unset(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Complete calico provider config
#[must_use]
pub fn calico_provider_config(config: &DefaulterConfig) -> Value {
    json!({
        "apiVersion": CALICO_CONFIG_API_VERSION,
        "kind": NETWORK_CONFIG_KIND,
        "backend": config.calico_backend,
        "ipv4": {
            "mode": config.calico_pool_mode,
        },
        "typha": {
            "enabled": config.calico_typha_enabled,
        },
    })
}

/// Complete cilium provider config
#[must_use]
pub fn cilium_provider_config(config: &DefaulterConfig) -> Value {
    json!({
        "apiVersion": CILIUM_CONFIG_API_VERSION,
        "kind": NETWORK_CONFIG_KIND,
        "hubble": {
            "enabled": config.cilium_hubble_enabled,
        },
        "psp": config.cilium_psp_enabled,
        "tunnel": config.cilium_tunnel,
        "devices": config.cilium_devices,
        "directRoutingDevice": config.cilium_direct_routing_device,
        "bgpControlPlane": {
            "enabled": config.cilium_bgp_control_plane,
        },
        "ipv4NativeRoutingCIDREnabled": config.cilium_ipv4_native_routing_cidr_enabled,
        "loadBalancingMode": config.cilium_load_balancing_mode,
        "mtu": config.cilium_mtu,
    })
}

fn default_kubernetes(spec: &mut Map<String, Value>, config: &DefaulterConfig) {
    let Some(kubernetes) = object_at(spec, "kubernetes") else {
        return;
    };
    set_default(
        kubernetes,
        "allowPrivilegedContainers",
        json!(config.allowed_privileged_containers),
    );
    if let Some(kcm) = object_at(kubernetes, "kubeControllerManager") {
        set_default(kcm, "nodeCIDRMaskSize", json!(config.node_cidr_mask_size));
    }
    if let Some(kubelet) = object_at(kubernetes, "kubelet") {
        set_default(kubelet, "maxPods", json!(config.max_pods));
    }
}

fn default_networking(spec: &mut Map<String, Value>, config: &DefaulterConfig) {
    let Some(Value::Object(networking)) = spec.get_mut("networking") else {
        return;
    };
    if is_unset(networking, "type") {
        networking.insert("type".to_string(), json!(config.network_type));
    }
    if is_unset(networking, "pods") {
        networking.insert("pods".to_string(), json!(config.pods_cidr));
    }
    if is_unset(networking, "services") {
        networking.insert("services".to_string(), json!(config.services_cidr));
    }

    let network_type = networking
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (provider_config, kube_proxy) = match network_type.as_str() {
        NETWORK_TYPE_CALICO => (calico_provider_config(config), config.calico_kube_proxy_enabled),
        NETWORK_TYPE_CILIUM => (cilium_provider_config(config), config.cilium_kube_proxy_enabled),
        other => {
            debug!(network_type = %other, "no networking defaults for network type");
            return;
        }
    };
    set_default(networking, "providerConfig", provider_config);

    if let Some(kube_proxy_config) =
        object_at(spec, "kubernetes").and_then(|k| object_at(k, "kubeProxy"))
    {
        set_default(kube_proxy_config, "enabled", json!(kube_proxy));
    }
}

fn default_infrastructure(spec: &mut Map<String, Value>, profile: &CloudProfileConfig) -> Result<()> {
    let Some(raw) = spec
        .get_mut("provider")
        .and_then(Value::as_object_mut)
        .and_then(|p| p.get_mut("infrastructureConfig"))
    else {
        return Ok(());
    };
    // malformed configs are left to the validator
    let Ok(infra) = decode_value::<InfrastructureConfig>(raw, false) else {
        return Ok(());
    };
    let Ok((_, control_plane, partition)) = find_metal_control_plane(profile, &infra.partition_id) else {
        debug!(partition = %infra.partition_id, "no control plane for partition, skipping firewall defaults");
        return Ok(());
    };
    let Value::Object(raw) = raw else {
        return Ok(());
    };
    let Some(firewall) = object_at(raw, "firewall") else {
        return Ok(());
    };

    if infra.firewall.image.is_empty() && !control_plane.firewall_images.is_empty() {
        firewall.insert(
            "image".to_string(),
            json!(latest_firewall_image(&control_plane.firewall_images)?),
        );
    }
    if infra.firewall.size.is_empty() {
        if let Some(size) = partition.firewall_types.first() {
            firewall.insert("size".to_string(), json!(size));
        }
    }
    Ok(())
}

/// Apply all defaults to a shoot in place.
///
/// Firewall defaults need the provider config of the shoot's cloud profile;
/// without it they are skipped.
///
/// # Errors
///
/// Returns an error if the firewall images of the cloud profile cannot be parsed.
pub fn default_shoot(
    shoot: &mut Value,
    profile: Option<&CloudProfileConfig>,
    config: &DefaulterConfig,
) -> Result<()> {
    let Some(root) = shoot.as_object_mut() else {
        return Ok(());
    };
    let Some(spec) = object_at(root, "spec") else {
        return Ok(());
    };

    default_kubernetes(spec, config);
    default_networking(spec, config);
    if let Some(profile) = profile {
        default_infrastructure(spec, profile)?;
    }
    Ok(())
}

/// JSON patch turning `shoot` into its defaulted form
///
/// # Errors
///
/// See [`default_shoot`].
pub fn default_patch(
    shoot: &Value,
    profile: Option<&CloudProfileConfig>,
    config: &DefaulterConfig,
) -> Result<Patch> {
    let mut defaulted = shoot.clone();
    default_shoot(&mut defaulted, profile, config)?;
    Ok(json_patch::diff(shoot, &defaulted))
}

#[cfg(test)]
#[path = "defaulter_tests.rs"]
mod defaulter_tests;
