// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation of `CloudProfileConfig`.

use ipnet::IpNet;
use std::collections::BTreeSet;
use std::net::IpAddr;
use url::Url;

use super::IMMUTABLE_DETAIL;
use crate::apis::metal::{CloudProfileConfig, NetworkIsolation, RegistryMirror, CLASSIFICATIONS};
use crate::errors::{FieldError, FieldErrorList, FieldPath};
use crate::gardener::garden::CloudProfileSpec;

/// Maximum number of DNS servers of a network isolation
pub const MAX_DNS_SERVERS: usize = 3;

/// Validate a cloud profile config against its enclosing cloud profile.
#[must_use]
pub fn validate_cloud_profile_config(
    config: &CloudProfileConfig,
    profile: &CloudProfileSpec,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let cps_path = path.child("metalControlPlanes");

    for (cp_name, cp) in &config.metal_control_planes {
        let cp_path = cps_path.key(cp_name);

        for (partition_name, partition) in &cp.partitions {
            let partition_path = cp_path.child("partitions").key(partition_name);
            if !profile.has_zone(partition_name) {
                errors.push(FieldError::invalid(
                    &partition_path,
                    partition_name,
                    "the partition has no corresponding zone in the cloud profile",
                ));
            }
            if let Some(isolation) = &partition.network_isolation {
                errors.extend(validate_network_isolation(
                    isolation,
                    &partition_path.child("networkIsolation"),
                ));
            }
        }

        let mut seen = BTreeSet::new();
        for (i, version) in cp.firewall_controller_versions.iter().enumerate() {
            let version_path = cp_path.child("firewallControllerVersions").index(i);
            if !seen.insert(version.version.as_str()) {
                errors.push(FieldError::duplicate(
                    &version_path.child("version"),
                    &version.version,
                ));
            }
            if let Some(classification) = &version.classification {
                if !CLASSIFICATIONS.contains(&classification.as_str()) {
                    errors.push(FieldError::not_supported(
                        &version_path.child("classification"),
                        classification,
                        &CLASSIFICATIONS,
                    ));
                }
            }
        }
    }

    errors
}

/// Validate the structure of a network isolation.
#[must_use]
pub fn validate_network_isolation(isolation: &NetworkIsolation, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    let allowed = path.child("allowedNetworks");
    for (direction, cidrs) in [
        ("ingress", &isolation.allowed_networks.ingress),
        ("egress", &isolation.allowed_networks.egress),
    ] {
        for (i, cidr) in cidrs.iter().enumerate() {
            if cidr.parse::<IpNet>().is_err() {
                errors.push(FieldError::invalid(
                    &allowed.child(direction).index(i),
                    cidr,
                    "invalid CIDR",
                ));
            }
        }
    }

    let dns_path = path.child("dnsServers");
    if isolation.dns_servers.len() > MAX_DNS_SERVERS {
        errors.push(FieldError::too_many(
            &dns_path,
            isolation.dns_servers.len(),
            MAX_DNS_SERVERS,
        ));
    }
    for (i, ip) in isolation.dns_servers.iter().enumerate() {
        if ip.parse::<IpAddr>().is_err() {
            errors.push(FieldError::invalid(&dns_path.index(i), ip, "invalid IP address"));
        }
    }

    for (i, ip) in isolation.ntp_servers.iter().enumerate() {
        if ip.parse::<IpAddr>().is_err() {
            errors.push(FieldError::invalid(
                &path.child("ntpServers").index(i),
                ip,
                "invalid IP address",
            ));
        }
    }

    for (i, mirror) in isolation.registry_mirrors.iter().enumerate() {
        errors.extend(validate_registry_mirror(
            mirror,
            &path.child("registryMirrors").index(i),
        ));
    }

    errors
}

fn validate_registry_mirror(mirror: &RegistryMirror, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if mirror.name.is_empty() {
        errors.push(FieldError::required(&path.child("name"), "name must not be empty"));
    }

    match Url::parse(&mirror.endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(_) => errors.push(FieldError::invalid(
            &path.child("endpoint"),
            &mirror.endpoint,
            "endpoint must use http or https",
        )),
        Err(e) => errors.push(FieldError::invalid(
            &path.child("endpoint"),
            &mirror.endpoint,
            format!("not a valid URL: {e}"),
        )),
    }

    if mirror.ip.parse::<IpAddr>().is_err() {
        errors.push(FieldError::invalid(&path.child("ip"), &mirror.ip, "invalid IP address"));
    }

    if mirror.port <= 0 || mirror.port > 65535 {
        errors.push(FieldError::invalid(
            &path.child("port"),
            mirror.port,
            "must be a valid port",
        ));
    }

    let mirror_of = path.child("mirrorOf");
    if mirror.mirror_of.iter().all(String::is_empty) {
        errors.push(FieldError::required(&mirror_of, "at least one registry must be mirrored"));
    }
    for (i, registry) in mirror.mirror_of.iter().enumerate() {
        if !registry.is_empty() && !is_registry_host(registry) {
            errors.push(FieldError::invalid(
                &mirror_of.index(i),
                registry,
                "must be a registry host without scheme or path",
            ));
        }
    }

    errors
}

/// `true` for `host` or `host:port` without scheme or path
fn is_registry_host(registry: &str) -> bool {
    if registry.contains("://") || registry.contains('/') {
        return false;
    }
    let Ok(url) = Url::parse(&format!("https://{registry}")) else {
        return false;
    };
    url.host_str().is_some_and(|h| !h.is_empty())
        && url.path() == "/"
        && url.query().is_none()
        && url.username().is_empty()
}

/// Report changes of the DNS servers of any partition's network isolation.
#[must_use]
pub fn validate_immutable_cloud_profile_config(
    new: &CloudProfileConfig,
    old: &CloudProfileConfig,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let cps_path = path.child("metalControlPlanes");

    for (cp_name, old_cp) in &old.metal_control_planes {
        let Some(new_cp) = new.metal_control_planes.get(cp_name) else {
            continue;
        };
        for (partition_name, old_partition) in &old_cp.partitions {
            let Some(new_partition) = new_cp.partitions.get(partition_name) else {
                continue;
            };
            let old_dns = dns_servers(old_partition.network_isolation.as_ref());
            let new_dns = dns_servers(new_partition.network_isolation.as_ref());
            if old_dns != new_dns {
                errors.push(FieldError::invalid(
                    &cps_path
                        .key(cp_name)
                        .child("partitions")
                        .key(partition_name)
                        .child("networkIsolation")
                        .child("dnsServers"),
                    new_dns.join(","),
                    IMMUTABLE_DETAIL,
                ));
            }
        }
    }

    errors
}

fn dns_servers(isolation: Option<&NetworkIsolation>) -> &[String] {
    isolation.map(|i| i.dns_servers.as_slice()).unwrap_or_default()
}
