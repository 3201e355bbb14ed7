// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lookup and comparison helpers over the internal provider types.

use semver::Version;
use std::cmp::Ordering;

use super::metal::{
    CloudProfileConfig, IamConfig, IdmConfig, IssuerConfig, MetalControlPlane,
    NamespaceGroupConfig, Partition,
};
use crate::errors::{Error, Result};

/// Prefix of encoded machine ids
const MACHINE_ID_SCHEME: &str = "metal://";

/// Find the metal control plane that offers `partition_id`.
///
/// Returns the control plane's name, the control plane and the partition.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no control plane declares the partition.
pub fn find_metal_control_plane<'a>(
    config: &'a CloudProfileConfig,
    partition_id: &str,
) -> Result<(&'a str, &'a MetalControlPlane, &'a Partition)> {
    config
        .metal_control_planes
        .iter()
        .find_map(|(name, cp)| {
            cp.partitions
                .get(partition_id)
                .map(|partition| (name.as_str(), cp, partition))
        })
        .ok_or_else(|| Error::not_found("metal control plane for partition", partition_id))
}

/// Parse a version, accepting a leading `v` and missing minor/patch components.
#[must_use]
pub fn parse_lenient_semver(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    if trimmed.is_empty() {
        return None;
    }
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(core_end);
    let padded = match core.matches('.').count() {
        0 => format!("{core}.0.0{rest}"),
        1 => format!("{core}.0{rest}"),
        _ => trimmed.to_string(),
    };
    Version::parse(&padded).ok()
}

/// A parsed firewall image name (`<os>-<semver>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallImage {
    /// The full image name
    pub name: String,
    /// Everything before the last dash
    pub os: String,
    /// The version after the last dash
    pub version: Version,
}

impl FirewallImage {
    /// Parse an image name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProviderConfig`] if the name has no dash or the
    /// part after the last dash is not a version.
    pub fn parse(name: &str) -> Result<Self> {
        let (os, version) = name.rsplit_once('-').ok_or_else(|| {
            Error::InvalidProviderConfig(format!(
                "firewall image {name:?} does not have the form <os>-<version>"
            ))
        })?;
        if os.is_empty() {
            return Err(Error::InvalidProviderConfig(format!(
                "firewall image {name:?} has no os part"
            )));
        }
        let version = parse_lenient_semver(version).ok_or_else(|| {
            Error::InvalidProviderConfig(format!(
                "firewall image {name:?} does not carry a semantic version"
            ))
        })?;
        Ok(Self {
            name: name.to_string(),
            os: os.to_string(),
            version,
        })
    }

    /// Selection order: os ascending, then version descending.
    fn selection_order(&self, other: &Self) -> Ordering {
        self.os
            .cmp(&other.os)
            .then_with(|| other.version.cmp(&self.version))
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Sort firewall images in selection order.
///
/// # Errors
///
/// Returns an error if any image name cannot be parsed.
pub fn sort_firewall_images(images: &[String]) -> Result<Vec<FirewallImage>> {
    let mut parsed = images
        .iter()
        .map(|name| FirewallImage::parse(name))
        .collect::<Result<Vec<_>>>()?;
    parsed.sort_by(FirewallImage::selection_order);
    Ok(parsed)
}

/// The first image in selection order.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for an empty list and parse errors otherwise.
pub fn latest_firewall_image(images: &[String]) -> Result<String> {
    sort_firewall_images(images)?
        .into_iter()
        .next()
        .map(|image| image.name)
        .ok_or_else(|| Error::not_found("firewall image", "latest"))
}

/// `true` if moving from `old` to `new` only changes the patch component.
///
/// Both images must share the os and the major and minor version.
///
/// # Errors
///
/// Returns an error if either image cannot be parsed.
pub fn is_firewall_patch_update(old: &str, new: &str) -> Result<bool> {
    let old = FirewallImage::parse(old)?;
    let new = FirewallImage::parse(new)?;
    Ok(old.os == new.os
        && old.version.major == new.version.major
        && old.version.minor == new.version.minor)
}

/// Merge two IAM configs field by field; set values of `child` win.
#[must_use]
pub fn merge_iam_config(parent: Option<&IamConfig>, child: Option<&IamConfig>) -> Option<IamConfig> {
    match (parent, child) {
        (None, None) => None,
        (Some(p), None) => Some(p.clone()),
        (None, Some(c)) => Some(c.clone()),
        (Some(p), Some(c)) => Some(IamConfig {
            issuer_config: merge_option(
                p.issuer_config.as_ref(),
                c.issuer_config.as_ref(),
                |p, c| IssuerConfig {
                    url: pick(&p.url, &c.url),
                    client_id: pick(&p.client_id, &c.client_id),
                },
            ),
            idm_config: merge_option(p.idm_config.as_ref(), c.idm_config.as_ref(), |p, c| {
                IdmConfig {
                    idm_type: pick(&p.idm_type, &c.idm_type),
                }
            }),
            group_config: merge_option(
                p.group_config.as_ref(),
                c.group_config.as_ref(),
                |p, c| NamespaceGroupConfig {
                    excluded_namespaces: pick(&p.excluded_namespaces, &c.excluded_namespaces),
                    expected_groups_list: pick(&p.expected_groups_list, &c.expected_groups_list),
                    namespace_max_length: c.namespace_max_length.or(p.namespace_max_length),
                },
            ),
        }),
    }
}

fn merge_option<T: Clone>(
    parent: Option<&T>,
    child: Option<&T>,
    merge: impl FnOnce(&T, &T) -> T,
) -> Option<T> {
    match (parent, child) {
        (None, None) => None,
        (Some(p), None) => Some(p.clone()),
        (None, Some(c)) => Some(c.clone()),
        (Some(p), Some(c)) => Some(merge(p, c)),
    }
}

fn pick(parent: &str, child: &str) -> String {
    if child.is_empty() {
        parent.to_string()
    } else {
        child.to_string()
    }
}

/// Encode a firewall machine id as `metal:///<partition>/<uuid>`.
#[must_use]
pub fn encode_machine_id(partition: &str, machine_id: &str) -> String {
    format!("{MACHINE_ID_SCHEME}/{partition}/{machine_id}")
}

/// Decode a machine id, keeping only the last path segment.
#[must_use]
pub fn decode_machine_id(encoded: &str) -> String {
    encoded
        .rsplit('/')
        .next()
        .unwrap_or(encoded)
        .to_string()
}

#[cfg(test)]
#[path = "helper_tests.rs"]
mod helper_tests;
