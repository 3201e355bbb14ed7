// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation of `InfrastructureConfig`.

use super::IMMUTABLE_DETAIL;
use crate::apis::helper::find_metal_control_plane;
use crate::apis::metal::{CloudProfileConfig, InfrastructureConfig};
use crate::errors::{FieldError, FieldErrorList, FieldPath};
use crate::gardener::garden::CloudProfileSpec;

/// Structural checks of an infrastructure config.
#[must_use]
pub fn validate_infrastructure_config(config: &InfrastructureConfig, path: &FieldPath) -> FieldErrorList {
    let mut errors = FieldErrorList::new();

    if config.project_id.is_empty() {
        errors.push(FieldError::required(&path.child("projectID"), "projectID must be set"));
    }
    if config.partition_id.is_empty() {
        errors.push(FieldError::required(&path.child("partitionID"), "partitionID must be set"));
    }

    let firewall = path.child("firewall");
    if config.firewall.size.is_empty() {
        errors.push(FieldError::required(&firewall.child("size"), "firewall size must be set"));
    }
    if config.firewall.image.is_empty() {
        errors.push(FieldError::required(&firewall.child("image"), "firewall image must be set"));
    }
    for (i, network) in config.firewall.networks.iter().enumerate() {
        if network.is_empty() {
            errors.push(FieldError::required(
                &firewall.child("networks").index(i),
                "network id must not be empty",
            ));
        }
    }

    errors
}

/// Check an infrastructure config against the cloud profile.
#[must_use]
pub fn validate_infrastructure_config_against_cloud_profile(
    config: &InfrastructureConfig,
    region: &str,
    profile: &CloudProfileSpec,
    profile_config: &CloudProfileConfig,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let partition_path = path.child("partitionID");
    let firewall = path.child("firewall");

    if !profile.region_has_zone(region, &config.partition_id) {
        errors.push(FieldError::invalid(
            &partition_path,
            &config.partition_id,
            format!("cloud profile does not define partition in region {region}"),
        ));
    }

    if config.firewall.networks.is_empty() {
        errors.push(FieldError::required(
            &firewall.child("networks"),
            "at least one external network must be declared",
        ));
    }

    match find_metal_control_plane(profile_config, &config.partition_id) {
        Ok((_, cp, _)) => {
            if !cp.firewall_images.contains(&config.firewall.image) {
                let supported: Vec<&str> = cp.firewall_images.iter().map(String::as_str).collect();
                errors.push(FieldError::not_supported(
                    &firewall.child("image"),
                    &config.firewall.image,
                    &supported,
                ));
            }
        }
        Err(_) => errors.push(FieldError::invalid(
            &partition_path,
            &config.partition_id,
            "no metal control plane offers this partition",
        )),
    }

    errors
}

/// Check that immutable fields did not change.
///
/// The firewall networks are compared as a set.
#[must_use]
pub fn validate_infrastructure_config_update(
    old: &InfrastructureConfig,
    new: &InfrastructureConfig,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let firewall = path.child("firewall");

    for (field, old_value, new_value) in [
        (path.child("projectID"), &old.project_id, &new.project_id),
        (path.child("partitionID"), &old.partition_id, &new.partition_id),
        (firewall.child("size"), &old.firewall.size, &new.firewall.size),
        (firewall.child("image"), &old.firewall.image, &new.firewall.image),
    ] {
        if old_value != new_value {
            errors.push(FieldError::invalid(&field, new_value, IMMUTABLE_DETAIL));
        }
    }

    let mut old_networks = old.firewall.networks.clone();
    let mut new_networks = new.firewall.networks.clone();
    old_networks.sort();
    new_networks.sort();
    if old_networks != new_networks {
        errors.push(FieldError::invalid(
            &firewall.child("networks"),
            new.firewall.networks.join(","),
            IMMUTABLE_DETAIL,
        ));
    }

    errors
}
