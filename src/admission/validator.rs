// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission validation of shoots, cloud profiles and seeds.
//!
//! Provider configs are decoded strictly here, so unknown fields are rejected
//! at admission while the controllers stay lenient.

use kube::ResourceExt;

use crate::apis::codec::decode_raw;
use crate::apis::helper::find_metal_control_plane;
use crate::apis::metal::{CloudProfileConfig, ControlPlaneConfig, InfrastructureConfig};
use crate::constants::{PROVIDER_TYPE, SECRET_KIND};
use crate::errors::{Error, FieldError, FieldErrorList, FieldPath, Result};
use crate::gardener::garden::{CloudProfile, Seed, Shoot};
use crate::labels::ANNOTATION_CLUSTER_TENANT;
use crate::validation::{
    validate_cloud_profile_config, validate_control_plane_config,
    validate_control_plane_config_network_access, validate_immutable_cloud_profile_config,
    validate_infrastructure_config, validate_infrastructure_config_against_cloud_profile,
    validate_infrastructure_config_update, validate_workers, IMMUTABLE_DETAIL,
};

fn tenant_path() -> FieldPath {
    FieldPath::new("metadata")
        .child("annotations")
        .key(ANNOTATION_CLUSTER_TENANT)
}

fn tenant(shoot: &Shoot) -> Option<&String> {
    shoot.annotations().get(ANNOTATION_CLUSTER_TENANT)
}

/// Check the tenant annotation: required on create, immutable on update.
#[must_use]
pub fn validate_tenant(shoot: &Shoot, old: Option<&Shoot>) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let path = tenant_path();
    match old {
        None => {
            if tenant(shoot).is_none_or(String::is_empty) {
                errors.push(FieldError::required(&path, "shoot must carry a tenant"));
            }
        }
        Some(old) => {
            let new_tenant = tenant(shoot);
            if new_tenant != tenant(old) {
                errors.push(FieldError::invalid(
                    &path,
                    new_tenant.map_or("", String::as_str),
                    IMMUTABLE_DETAIL,
                ));
            }
        }
    }
    errors
}

/// Validate a shoot of provider type metal against its cloud profile.
///
/// Shoots of other providers and shoots being deleted pass unchecked.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if a provider config of the shoot
/// or the cloud profile cannot be decoded.
pub fn validate_shoot(shoot: &Shoot, old: Option<&Shoot>, profile: &CloudProfile) -> Result<FieldErrorList> {
    let mut errors = FieldErrorList::new();
    if shoot.spec.provider.provider_type != PROVIDER_TYPE || shoot.metadata.deletion_timestamp.is_some() {
        return Ok(errors);
    }
    errors.extend(validate_tenant(shoot, old));

    let provider_path = FieldPath::new("spec").child("provider");
    let infra_path = provider_path.child("infrastructureConfig");
    let cp_path = provider_path.child("controlPlaneConfig");

    let profile_config: CloudProfileConfig = decode_raw(profile.spec.provider_config.as_ref(), false)?
        .ok_or_else(|| Error::InvalidProviderConfig("cloud profile has no provider config".to_string()))?;

    let Some(infra) = decode_raw::<InfrastructureConfig>(shoot.spec.provider.infrastructure_config.as_ref(), true)?
    else {
        errors.push(FieldError::required(&infra_path, "infrastructure config must be set"));
        return Ok(errors);
    };
    errors.extend(validate_infrastructure_config(&infra, &infra_path));
    errors.extend(validate_infrastructure_config_against_cloud_profile(
        &infra,
        &shoot.spec.region,
        &profile.spec,
        &profile_config,
        &infra_path,
    ));
    if let Some(old) = old {
        if let Some(old_infra) =
            decode_raw::<InfrastructureConfig>(old.spec.provider.infrastructure_config.as_ref(), false)?
        {
            errors.extend(validate_infrastructure_config_update(&old_infra, &infra, &infra_path));
        }
    }

    let control_plane: ControlPlaneConfig =
        decode_raw(shoot.spec.provider.control_plane_config.as_ref(), true)?.unwrap_or_default();
    let profile_iam = find_metal_control_plane(&profile_config, &infra.partition_id)
        .ok()
        .and_then(|(_, cp, _)| cp.iam_config.as_ref());
    errors.extend(validate_control_plane_config(&control_plane, profile_iam, &cp_path));
    errors.extend(validate_control_plane_config_network_access(
        &control_plane,
        &profile_config,
        &infra.partition_id,
        &cp_path,
    ));

    errors.extend(validate_workers(
        &shoot.spec.provider.workers,
        &profile.spec,
        &provider_path.child("workers"),
    ));
    Ok(errors)
}

/// Validate the provider config of a metal cloud profile.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if a provider config cannot be decoded.
pub fn validate_cloud_profile(profile: &CloudProfile, old: Option<&CloudProfile>) -> Result<FieldErrorList> {
    let mut errors = FieldErrorList::new();
    if profile.spec.provider_type != PROVIDER_TYPE {
        return Ok(errors);
    }
    let path = FieldPath::new("spec").child("providerConfig");
    let Some(config) = decode_raw::<CloudProfileConfig>(profile.spec.provider_config.as_ref(), true)? else {
        errors.push(FieldError::required(&path, "cloud profile must carry a provider config"));
        return Ok(errors);
    };
    errors.extend(validate_cloud_profile_config(&config, &profile.spec, &path));

    if let Some(old) = old {
        if let Some(old_config) = decode_raw::<CloudProfileConfig>(old.spec.provider_config.as_ref(), false)? {
            errors.extend(validate_immutable_cloud_profile_config(&config, &old_config, &path));
        }
    }
    Ok(errors)
}

/// Backup credentials of a seed must reference a core `v1` Secret.
#[must_use]
pub fn validate_seed(seed: &Seed) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let Some(credentials) = seed
        .spec
        .backup
        .as_ref()
        .and_then(|b| b.credentials_ref.as_ref())
    else {
        return errors;
    };

    let api_version = credentials.api_version.as_deref().unwrap_or_default();
    let kind = credentials.kind.as_deref().unwrap_or_default();
    if api_version != "v1" || kind != SECRET_KIND {
        errors.push(FieldError::invalid(
            &FieldPath::new("spec").child("backup").child("credentialsRef"),
            format!("{api_version}, Kind={kind}"),
            "backup credentials must reference a v1 Secret",
        ));
    }
    errors
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod validator_tests;
