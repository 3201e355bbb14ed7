// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation of `ControlPlaneConfig`.

use crate::apis::helper::{find_metal_control_plane, merge_iam_config};
use crate::apis::metal::{
    CloudProfileConfig, ControlPlaneConfig, IamConfig, NETWORK_ACCESS_BASELINE,
    NETWORK_ACCESS_TYPES,
};
use crate::errors::{FieldError, FieldErrorList, FieldPath};

/// Validate a control plane config.
///
/// The IAM config is checked after merging it over `profile_iam`, the IAM
/// config of the selected metal control plane.
#[must_use]
pub fn validate_control_plane_config(
    config: &ControlPlaneConfig,
    profile_iam: Option<&IamConfig>,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let iam_path = path.child("iamconfig");

    match merge_iam_config(profile_iam, config.iam_config.as_ref()) {
        None => errors.push(FieldError::required(&iam_path, "iam config must be set")),
        Some(iam) => {
            let issuer = iam_path.child("issuerConfig");
            match &iam.issuer_config {
                None => errors.push(FieldError::required(&issuer, "issuer config must be set")),
                Some(issuer_config) => {
                    if issuer_config.url.is_empty() {
                        errors.push(FieldError::required(&issuer.child("url"), "issuer url must be set"));
                    }
                    if issuer_config.client_id.is_empty() {
                        errors.push(FieldError::required(
                            &issuer.child("clientId"),
                            "issuer client id must be set",
                        ));
                    }
                }
            }
            if let Some(max) = iam.group_config.as_ref().and_then(|g| g.namespace_max_length) {
                if max <= 0 {
                    errors.push(FieldError::invalid(
                        &iam_path.child("groupConfig").child("namespaceMaxLength"),
                        max,
                        "must be a positive number",
                    ));
                }
            }
        }
    }

    let gates = &config.feature_gates;
    if gates.audit_to_splunk == Some(true) && gates.cluster_audit != Some(true) {
        errors.push(FieldError::invalid(
            &path.child("featureGates").child("auditToSplunk"),
            true,
            "auditToSplunk requires clusterAudit to be enabled",
        ));
    }

    if let Some(access) = &config.network_access_type {
        if !NETWORK_ACCESS_TYPES.contains(&access.as_str()) {
            errors.push(FieldError::not_supported(
                &path.child("networkAccessType"),
                access,
                &NETWORK_ACCESS_TYPES,
            ));
        }
    }

    errors
}

/// A restricted or forbidden network access type needs a partition with a
/// network isolation.
#[must_use]
pub fn validate_control_plane_config_network_access(
    config: &ControlPlaneConfig,
    profile_config: &CloudProfileConfig,
    partition_id: &str,
    path: &FieldPath,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let access = config.network_access_type();
    if access == NETWORK_ACCESS_BASELINE {
        return errors;
    }

    let access_path = path.child("networkAccessType");
    match find_metal_control_plane(profile_config, partition_id) {
        Err(_) => errors.push(FieldError::invalid(
            &access_path,
            access,
            format!("no metal control plane offers partition {partition_id}"),
        )),
        Ok((cp_name, _, partition)) => {
            if partition.network_isolation.is_none() {
                errors.push(FieldError::invalid(
                    &access_path,
                    access,
                    "network access type requires a partition with network isolation",
                ));
                errors.push(FieldError::required(
                    &FieldPath::new("metalControlPlanes")
                        .key(cp_name)
                        .child("partitions")
                        .key(partition_id)
                        .child("networkIsolation"),
                    "network isolation is required for this network access type",
                ));
            }
        }
    }

    errors
}
