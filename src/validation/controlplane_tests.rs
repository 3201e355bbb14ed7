// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controlplane.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::apis::metal::{
        CloudProfileConfig, ControlPlaneConfig, ControlPlaneFeatures, IamConfig, IssuerConfig,
        MetalControlPlane, NamespaceGroupConfig, NetworkIsolation, Partition,
    };
    use crate::errors::{FieldErrorType, FieldPath};
    use std::collections::BTreeMap;

    fn iam(url: &str, client_id: &str) -> IamConfig {
        IamConfig {
            issuer_config: Some(IssuerConfig {
                url: url.to_string(),
                client_id: client_id.to_string(),
            }),
            ..Default::default()
        }
    }

    fn profile_config(isolation: Option<NetworkIsolation>) -> CloudProfileConfig {
        CloudProfileConfig {
            metal_control_planes: BTreeMap::from([(
                "prod".to_string(),
                MetalControlPlane {
                    partitions: BTreeMap::from([(
                        "muc".to_string(),
                        Partition {
                            network_isolation: isolation,
                            ..Default::default()
                        },
                    )]),
                    ..Default::default()
                },
            )]),
        }
    }

    #[test]
    fn test_iam_required() {
        let errors = validate_control_plane_config(
            &ControlPlaneConfig::default(),
            None,
            &FieldPath::root(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].field, "iamconfig");
        assert_eq!(errors.0[0].error_type, FieldErrorType::Required);
    }

    #[test]
    fn test_iam_merged_from_cloud_profile() {
        let config = ControlPlaneConfig {
            iam_config: Some(iam("", "my-client")),
            ..Default::default()
        };
        let profile_iam = iam("https://issuer.example.com", "");
        assert!(
            validate_control_plane_config(&config, Some(&profile_iam), &FieldPath::root())
                .is_empty()
        );

        let errors = validate_control_plane_config(&config, None, &FieldPath::root());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].field, "iamconfig.issuerConfig.url");
    }

    #[test]
    fn test_namespace_max_length_positive() {
        let mut config_iam = iam("https://issuer", "client");
        config_iam.group_config = Some(NamespaceGroupConfig {
            namespace_max_length: Some(0),
            ..Default::default()
        });
        let config = ControlPlaneConfig {
            iam_config: Some(config_iam),
            ..Default::default()
        };
        let errors = validate_control_plane_config(&config, None, &FieldPath::root());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].field, "iamconfig.groupConfig.namespaceMaxLength");
    }

    #[test]
    fn test_audit_to_splunk_implies_cluster_audit() {
        let mut config = ControlPlaneConfig {
            iam_config: Some(iam("https://issuer", "client")),
            feature_gates: ControlPlaneFeatures {
                audit_to_splunk: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let errors = validate_control_plane_config(&config, None, &FieldPath::root());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].field, "featureGates.auditToSplunk");

        config.feature_gates.cluster_audit = Some(true);
        assert!(validate_control_plane_config(&config, None, &FieldPath::root()).is_empty());

        config.feature_gates = ControlPlaneFeatures {
            cluster_audit: Some(true),
            audit_to_splunk: Some(false),
            ..Default::default()
        };
        assert!(validate_control_plane_config(&config, None, &FieldPath::root()).is_empty());
    }

    #[test]
    fn test_unknown_network_access_type() {
        let config = ControlPlaneConfig {
            iam_config: Some(iam("https://issuer", "client")),
            network_access_type: Some("open".to_string()),
            ..Default::default()
        };
        let errors = validate_control_plane_config(&config, None, &FieldPath::root());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.0[0].error_type, FieldErrorType::NotSupported);
    }

    #[test]
    fn test_restricted_access_requires_network_isolation() {
        let config = ControlPlaneConfig {
            network_access_type: Some("restricted".to_string()),
            ..Default::default()
        };
        let errors = validate_control_plane_config_network_access(
            &config,
            &profile_config(None),
            "muc",
            &FieldPath::root(),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.0[0].error_type, FieldErrorType::Invalid);
        assert_eq!(errors.0[0].field, "networkAccessType");
        assert_eq!(errors.0[1].error_type, FieldErrorType::Required);
        assert_eq!(
            errors.0[1].field,
            "metalControlPlanes[prod].partitions[muc].networkIsolation"
        );
    }

    #[test]
    fn test_restricted_access_with_isolation_or_baseline() {
        let restricted = ControlPlaneConfig {
            network_access_type: Some("forbidden".to_string()),
            ..Default::default()
        };
        assert!(validate_control_plane_config_network_access(
            &restricted,
            &profile_config(Some(NetworkIsolation::default())),
            "muc",
            &FieldPath::root(),
        )
        .is_empty());

        assert!(validate_control_plane_config_network_access(
            &ControlPlaneConfig::default(),
            &profile_config(None),
            "muc",
            &FieldPath::root(),
        )
        .is_empty());
    }
}
