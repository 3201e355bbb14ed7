// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `common.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::apis::codec::encode_value;
    use crate::apis::metal::FirewallStatus;
    use crate::reconcilers::fixtures::{self, NODE_CIDR, PARTITION, PROJECT};

    #[test]
    fn test_node_cidr_prefers_infrastructure_status() {
        let cluster = fixtures::cluster_context();
        let infra = fixtures::infrastructure(Some("10.9.0.0/22"), None);
        assert_eq!(node_cidr(Some(&infra), &cluster.shoot).unwrap(), "10.9.0.0/22");
    }

    #[test]
    fn test_node_cidr_falls_back_to_shoot() {
        let cluster = fixtures::cluster_context();
        let infra = fixtures::infrastructure(None, None);
        assert_eq!(node_cidr(Some(&infra), &cluster.shoot).unwrap(), NODE_CIDR);
        assert_eq!(node_cidr(None, &cluster.shoot).unwrap(), NODE_CIDR);
    }

    #[test]
    fn test_node_cidr_missing_is_transient() {
        let mut cluster = fixtures::cluster_context();
        cluster.shoot.spec.networking = None;
        let err = node_cidr(None, &cluster.shoot).unwrap_err();
        assert!(err.is_transient());
        assert!(err.requeue_after().is_some());
    }

    #[test]
    fn test_decodes_provider_configs_of_cluster() {
        let cluster = fixtures::cluster_context();
        let profile = cloud_profile_config(&cluster).unwrap();
        assert_eq!(profile, fixtures::cloud_profile_config());

        let infra_config = shoot_infrastructure_config(&cluster.shoot).unwrap();
        assert_eq!(infra_config.partition_id, PARTITION);
        assert_eq!(infra_config.project_id, PROJECT);

        let cp_config = shoot_control_plane_config(&cluster.shoot).unwrap();
        assert_eq!(cp_config, ControlPlaneConfig::default());
    }

    #[test]
    fn test_missing_provider_configs_are_rejected() {
        let mut cluster = fixtures::cluster_context();
        cluster.cloud_profile.spec.provider_config = None;
        cluster.shoot.spec.provider.infrastructure_config = None;
        assert!(matches!(
            cloud_profile_config(&cluster),
            Err(Error::InvalidProviderConfig(_))
        ));
        assert!(matches!(
            shoot_infrastructure_config(&cluster.shoot),
            Err(Error::InvalidProviderConfig(_))
        ));
    }

    #[test]
    fn test_infrastructure_provider_status() {
        let status = InfrastructureStatus {
            firewall: FirewallStatus {
                machine_id: "metal:///muc/abc".to_string(),
                succeeded: true,
            },
        };
        let infra = fixtures::infrastructure(None, Some(encode_value(&status).unwrap()));
        assert_eq!(infrastructure_provider_status(&infra).unwrap(), Some(status));

        let empty = fixtures::infrastructure(None, None);
        assert_eq!(infrastructure_provider_status(&empty).unwrap(), None);
    }
}
