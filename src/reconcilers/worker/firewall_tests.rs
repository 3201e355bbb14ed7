// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `firewall.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::apis::metal::{EgressRule, RateLimit as ConfigRateLimit};
    use crate::reconcilers::fixtures::{self, NAMESPACE, PARTITION, PRIVATE_NETWORK, PROJECT, SHOOT_UID};
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};

    fn spec_for(config: &InfrastructureConfig, current: Option<&FirewallSpec>) -> Result<FirewallSpec> {
        let profile = fixtures::cloud_profile_config();
        let control_plane = &profile.metal_control_planes["prod"];
        let input = FirewallInput {
            infrastructure_config: config,
            control_plane,
            private_network_id: PRIVATE_NETWORK,
            bundled_controller_tag: "v2.3.5",
            internal_prefixes: vec!["10.100.0.0/16".to_string()],
        };
        firewall_spec(&input, current)
    }

    #[test]
    fn test_firewall_spec() {
        let spec = spec_for(&fixtures::infrastructure_config(), None).unwrap();
        assert_eq!(spec.size, fixtures::FIREWALL_SIZE);
        assert_eq!(spec.image, fixtures::FIREWALL_IMAGE);
        assert_eq!(spec.partition, PARTITION);
        assert_eq!(spec.project, PROJECT);
        assert_eq!(spec.networks, ["internet", PRIVATE_NETWORK]);
        assert_eq!(spec.controller_version, "v2.3.5");
        assert_eq!(
            spec.controller_url,
            "https://images.example.com/firewall-controller/v2.3.5"
        );
        assert_eq!(spec.nftables_exporter_version, "v0.3.0");
        assert_eq!(spec.internal_prefixes, ["10.100.0.0/16"]);
        assert_eq!(spec.rate_limits, None);
        assert_eq!(spec.egress_rules, None);
    }

    #[test]
    fn test_rate_limits_and_egress_rules_are_mapped() {
        let mut config = fixtures::infrastructure_config();
        config.firewall.rate_limits = Some(vec![ConfigRateLimit {
            network_id: "internet".to_string(),
            rate_limit: 100,
        }]);
        config.firewall.egress_rules = Some(vec![EgressRule {
            network_id: "internet".to_string(),
            ips: vec!["185.1.2.3".to_string()],
        }]);

        let spec = spec_for(&config, None).unwrap();
        assert_eq!(
            spec.rate_limits,
            Some(vec![RateLimit {
                network_id: "internet".to_string(),
                rate: 100,
            }])
        );
        assert_eq!(
            spec.egress_rules,
            Some(vec![EgressRuleSnat {
                network_id: "internet".to_string(),
                ips: vec!["185.1.2.3".to_string()],
            }])
        );

        assert_eq!(rate_limits(Some(&[])), Some(vec![]));
        assert_eq!(egress_rules(None), None);
    }

    #[test]
    fn test_undefined_controller_version_keeps_current() {
        let mut config = fixtures::infrastructure_config();
        config.firewall.controller_version = String::new();

        let current = FirewallSpec {
            controller_version: "v2.3.4".to_string(),
            controller_url: "https://images.example.com/firewall-controller/v2.3.4".to_string(),
            ..Default::default()
        };
        let spec = spec_for(&config, Some(&current)).unwrap();
        assert_eq!(spec.controller_version, "v2.3.4");
        assert_eq!(spec.controller_url, current.controller_url);

        let spec = spec_for(&config, None).unwrap();
        assert!(spec.controller_version.is_empty());
    }

    #[test]
    fn test_other_major_controller_version_is_rejected() {
        let mut config = fixtures::infrastructure_config();
        config.firewall.controller_version = "v1.9.0".to_string();
        let err = spec_for(&config, None).unwrap_err();
        assert!(matches!(err, Error::InvalidProviderConfig(_)));
    }

    #[test]
    fn test_firewall_deployment_shape() {
        let spec = spec_for(&fixtures::infrastructure_config(), None).unwrap();
        let deployment = firewall_deployment(NAMESPACE, SHOOT_UID, spec.clone());

        assert_eq!(deployment.metadata.name.as_deref(), Some("firewall"));
        assert_eq!(deployment.metadata.namespace.as_deref(), Some(NAMESPACE));
        let labels = deployment.metadata.labels.as_ref().unwrap();
        assert_eq!(
            labels.get(&format!("shoot.{NAMESPACE}")).map(String::as_str),
            Some(NAMESPACE)
        );
        assert_eq!(deployment.spec.replicas, 1);
        assert_eq!(
            deployment.spec.selector.get("cluster.id").map(String::as_str),
            Some(SHOOT_UID)
        );
        assert_eq!(deployment.spec.template.metadata.labels, deployment.spec.selector);
        assert_eq!(deployment.spec.template.spec, spec);
    }

    #[test]
    fn test_image_patch_update_is_allowed() {
        let current = FirewallSpec {
            image: "firewall-ubuntu-3.0.20240101".to_string(),
            ..Default::default()
        };
        let mut desired = current.clone();
        assert!(check_image_update(Some(&current), &desired).is_ok());

        desired.image = "firewall-ubuntu-3.0.20240201".to_string();
        assert!(check_image_update(Some(&current), &desired).is_ok());
        assert!(check_image_update(None, &desired).is_ok());
    }

    #[test]
    fn test_image_minor_update_is_rejected() {
        let current = FirewallSpec {
            image: "firewall-ubuntu-3.0.20240101".to_string(),
            ..Default::default()
        };
        let desired = FirewallSpec {
            image: "firewall-ubuntu-3.1.20240101".to_string(),
            ..Default::default()
        };
        let err = check_image_update(Some(&current), &desired).unwrap_err();
        assert!(matches!(err, Error::Immutable { ref field, .. } if field == "spec.template.spec.image"));
        assert_eq!(err.requeue_after(), None);
    }

    #[test]
    fn test_webhook_name() {
        assert_eq!(
            webhook_name(NAMESPACE),
            format!("firewall-controller-manager-{NAMESPACE}")
        );
    }

    #[test]
    fn test_deployment_ready() {
        let mut deployment = Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(2),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!deployment_ready(&deployment));

        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(2),
            ..Default::default()
        });
        assert!(deployment_ready(&deployment));

        assert!(!deployment_ready(&Deployment::default()));
    }
}
