// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the host platform resource types

#[cfg(test)]
mod tests {
    use crate::gardener::extensions::{Cluster, ClusterContext, Infrastructure};
    use serde_json::json;

    fn cluster() -> Cluster {
        serde_json::from_value(json!({
            "apiVersion": "extensions.gardener.cloud/v1alpha1",
            "kind": "Cluster",
            "metadata": {"name": "shoot--project--cluster"},
            "spec": {
                "cloudProfile": {
                    "apiVersion": "core.gardener.cloud/v1beta1",
                    "kind": "CloudProfile",
                    "metadata": {"name": "metal"},
                    "spec": {
                        "type": "metal",
                        "regions": [{"name": "eu", "zones": [{"name": "muc"}]}],
                        "machineImages": [{"name": "ubuntu", "versions": [{"version": "22.4"}]}]
                    }
                },
                "seed": {
                    "apiVersion": "core.gardener.cloud/v1beta1",
                    "kind": "Seed",
                    "metadata": {"name": "seed-a"},
                    "spec": {}
                },
                "shoot": {
                    "apiVersion": "core.gardener.cloud/v1beta1",
                    "kind": "Shoot",
                    "metadata": {"name": "cluster", "namespace": "garden-project", "uid": "uid-1"},
                    "spec": {
                        "region": "eu",
                        "kubernetes": {"version": "1.29.1"},
                        "networking": {"type": "calico", "nodes": "10.0.0.0/22"},
                        "provider": {"type": "metal"},
                        "hibernation": {"enabled": true},
                        "unmodelled": {"kept": "ignored"}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_cluster_context_decodes_embedded_objects() {
        let ctx = ClusterContext::from_cluster(&cluster()).unwrap();
        assert_eq!(ctx.shoot_uid(), "uid-1");
        assert_eq!(ctx.seed_name(), "seed-a");
        assert!(ctx.is_hibernated());
        assert!(ctx.cloud_profile.spec.region_has_zone("eu", "muc"));
        assert!(!ctx.cloud_profile.spec.region_has_zone("us", "muc"));
        assert!(ctx.cloud_profile.spec.offers_machine_image("ubuntu", "22.4"));
        assert_eq!(
            ctx.shoot.spec.networking.unwrap().nodes.as_deref(),
            Some("10.0.0.0/22")
        );
    }

    #[test]
    fn test_cluster_context_rejects_malformed_shoot() {
        let mut cluster = cluster();
        cluster.spec.shoot.0 = json!({"spec": "not-an-object"});
        assert!(ClusterContext::from_cluster(&cluster).is_err());
    }

    #[test]
    fn test_infrastructure_status_nodes_cidr_field_name() {
        let infra: Infrastructure = serde_json::from_value(json!({
            "apiVersion": "extensions.gardener.cloud/v1alpha1",
            "kind": "Infrastructure",
            "metadata": {"name": "cluster", "namespace": "shoot--project--cluster"},
            "spec": {
                "type": "metal",
                "region": "eu",
                "secretRef": {"name": "cloudprovider", "namespace": "shoot--project--cluster"}
            },
            "status": {"nodesCIDR": "10.0.0.0/22", "observedGeneration": 3}
        }))
        .unwrap();
        let status = infra.status.unwrap();
        assert_eq!(status.nodes_cidr.as_deref(), Some("10.0.0.0/22"));
        assert_eq!(status.default.observed_generation, Some(3));
    }
}
