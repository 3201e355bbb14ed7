// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `machines.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::MachineImageMapping;
    use crate::gardener::extensions::MachineImageRef;
    use crate::reconcilers::fixtures::{NAMESPACE, PARTITION, PRIVATE_NETWORK, PROJECT, SHOOT_UID};

    fn pool(name: &str) -> WorkerPool {
        WorkerPool {
            name: name.to_string(),
            machine_type: "c1-large-x86".to_string(),
            machine_image: MachineImageRef {
                name: "ubuntu".to_string(),
                version: "22.4".to_string(),
            },
            minimum: 2,
            maximum: 4,
            labels: BTreeMap::from([("team".to_string(), "a".to_string())]),
            user_data: STANDARD.encode("#!/bin/sh"),
            ..Default::default()
        }
    }

    fn with_input<R>(f: impl FnOnce(&MachineInput<'_>) -> R) -> R {
        let credentials = Credentials::from_parts(Some("api-key"), None).unwrap();
        let config = ControllerConfig::default();
        let previous = WorkerStatus::default();
        let input = MachineInput {
            namespace: NAMESPACE,
            region: "eu",
            cluster_id: SHOOT_UID,
            kubernetes_version: "1.29.1",
            partition_id: PARTITION,
            project_id: PROJECT,
            network_id: PRIVATE_NETWORK,
            ssh_public_key: Some("ssh-ed25519 AAAA"),
            endpoint: "https://metal.example.com",
            credentials: &credentials,
            config: &config,
            previous: &previous,
        };
        f(&input)
    }

    #[test]
    fn test_machine_tags() {
        let tags = with_input(|input| machine_tags(input, &pool("pool-a")));
        assert_eq!(
            tags,
            vec![
                format!("kubernetes.io/cluster={NAMESPACE}"),
                "kubernetes.io/role=node".to_string(),
                "node.kubernetes.io/instance-type=c1-large-x86".to_string(),
                "topology.kubernetes.io/region=eu".to_string(),
                format!("topology.kubernetes.io/zone={PARTITION}"),
                format!("cluster.id={SHOOT_UID}"),
                format!("cluster.name={NAMESPACE}"),
                format!("cluster.project={PROJECT}"),
                "team=a".to_string(),
            ]
        );
    }

    #[test]
    fn test_pool_hash_is_stable() {
        let first = pool_hash(&pool("pool-a"), "1.29.1", PRIVATE_NETWORK).unwrap();
        let second = pool_hash(&pool("pool-a"), "1.29.1", PRIVATE_NETWORK).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);

        let mut changed = pool("pool-a");
        changed.machine_type = "c2-large-x86".to_string();
        assert_ne!(first, pool_hash(&changed, "1.29.1", PRIVATE_NETWORK).unwrap());
        assert_ne!(first, pool_hash(&pool("pool-a"), "1.30.0", PRIVATE_NETWORK).unwrap());
    }

    #[test]
    fn test_pool_hash_ignores_scaling() {
        let mut scaled = pool("pool-a");
        scaled.minimum = 10;
        scaled.maximum = 20;
        assert_eq!(
            pool_hash(&pool("pool-a"), "1.29.1", PRIVATE_NETWORK).unwrap(),
            pool_hash(&scaled, "1.29.1", PRIVATE_NETWORK).unwrap()
        );
    }

    #[test]
    fn test_resolve_machine_image_precedence() {
        let config = ControllerConfig {
            machine_images: vec![MachineImageMapping {
                name: "ubuntu".to_string(),
                version: "22.4".to_string(),
                image: "ubuntu-22.04-custom".to_string(),
            }],
            ..Default::default()
        };
        let previous = WorkerStatus {
            machine_images: vec![
                MachineImage {
                    name: "ubuntu".to_string(),
                    version: "22.4".to_string(),
                    image: "ubuntu-from-status".to_string(),
                },
                MachineImage {
                    name: "debian".to_string(),
                    version: "12".to_string(),
                    image: "debian-from-status".to_string(),
                },
            ],
        };

        assert_eq!(
            resolve_machine_image(&config, &previous, "ubuntu", "22.4").image,
            "ubuntu-22.04-custom"
        );
        assert_eq!(
            resolve_machine_image(&config, &previous, "debian", "12").image,
            "debian-from-status"
        );
        assert_eq!(
            resolve_machine_image(&config, &previous, "flatcar", "3510").image,
            "flatcar-3510"
        );
    }

    #[test]
    fn test_desired_replicas() {
        assert_eq!(desired_replicas(None, 2, 4), 2);
        assert_eq!(desired_replicas(Some(3), 2, 4), 3);
        assert_eq!(desired_replicas(Some(1), 2, 4), 2);
        assert_eq!(desired_replicas(Some(9), 2, 4), 4);
        assert_eq!(desired_replicas(Some(5), 3, 1), 3);
    }

    #[test]
    fn test_build_machine_plan() {
        let existing = BTreeMap::from([(deployment_name(NAMESPACE, "pool-b"), 7)]);
        let plan = with_input(|input| {
            build_machine_plan(input, &[pool("pool-a"), pool("pool-b")], &existing).unwrap()
        });

        assert_eq!(plan.deployments.len(), 2);
        assert_eq!(plan.classes.len(), 2);
        assert_eq!(plan.secrets.len(), 2);
        assert_eq!(plan.status.machine_images.len(), 1);
        assert_eq!(plan.status.machine_images[0].image, "ubuntu-22.4");

        let deployment = &plan.deployments[0];
        assert_eq!(deployment.name_any(), format!("{NAMESPACE}-pool-a"));
        assert_eq!(deployment.spec.replicas, 2);
        assert_eq!(plan.deployments[1].spec.replicas, 4);

        let class = &plan.classes[0];
        assert!(class.name_any().starts_with(&format!("{NAMESPACE}-pool-a-")));
        assert_eq!(deployment.spec.template.spec.class.name, class.name_any());
        assert_eq!(class.data["provider"], "metal");
        assert_eq!(class.data["providerSpec"]["network"], PRIVATE_NETWORK);
        assert_eq!(class.data["providerSpec"]["image"], "ubuntu-22.4");
        assert_eq!(class.data["secretRef"]["name"], class.name_any());

        let secret = &plan.secrets[0];
        assert_eq!(secret.name_any(), class.name_any());
        let data = secret.data.as_ref().unwrap();
        assert_eq!(data[SECRET_KEY_USER_DATA].0, b"#!/bin/sh".to_vec());
        assert_eq!(data[SECRET_KEY_API_KEY].0, b"api-key".to_vec());
        assert!(!data.contains_key(SECRET_KEY_HMAC));
        assert_eq!(
            secret.labels().get(LABEL_PURPOSE).map(String::as_str),
            Some(PURPOSE_MACHINE_CLASS)
        );

        let node_labels = &deployment.spec.template.spec.node_template.metadata.labels;
        assert_eq!(node_labels.get(LABEL_WORKER_POOL).map(String::as_str), Some("pool-a"));
        assert_eq!(node_labels.get("team").map(String::as_str), Some("a"));

        assert_eq!(
            plan.summaries,
            vec![
                MachineDeploymentSummary {
                    name: format!("{NAMESPACE}-pool-a"),
                    minimum: 2,
                    maximum: 4,
                },
                MachineDeploymentSummary {
                    name: format!("{NAMESPACE}-pool-b"),
                    minimum: 2,
                    maximum: 4,
                },
            ]
        );
    }

    fn machine_object(kind: &str, spec: serde_json::Value) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "machine.sapcloud.io/v1alpha1",
            "kind": kind,
            "metadata": {"name": "m", "namespace": NAMESPACE},
            "spec": spec,
        }))
        .unwrap()
    }

    #[test]
    fn test_referenced_class_of_sets_and_machines() {
        let set = machine_object(
            "MachineSet",
            json!({"template": {"spec": {"class": {"kind": "MachineClass", "name": "old"}}}}),
        );
        let machine = machine_object("Machine", json!({"class": {"kind": "MachineClass", "name": "old"}}));
        let unbound = machine_object("Machine", json!({"class": {"name": ""}}));

        assert_eq!(referenced_class(&set), Some("old"));
        assert_eq!(referenced_class(&machine), Some("old"));
        assert_eq!(referenced_class(&unbound), None);
    }

    #[test]
    fn test_old_class_kept_until_rollout_finished() {
        let mut updated = pool("pool-a");
        updated.machine_image.version = "24.4".to_string();
        let (old, new) = with_input(|input| {
            let old = build_machine_plan(input, &[pool("pool-a")], &BTreeMap::new()).unwrap();
            let new = build_machine_plan(input, &[updated], &BTreeMap::new()).unwrap();
            (old.classes[0].name_any(), new.classes[0].name_any())
        });
        assert_ne!(old, new);

        let existing = vec![old.clone(), new.clone()];
        let wanted = BTreeSet::from([new.clone()]);

        // the old machine set still runs machines of the old class
        let in_use = BTreeSet::from([old.clone(), new.clone()]);
        let (deletable, kept) = retired_classes(existing.clone(), &wanted, &in_use);
        assert!(deletable.is_empty());
        assert_eq!(kept, vec![old.clone()]);

        // rollout finished
        let in_use = BTreeSet::from([new]);
        let (deletable, kept) = retired_classes(existing, &wanted, &in_use);
        assert_eq!(deletable, vec![old]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_invalid_user_data_is_rejected() {
        let mut broken = pool("pool-a");
        broken.user_data = "not base64!".to_string();
        let err = with_input(|input| build_machine_plan(input, &[broken], &BTreeMap::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProviderConfig(_)));
    }
}
