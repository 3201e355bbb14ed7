// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared test objects for the reconciler tests.

use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::apis::codec::encode_value;
use crate::apis::metal::{
    CloudProfileConfig, Firewall, FirewallControllerVersion, IamConfig, InfrastructureConfig,
    IssuerConfig, MetalControlPlane, NftablesExporter, Partition,
};
use crate::gardener::extensions::{Cluster, ClusterContext, Infrastructure};
use crate::metal::{Machine, Network};
use crate::metal::types::{Allocation, PartitionRef};

pub const NAMESPACE: &str = "shoot--project--cluster";
pub const SHOOT_UID: &str = "8f0e2a4c-1111-2222-3333-444455556666";
pub const PROJECT: &str = "project-1";
pub const PARTITION: &str = "muc";
pub const NODE_CIDR: &str = "10.0.0.0/22";
pub const PRIVATE_NETWORK: &str = "private-network-1";
pub const FIREWALL_IMAGE: &str = "firewall-ubuntu-3.0.20240101";
pub const FIREWALL_SIZE: &str = "n1-medium-x86";

pub fn cloud_profile_config() -> CloudProfileConfig {
    let control_plane = MetalControlPlane {
        endpoint: "https://metal.example.com".to_string(),
        iam_config: Some(IamConfig {
            issuer_config: Some(IssuerConfig {
                url: "https://issuer.example.com".to_string(),
                client_id: "cluster-login".to_string(),
            }),
            ..Default::default()
        }),
        partitions: BTreeMap::from([(
            PARTITION.to_string(),
            Partition {
                firewall_types: vec![FIREWALL_SIZE.to_string()],
                network_isolation: None,
            },
        )]),
        firewall_images: vec![FIREWALL_IMAGE.to_string()],
        firewall_controller_versions: vec![FirewallControllerVersion {
            version: "v2.3.5".to_string(),
            url: "https://images.example.com/firewall-controller/v2.3.5".to_string(),
            classification: None,
        }],
        nftables_exporter: NftablesExporter {
            version: "v0.3.0".to_string(),
            url: "https://images.example.com/nftables-exporter/v0.3.0".to_string(),
        },
    };
    CloudProfileConfig {
        metal_control_planes: BTreeMap::from([("prod".to_string(), control_plane)]),
    }
}

pub fn infrastructure_config() -> InfrastructureConfig {
    InfrastructureConfig {
        partition_id: PARTITION.to_string(),
        project_id: PROJECT.to_string(),
        firewall: Firewall {
            size: FIREWALL_SIZE.to_string(),
            image: FIREWALL_IMAGE.to_string(),
            networks: vec!["internet".to_string()],
            controller_version: "auto".to_string(),
            ..Default::default()
        },
    }
}

pub fn cluster_context() -> ClusterContext {
    ClusterContext::from_cluster(&cluster()).expect("fixture cluster decodes")
}

pub fn cluster() -> Cluster {
    serde_json::from_value(json!({
        "apiVersion": "extensions.gardener.cloud/v1alpha1",
        "kind": "Cluster",
        "metadata": {"name": NAMESPACE},
        "spec": {
            "cloudProfile": {
                "apiVersion": "core.gardener.cloud/v1beta1",
                "kind": "CloudProfile",
                "metadata": {"name": "metal"},
                "spec": {
                    "type": "metal",
                    "regions": [{"name": "eu", "zones": [{"name": PARTITION}]}],
                    "machineImages": [{"name": "ubuntu", "versions": [{"version": "22.4"}]}],
                    "providerConfig": encode_value(&cloud_profile_config()).expect("encodes")
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
                "metadata": {
                    "name": "cluster",
                    "namespace": "garden-project",
                    "uid": SHOOT_UID,
                    "annotations": {"cluster.metal-stack.io/tenant": "tenant-a"}
                },
                "spec": {
                    "region": "eu",
                    "kubernetes": {"version": "1.29.1"},
                    "networking": {"type": "calico", "nodes": NODE_CIDR, "pods": "10.240.0.0/13"},
                    "provider": {
                        "type": "metal",
                        "infrastructureConfig": encode_value(&infrastructure_config()).expect("encodes"),
                        "workers": [{"name": "pool-a", "machine": {"type": "c1-large-x86"}}]
                    }
                }
            }
        }
    }))
    .expect("fixture cluster is valid")
}

pub fn infrastructure(nodes_cidr: Option<&str>, provider_status: Option<serde_json::Value>) -> Infrastructure {
    serde_json::from_value(json!({
        "apiVersion": "extensions.gardener.cloud/v1alpha1",
        "kind": "Infrastructure",
        "metadata": {"name": "cluster", "namespace": NAMESPACE, "generation": 1},
        "spec": {
            "type": "metal",
            "region": "eu",
            "secretRef": {"name": "cloudprovider", "namespace": NAMESPACE},
            "providerConfig": encode_value(&infrastructure_config()).expect("encodes")
        },
        "status": {
            "nodesCIDR": nodes_cidr,
            "providerStatus": provider_status
        }
    }))
    .expect("fixture infrastructure is valid")
}

pub fn private_network() -> Network {
    Network {
        id: PRIVATE_NETWORK.to_string(),
        projectid: Some(PROJECT.to_string()),
        partitionid: Some(PARTITION.to_string()),
        prefixes: vec![NODE_CIDR.to_string()],
        ..Default::default()
    }
}

pub fn external_network(id: &str, labels: &[(&str, &str)]) -> Network {
    Network {
        id: id.to_string(),
        partitionid: Some(PARTITION.to_string()),
        prefixes: vec!["185.1.2.0/24".to_string()],
        labels: labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        nat: true,
        ..Default::default()
    }
}

pub fn firewall_machine(id: &str, project: &str, succeeded: bool) -> Machine {
    Machine {
        id: id.to_string(),
        partition: Some(PartitionRef {
            id: PARTITION.to_string(),
        }),
        allocation: Some(Allocation {
            name: format!("{NAMESPACE}-firewall-abcde"),
            project: project.to_string(),
            succeeded,
            user_data: "ignition".to_string(),
            ssh_pub_keys: vec!["ssh-ed25519 AAAA".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A 2048 bit RSA key shared by all tests; generating one is slow.
pub fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key"))
}

/// Self-signed cluster CA as `(ca.crt, ca.key)`, the key in PKCS#1 form.
pub fn cluster_ca() -> (String, String) {
    let key = rsa_key();
    let pkcs8 = key.to_pkcs8_pem(LineEnding::LF).expect("encode PKCS#8");
    let key_pair = rcgen::KeyPair::from_pem(&pkcs8).expect("load CA key");

    let mut params = rcgen::CertificateParams::default();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "kubernetes");
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.key_usages = vec![
        rcgen::KeyUsagePurpose::KeyCertSign,
        rcgen::KeyUsagePurpose::CrlSign,
    ];
    let cert = params.self_signed(&key_pair).expect("self-sign CA");

    let pkcs1 = key.to_pkcs1_pem(LineEnding::LF).expect("encode PKCS#1");
    (cert.pem(), pkcs1.to_string())
}
