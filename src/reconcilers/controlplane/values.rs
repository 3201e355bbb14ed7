// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Chart values of the shoot control plane.
//!
//! Every builder here is pure. The actuator gathers the inputs (networks,
//! IAM config, storage endpoints) and merges the partial value trees; later
//! trees win on conflicting top-level keys.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::apis::metal::{ControlPlaneConfig, IamConfig, InfrastructureConfig, MetalControlPlane};
use crate::config::{ControllerConfig, DurosSeedConfig};
use crate::constants::AUTHN_WEBHOOK_SERVICE_NAME;
use crate::errors::Result;
use crate::gardener::extensions::ClusterContext;
use crate::imagevector::ImageVector;
use crate::labels::{ANNOTATION_CLUSTER_TENANT, ANNOTATION_PROVIDER_TENANT};
use crate::metal::Credentials;

/// Pod annotation carrying the checksum of the cloud provider secret
pub const CHECKSUM_CLOUD_PROVIDER: &str = "checksum/secret-cloudprovider";

/// Inputs of the control plane values of one shoot
#[derive(Clone, Debug)]
pub struct ValuesInput<'a> {
    pub namespace: &'a str,
    pub cluster: &'a ClusterContext,
    pub control_plane_config: &'a ControlPlaneConfig,
    pub infrastructure_config: &'a InfrastructureConfig,
    pub metal_control_plane: &'a MetalControlPlane,
    /// Effective IAM config (cloud profile merged with control plane config)
    pub iam: &'a IamConfig,
    pub config: &'a ControllerConfig,
    pub private_network_id: &'a str,
    pub default_external_network: &'a str,
    pub checksums: &'a BTreeMap<String, String>,
    /// Duros configuration of the seed, if the shoot gets storage
    pub storage: Option<&'a DurosSeedConfig>,
}

impl ValuesInput<'_> {
    fn shoot_name(&self) -> String {
        self.cluster.shoot.metadata.name.clone().unwrap_or_default()
    }

    fn tenant(&self) -> String {
        self.cluster
            .shoot
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_CLUSTER_TENANT))
            .cloned()
            .unwrap_or_default()
    }

    fn provider_tenant(&self) -> String {
        self.cluster
            .shoot
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_PROVIDER_TENANT))
            .cloned()
            .unwrap_or_else(|| self.tenant())
    }
}

/// Shallow merge of value trees; later trees win
#[must_use]
pub fn merge_values<I>(parts: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = Map::new();
    for part in parts {
        if let Value::Object(map) = part {
            merged.extend(map);
        }
    }
    Value::Object(merged)
}

/// Image references of `names` keyed by name
///
/// # Errors
///
/// Returns [`crate::errors::Error::Internal`] if an image is missing from the vector.
pub fn image_values(vector: &ImageVector, names: &[&str]) -> Result<Value> {
    let mut images = Map::new();
    for name in names {
        images.insert((*name).to_string(), Value::String(vector.get(name)?.image()));
    }
    Ok(Value::Object(images))
}

/// Checksum of the credentials, rolled into pod annotations so workloads
/// restart when the credentials change
#[must_use]
pub fn credentials_checksum(credentials: &Credentials) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credentials.api_key().as_bytes());
    hasher.update(b"\n");
    hasher.update(credentials.hmac().as_bytes());
    hex::encode(hasher.finalize())
}

/// `true` if the shoot's API server audit log is forwarded
#[must_use]
pub fn cluster_audit_enabled(cp: &ControlPlaneConfig, config: &ControllerConfig) -> bool {
    config.cluster_audit.enabled && cp.feature_gates.cluster_audit.unwrap_or(false)
}

/// `true` if the audit log is also forwarded to splunk
#[must_use]
pub fn audit_to_splunk_enabled(cp: &ControlPlaneConfig, config: &ControllerConfig) -> bool {
    cluster_audit_enabled(cp, config)
        && config.audit_to_splunk.enabled
        && cp.feature_gates.audit_to_splunk.unwrap_or(false)
}

/// Replicas of the cloud controller manager
#[must_use]
pub fn ccm_replicas(hibernated: bool) -> i32 {
    i32::from(!hibernated)
}

/// URL of the authentication webhook in the seed namespace
#[must_use]
pub fn authn_webhook_url(namespace: &str) -> String {
    format!("https://{AUTHN_WEBHOOK_SERVICE_NAME}.{namespace}.svc.cluster.local/authenticate")
}

/// Values of the cloud provider config chart
#[must_use]
pub fn config_values(input: &ValuesInput<'_>) -> Value {
    json!({
        "authnWebhook": {
            "url": authn_webhook_url(input.namespace),
            "enabled": input.iam.issuer_config.is_some(),
        },
        "clusterAudit": {
            "enabled": cluster_audit_enabled(input.control_plane_config, input.config),
        },
    })
}

/// Values of the cloud controller manager
#[must_use]
pub fn control_plane_values(input: &ValuesInput<'_>) -> Value {
    let shoot = &input.cluster.shoot;
    let ccm = input.control_plane_config.cloud_controller_manager.as_ref();
    let feature_gates = ccm.map(|c| c.feature_gates.clone()).unwrap_or_default();
    let pod_network = shoot
        .spec
        .networking
        .as_ref()
        .and_then(|n| n.pods.clone())
        .unwrap_or_default();

    json!({
        "kubernetesVersion": shoot.spec.kubernetes.version,
        "networkAccessType": input.control_plane_config.network_access_type(),
        "cloudControllerManager": {
            "replicas": ccm_replicas(input.cluster.is_hibernated()),
            "projectID": input.infrastructure_config.project_id,
            "clusterID": input.cluster.shoot_uid(),
            "partitionID": input.infrastructure_config.partition_id,
            "networkID": input.private_network_id,
            "podNetwork": pod_network,
            "defaultExternalNetwork": input.default_external_network,
            "metal": {
                "endpoint": input.metal_control_plane.endpoint,
            },
            "podAnnotations": input.checksums,
            "featureGates": feature_gates,
        },
    })
}

/// Values of the authentication webhook and the group rolebinding controller
#[must_use]
pub fn auth_values(input: &ValuesInput<'_>) -> Value {
    let cluster_name = input.shoot_name();
    let issuer = input.iam.issuer_config.clone().unwrap_or_default();
    let groups = input.iam.group_config.clone().unwrap_or_default();

    let mut group_rolebinding = json!({
        "enabled": input.iam.group_config.is_some(),
        "clusterName": cluster_name,
        "excludedNamespaces": groups.excluded_namespaces,
        "expectedGroupsList": groups.expected_groups_list,
    });
    if let Some(max) = groups.namespace_max_length {
        group_rolebinding["namespaceMaxLength"] = json!(max);
    }

    json!({
        "authnWebhook": {
            "enabled": input.iam.issuer_config.is_some(),
            "tenant": input.tenant(),
            "providerTenant": input.provider_tenant(),
            "clusterName": cluster_name,
            "oidc": {
                "issuerUrl": issuer.url,
                "issuerClientId": issuer.client_id,
            },
        },
        "groupRolebindingController": group_rolebinding,
    })
}

/// Values of the cluster audit forwarding
#[must_use]
pub fn cluster_audit_values(input: &ValuesInput<'_>) -> Value {
    json!({
        "clusterAudit": {
            "enabled": cluster_audit_enabled(input.control_plane_config, input.config),
        },
        "auditToSplunk": {
            "enabled": audit_to_splunk_enabled(input.control_plane_config, input.config),
        },
    })
}

/// Values of the accounting exporter
#[must_use]
pub fn accounting_values(input: &ValuesInput<'_>) -> Value {
    let exporter = &input.config.accounting_exporter;
    if !exporter.enabled {
        return json!({"accountingExporter": {"enabled": false}});
    }
    json!({
        "accountingExporter": {
            "enabled": true,
            "networkTraffic": {
                "enabled": exporter.network_traffic.enabled,
            },
            "enrichments": {
                "partitionID": input.infrastructure_config.partition_id,
                "tenant": input.tenant(),
                "projectID": input.infrastructure_config.project_id,
                "clusterName": input.shoot_name(),
                "clusterID": input.cluster.shoot_uid(),
            },
            "client": {
                "hostname": exporter.client.hostname,
                "port": exporter.client.port,
                "ca": exporter.client.ca,
                "cert": exporter.client.cert,
                "certKey": exporter.client.cert_key,
            },
        },
    })
}

/// Values of the duros storage integration
#[must_use]
pub fn storage_values(input: &ValuesInput<'_>) -> Value {
    let Some(duros) = input.storage else {
        return json!({"duros": {"enabled": false}});
    };

    let encryption = input
        .control_plane_config
        .feature_gates
        .duros_storage_encryption
        .unwrap_or(false);
    let classes: Vec<_> = duros
        .storage_classes
        .iter()
        .filter(|c| encryption || !c.encryption)
        .collect();
    let default_class = input
        .control_plane_config
        .custom_default_storage_class
        .as_ref()
        .map(|c| c.class_name.clone())
        .or_else(|| classes.first().map(|c| c.name.clone()))
        .unwrap_or_default();

    let storage_classes: Vec<Value> = classes
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "replicaCount": c.replica_count,
                "compression": c.compression,
                "encryption": c.encryption,
                "default": c.name == default_class,
            })
        })
        .collect();

    json!({
        "duros": {
            "enabled": true,
            "endpoints": duros.endpoints,
            "adminKey": duros.admin_key,
            "adminToken": duros.admin_token,
            "projectID": input.infrastructure_config.project_id,
            "storageClasses": storage_classes,
        },
    })
}

/// Values of the seed-side control plane chart
#[must_use]
pub fn seed_chart_values(input: &ValuesInput<'_>, images: Value) -> Value {
    merge_values([
        control_plane_values(input),
        auth_values(input),
        cluster_audit_values(input),
        accounting_values(input),
        storage_values(input),
        json!({ "images": images }),
    ])
}

/// Values of the shoot-side control plane chart
///
/// `firewall` carries the signed firewall spec and `images` the add-on images.
#[must_use]
pub fn shoot_chart_values(input: &ValuesInput<'_>, firewall: Value, images: Value) -> Value {
    merge_values([
        cluster_audit_values(input),
        accounting_values(input),
        storage_values(input),
        json!({ "firewall": firewall, "images": images }),
    ])
}

#[cfg(test)]
#[path = "values_tests.rs"]
mod values_tests;
