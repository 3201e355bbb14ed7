// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Machine classes and machine deployments of the worker pools.
//!
//! Each pool yields one credentials secret, one `MachineClass` and one
//! `MachineDeployment`. The class name carries a hash of everything that
//! requires new machines, so a changed pool rolls its machines.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{DeleteParams, DynamicObject, ListParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::apis::metal::{MachineImage, WorkerStatus};
use crate::config::ControllerConfig;
use crate::constants::{FIELD_MANAGER, PROVIDER_TYPE};
use crate::errors::{Error, Result};
use crate::gardener::extensions::{MachineDeploymentSummary, WorkerPool};
use crate::labels::{
    LABEL_CLUSTER_ID, LABEL_MANAGED_BY, LABEL_PURPOSE, LABEL_WORKER_POOL, MANAGED_BY_VALUE,
    PURPOSE_MACHINE_CLASS, TAG_CLUSTER_NAME, TAG_CLUSTER_PROJECT, TAG_INSTANCE_TYPE,
    TAG_KUBERNETES_CLUSTER, TAG_KUBERNETES_ROLE, TAG_TOPOLOGY_REGION, TAG_TOPOLOGY_ZONE,
};
use crate::mcm::{
    machine_class_resource, machine_resource, machine_set_resource, ClassSpec, MachineDeployment, MachineDeploymentSpec,
    MachineDeploymentStrategy, MachineSelector, MachineSpec, MachineTemplateMetadata,
    MachineTemplateSpec, MetalMachineClassSpec, NodeTemplateMetadata, NodeTemplateNodeSpec,
    NodeTemplateSpec, RollingUpdate, MACHINE_CLASS_KIND,
};
use crate::metal::credentials::{SECRET_KEY_API_KEY, SECRET_KEY_API_URL, SECRET_KEY_HMAC};
use crate::metal::Credentials;
use crate::reconcilers::resources::{
    apply_dynamic, create_or_apply, delete_if_exists, is_kube_not_found,
};

/// Secret key holding the decoded user data of a pool
pub const SECRET_KEY_USER_DATA: &str = "userData";

const CLASS_HASH_LEN: usize = 5;

/// Everything the machine plan is derived from
#[derive(Clone, Debug)]
pub struct MachineInput<'a> {
    pub namespace: &'a str,
    pub region: &'a str,
    pub cluster_id: &'a str,
    pub kubernetes_version: &'a str,
    pub partition_id: &'a str,
    pub project_id: &'a str,
    pub network_id: &'a str,
    pub ssh_public_key: Option<&'a str>,
    pub endpoint: &'a str,
    pub credentials: &'a Credentials,
    pub config: &'a ControllerConfig,
    pub previous: &'a WorkerStatus,
}

/// The objects of all worker pools
#[derive(Clone, Debug, Default)]
pub struct MachinePlan {
    pub secrets: Vec<Secret>,
    pub classes: Vec<DynamicObject>,
    pub deployments: Vec<MachineDeployment>,
    pub summaries: Vec<MachineDeploymentSummary>,
    pub status: WorkerStatus,
}

/// `<namespace>-<pool>`
#[must_use]
pub fn deployment_name(namespace: &str, pool: &str) -> String {
    format!("{namespace}-{pool}")
}

/// Hash of the pool fields that require new machines when they change.
///
/// # Errors
///
/// Returns [`Error::Json`] if the pool cannot be serialized.
pub fn pool_hash(pool: &WorkerPool, kubernetes_version: &str, network_id: &str) -> Result<String> {
    let input = serde_json::to_vec(&json!({
        "machineType": pool.machine_type,
        "machineImage": pool.machine_image,
        "providerConfig": pool.provider_config,
        "volume": pool.volume,
        "userData": pool.user_data,
        "kubernetesVersion": kubernetes_version,
        "network": network_id,
    }))?;
    let digest = hex::encode(Sha256::digest(&input));
    Ok(digest[..CLASS_HASH_LEN].to_string())
}

/// Metal tags of the machines of a pool
#[must_use]
pub fn machine_tags(input: &MachineInput<'_>, pool: &WorkerPool) -> Vec<String> {
    let mut tags = vec![
        format!("{TAG_KUBERNETES_CLUSTER}={}", input.namespace),
        format!("{TAG_KUBERNETES_ROLE}=node"),
        format!("{TAG_INSTANCE_TYPE}={}", pool.machine_type),
        format!("{TAG_TOPOLOGY_REGION}={}", input.region),
        format!("{TAG_TOPOLOGY_ZONE}={}", input.partition_id),
        format!("{LABEL_CLUSTER_ID}={}", input.cluster_id),
        format!("{TAG_CLUSTER_NAME}={}", input.namespace),
        format!("{TAG_CLUSTER_PROJECT}={}", input.project_id),
    ];
    tags.extend(pool.labels.iter().map(|(k, v)| format!("{k}={v}")));
    tags
}

/// Resolve the metal image id of a machine image.
///
/// The controller configuration wins over images recorded in the previous
/// worker status; otherwise the id is `<name>-<version>`.
#[must_use]
pub fn resolve_machine_image(
    config: &ControllerConfig,
    previous: &WorkerStatus,
    name: &str,
    version: &str,
) -> MachineImage {
    let image = config
        .machine_image(name, version)
        .map(str::to_string)
        .or_else(|| {
            previous
                .machine_images
                .iter()
                .find(|i| i.name == name && i.version == version)
                .map(|i| i.image.clone())
        })
        .unwrap_or_else(|| format!("{name}-{version}"));
    MachineImage {
        name: name.to_string(),
        version: version.to_string(),
        image,
    }
}

/// Replicas of a machine deployment: the current value clamped to the pool's
/// bounds, or the minimum for new deployments.
#[must_use]
pub fn desired_replicas(existing: Option<i32>, minimum: i32, maximum: i32) -> i32 {
    match existing {
        Some(current) => current.clamp(minimum, maximum.max(minimum)),
        None => minimum,
    }
}

fn managed_labels(pool: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string()),
        (LABEL_WORKER_POOL.to_string(), pool.to_string()),
    ])
}

fn class_secret(
    input: &MachineInput<'_>,
    class_name: &str,
    pool: &WorkerPool,
) -> Result<Secret> {
    let user_data = STANDARD.decode(pool.user_data.as_bytes()).map_err(|e| {
        Error::InvalidProviderConfig(format!("user data of pool {} is not base64: {e}", pool.name))
    })?;

    let mut labels = managed_labels(&pool.name);
    labels.insert(LABEL_PURPOSE.to_string(), PURPOSE_MACHINE_CLASS.to_string());

    let mut data = BTreeMap::from([
        (SECRET_KEY_USER_DATA.to_string(), ByteString(user_data)),
        (
            SECRET_KEY_API_URL.to_string(),
            ByteString(input.endpoint.as_bytes().to_vec()),
        ),
    ]);
    if !input.credentials.api_key().is_empty() {
        data.insert(
            SECRET_KEY_API_KEY.to_string(),
            ByteString(input.credentials.api_key().as_bytes().to_vec()),
        );
    }
    if !input.credentials.hmac().is_empty() {
        data.insert(
            SECRET_KEY_HMAC.to_string(),
            ByteString(input.credentials.hmac().as_bytes().to_vec()),
        );
    }

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(class_name.to_string()),
            namespace: Some(input.namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    })
}

fn machine_class(
    input: &MachineInput<'_>,
    class_name: &str,
    pool: &WorkerPool,
    spec: &MetalMachineClassSpec,
) -> Result<DynamicObject> {
    let mut class = DynamicObject::new(class_name, &machine_class_resource()).within(input.namespace);
    class.metadata.labels = Some(managed_labels(&pool.name));
    class.data = json!({
        "providerSpec": serde_json::to_value(spec)?,
        "secretRef": {"name": class_name, "namespace": input.namespace},
        "credentialsSecretRef": {"name": class_name, "namespace": input.namespace},
        "provider": PROVIDER_TYPE,
    });
    Ok(class)
}

fn machine_deployment(
    input: &MachineInput<'_>,
    name: &str,
    class_name: &str,
    pool: &WorkerPool,
    replicas: i32,
) -> MachineDeployment {
    let selector = BTreeMap::from([("name".to_string(), name.to_string())]);

    let mut node_labels = pool.labels.clone();
    node_labels.insert(LABEL_WORKER_POOL.to_string(), pool.name.clone());

    let mut deployment = MachineDeployment::new(
        name,
        MachineDeploymentSpec {
            replicas,
            min_ready_seconds: 500,
            strategy: MachineDeploymentStrategy {
                strategy_type: "RollingUpdate".to_string(),
                rolling_update: Some(RollingUpdate {
                    max_surge: pool.max_surge.clone(),
                    max_unavailable: pool.max_unavailable.clone(),
                }),
            },
            selector: MachineSelector {
                match_labels: selector.clone(),
            },
            template: MachineTemplateSpec {
                metadata: MachineTemplateMetadata { labels: selector },
                spec: MachineSpec {
                    class: ClassSpec {
                        kind: MACHINE_CLASS_KIND.to_string(),
                        name: class_name.to_string(),
                    },
                    node_template: NodeTemplateSpec {
                        metadata: NodeTemplateMetadata {
                            labels: node_labels,
                            annotations: pool.annotations.clone(),
                        },
                        spec: NodeTemplateNodeSpec {
                            taints: pool.taints.clone(),
                        },
                    },
                },
            },
        },
    );
    deployment.metadata.namespace = Some(input.namespace.to_string());
    deployment.metadata.labels = Some(managed_labels(&pool.name));
    deployment
}

/// Derive the machine objects of all pools.
///
/// `existing_replicas` maps deployment names to their current replicas.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if a pool's user data is not
/// base64 encoded.
pub fn build_machine_plan(
    input: &MachineInput<'_>,
    pools: &[WorkerPool],
    existing_replicas: &BTreeMap<String, i32>,
) -> Result<MachinePlan> {
    let mut plan = MachinePlan::default();

    for pool in pools {
        let name = deployment_name(input.namespace, &pool.name);
        let class_name = format!(
            "{name}-{}",
            pool_hash(pool, input.kubernetes_version, input.network_id)?
        );

        let image = resolve_machine_image(
            input.config,
            input.previous,
            &pool.machine_image.name,
            &pool.machine_image.version,
        );
        let spec = MetalMachineClassSpec {
            partition: input.partition_id.to_string(),
            size: pool.machine_type.clone(),
            project: input.project_id.to_string(),
            network: input.network_id.to_string(),
            image: image.image.clone(),
            tags: machine_tags(input, pool),
            sshkeys: input
                .ssh_public_key
                .filter(|k| !k.is_empty())
                .map(|k| vec![k.to_string()])
                .unwrap_or_default(),
        };
        if !plan.status.machine_images.contains(&image) {
            plan.status.machine_images.push(image);
        }

        plan.secrets.push(class_secret(input, &class_name, pool)?);
        plan.classes.push(machine_class(input, &class_name, pool, &spec)?);

        let replicas = desired_replicas(existing_replicas.get(&name).copied(), pool.minimum, pool.maximum);
        plan.deployments
            .push(machine_deployment(input, &name, &class_name, pool, replicas));
        plan.summaries.push(MachineDeploymentSummary {
            name,
            minimum: pool.minimum,
            maximum: pool.maximum,
        });
    }

    Ok(plan)
}

/// Current replicas of the managed machine deployments of a namespace.
///
/// # Errors
///
/// Propagates API errors.
pub async fn existing_replicas(client: &Client, namespace: &str) -> Result<BTreeMap<String, i32>> {
    let api: Api<MachineDeployment> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await?;
    Ok(list
        .items
        .into_iter()
        .map(|d| (d.name_any(), d.spec.replicas))
        .collect())
}

/// Apply the plan and delete managed objects it no longer contains.
///
/// Classes of a previous pool hash stay until no machine set or machine
/// references them. Returns the number of such classes still in use.
///
/// # Errors
///
/// Propagates API errors.
pub async fn deploy_machine_plan(client: &Client, namespace: &str, plan: &MachinePlan) -> Result<usize> {
    for secret in &plan.secrets {
        create_or_apply(client, namespace, secret, FIELD_MANAGER).await?;
    }
    for class in &plan.classes {
        apply_dynamic(client, namespace, &machine_class_resource(), class, FIELD_MANAGER).await?;
    }
    for deployment in &plan.deployments {
        create_or_apply(client, namespace, deployment, FIELD_MANAGER).await?;
    }

    let wanted: BTreeSet<String> = plan.deployments.iter().map(ResourceExt::name_any).collect();
    delete_stale_deployments(client, namespace, &wanted).await?;

    // classes and secrets share their names
    let wanted: BTreeSet<String> = plan.classes.iter().map(ResourceExt::name_any).collect();
    let in_use = delete_stale_classes(client, namespace, &wanted).await?;
    info!(
        namespace = %namespace,
        deployments = plan.deployments.len(),
        retiring_classes = in_use,
        "deployed machine plan"
    );
    Ok(in_use)
}

/// Machine class named by a machine set (`spec.template.spec.class`) or a
/// machine (`spec.class`).
#[must_use]
pub fn referenced_class(object: &DynamicObject) -> Option<&str> {
    let spec = object.data.get("spec")?;
    spec.pointer("/template/spec/class/name")
        .or_else(|| spec.pointer("/class/name"))
        .and_then(serde_json::Value::as_str)
        .filter(|name| !name.is_empty())
}

/// Names of the machine classes still referenced by machine sets or machines.
///
/// # Errors
///
/// Propagates API errors.
pub async fn classes_in_use(client: &Client, namespace: &str) -> Result<BTreeSet<String>> {
    let mut in_use = BTreeSet::new();
    for resource in [machine_set_resource(), machine_resource()] {
        let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &resource);
        for object in api.list(&ListParams::default()).await?.items {
            if let Some(class) = referenced_class(&object) {
                in_use.insert(class.to_string());
            }
        }
    }
    Ok(in_use)
}

/// Split the stale class names of `existing` into those that can be deleted
/// and those still in use.
#[must_use]
pub fn retired_classes(
    existing: impl IntoIterator<Item = String>,
    wanted: &BTreeSet<String>,
    in_use: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    existing
        .into_iter()
        .filter(|name| !wanted.contains(name))
        .partition(|name| !in_use.contains(name))
}

/// Delete managed machine deployments whose name is not in `wanted`.
///
/// Returns the number of managed deployments that remain.
///
/// # Errors
///
/// Propagates API errors.
pub async fn delete_stale_deployments(
    client: &Client,
    namespace: &str,
    wanted: &BTreeSet<String>,
) -> Result<usize> {
    let api: Api<MachineDeployment> = Api::namespaced(client.clone(), namespace);
    let selector = format!("{LABEL_MANAGED_BY}={MANAGED_BY_VALUE}");
    let list = api.list(&ListParams::default().labels(&selector)).await?;
    let mut remaining = 0;
    for deployment in list.items {
        let name = deployment.name_any();
        if wanted.contains(&name) {
            remaining += 1;
            continue;
        }
        debug!(namespace = %namespace, name = %name, "deleting stale machine deployment");
        if delete_if_exists::<MachineDeployment>(client, namespace, &name, &DeleteParams::default())
            .await?
        {
            remaining += 1;
        }
    }
    Ok(remaining)
}

/// Delete managed machine classes and their secrets whose name is not in
/// `wanted` and that no machine set or machine references anymore.
///
/// Returns the number of stale classes kept because they are still in use.
///
/// # Errors
///
/// Propagates API errors.
pub async fn delete_stale_classes(
    client: &Client,
    namespace: &str,
    wanted: &BTreeSet<String>,
) -> Result<usize> {
    let in_use = classes_in_use(client, namespace).await?;
    let selector = format!("{LABEL_MANAGED_BY}={MANAGED_BY_VALUE}");
    let classes: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), namespace, &machine_class_resource());
    let existing = classes
        .list(&ListParams::default().labels(&selector))
        .await?
        .items
        .iter()
        .map(ResourceExt::name_any)
        .collect::<Vec<_>>();
    let (deletable, kept) = retired_classes(existing, wanted, &in_use);
    for name in &kept {
        debug!(namespace = %namespace, name = %name, "keeping machine class still referenced by machines");
    }
    for name in &deletable {
        debug!(namespace = %namespace, name = %name, "deleting stale machine class");
        match classes.delete(name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(e) if is_kube_not_found(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let selector = format!("{selector},{LABEL_PURPOSE}={PURPOSE_MACHINE_CLASS}");
    for secret in secrets.list(&ListParams::default().labels(&selector)).await?.items {
        let name = secret.name_any();
        if !wanted.contains(&name) && !in_use.contains(&name) {
            delete_if_exists::<Secret>(client, namespace, &name, &DeleteParams::default()).await?;
        }
    }
    Ok(kept.len())
}

#[cfg(test)]
#[path = "machines_tests.rs"]
mod machines_tests;
