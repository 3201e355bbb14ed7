// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label, annotation and tag keys.
//!
//! Kubernetes labels and annotations used on seed and shoot objects, plus the
//! tag keys attached to metal-API entities (machines, IPs, networks).

// ============================================================================
// Host Platform Annotations
// ============================================================================

/// Annotation carrying the requested extension operation
pub const ANNOTATION_OPERATION: &str = "gardener.cloud/operation";

/// Operation value requesting a migration to another seed
pub const OPERATION_MIGRATE: &str = "migrate";

/// Operation value requesting a restore after migration
pub const OPERATION_RESTORE: &str = "restore";

/// Operation value requesting an immediate reconcile
pub const OPERATION_RECONCILE: &str = "reconcile";

/// Shoot annotation naming the cluster tenant (required on create, immutable)
pub const ANNOTATION_CLUSTER_TENANT: &str = "cluster.metal-stack.io/tenant";

/// Shoot annotation naming the tenant of the provider account
pub const ANNOTATION_PROVIDER_TENANT: &str = "cluster.metal-stack.io/provider-tenant";

/// Annotation linking a service-account token secret to its account
pub const ANNOTATION_SERVICE_ACCOUNT_UID: &str = "kubernetes.io/service-account.uid";

/// Annotation linking a service-account token secret to its account by name
pub const ANNOTATION_SERVICE_ACCOUNT_NAME: &str = "kubernetes.io/service-account.name";

// ============================================================================
// Kubernetes Labels
// ============================================================================

/// Selector label on firewall resources and machine tag (`cluster.id=<shoot-uid>`)
pub const LABEL_CLUSTER_ID: &str = "cluster.id";

/// Label marking secrets that must travel from the shoot back to the seed on restore
pub const LABEL_MIGRATION_SECRET: &str = "firewall.metal-stack.io/migration-secret";

/// Label identifying the chart a values secret belongs to
pub const LABEL_CHART: &str = "extensions.gardener.cloud/chart";

/// Label marking objects managed by this extension
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`]
pub const MANAGED_BY_VALUE: &str = "provider-metal";

/// Label identifying the worker pool on machine classes and deployments
pub const LABEL_WORKER_POOL: &str = "worker.gardener.cloud/pool";

/// Label naming the purpose of a secret
pub const LABEL_PURPOSE: &str = "gardener.cloud/purpose";

/// Value of [`LABEL_PURPOSE`] on machine-class credential secrets
pub const PURPOSE_MACHINE_CLASS: &str = "machineclass";

/// Finalizer of the machine-controller-manager on machine-class secrets
pub const FINALIZER_MACHINE_CONTROLLER: &str = "machine.sapcloud.io/machine-controller";

/// Label marking cloud provider secrets checked by the admission webhook
pub const LABEL_PROVIDER_SECRET: &str = "provider.extensions.gardener.cloud/metal";

/// Build the object-selector label put on the firewall deployment
/// (`shoot.<namespace>=<namespace>`).
#[must_use]
pub fn shoot_selector_label(namespace: &str) -> (String, String) {
    (format!("shoot.{namespace}"), namespace.to_string())
}

// ============================================================================
// Metal API Tags
// ============================================================================

/// Tag key binding a metal entity to a cluster
pub const TAG_CLUSTER_ID: &str = "cluster.metal-stack.io/id";

/// Tag key binding an IP to a `LoadBalancer` service of a cluster
/// (`<key>=<cluster-id>/<namespace>/<service>`)
pub const TAG_CLUSTER_SERVICE: &str = "cluster.metal-stack.io/id/namespace/service";

/// Tag key carrying the cluster's human readable name
pub const TAG_CLUSTER_NAME: &str = "cluster.name";

/// Tag key carrying the cluster's project
pub const TAG_CLUSTER_PROJECT: &str = "cluster.project";

/// Tag key marking the machine as part of the cluster
pub const TAG_KUBERNETES_CLUSTER: &str = "kubernetes.io/cluster";

/// Tag key carrying the machine role
pub const TAG_KUBERNETES_ROLE: &str = "kubernetes.io/role";

/// Tag key carrying the machine size
pub const TAG_INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";

/// Tag key carrying the region
pub const TAG_TOPOLOGY_REGION: &str = "topology.kubernetes.io/region";

/// Tag key carrying the partition
pub const TAG_TOPOLOGY_ZONE: &str = "topology.kubernetes.io/zone";

/// IP type released together with the cluster
pub const IP_TYPE_EPHEMERAL: &str = "ephemeral";

// ============================================================================
// Metal Network Labels
// ============================================================================

/// Network label marking the default external network
pub const NETWORK_LABEL_DEFAULT_EXTERNAL: &str = "network.default-external";

/// Network label marking the partition's storage network
pub const NETWORK_LABEL_PARTITION_STORAGE: &str = "network.partition-storage";

/// Build the `key=value` tag of a cluster id
#[must_use]
pub fn cluster_id_tag(cluster_id: &str) -> String {
    format!("{TAG_CLUSTER_ID}={cluster_id}")
}

/// Return the cluster id a metal tag refers to, if any.
///
/// Recognises `cluster.id=<id>` (the machine tag), `cluster.metal-stack.io/id=<id>`
/// and the service form
/// `cluster.metal-stack.io/id/namespace/service=<id>/<namespace>/<service>`.
#[must_use]
pub fn cluster_id_of_tag(tag: &str) -> Option<&str> {
    let (key, value) = tag.split_once('=')?;
    match key {
        LABEL_CLUSTER_ID | TAG_CLUSTER_ID => Some(value).filter(|id| !id.is_empty()),
        TAG_CLUSTER_SERVICE => value.split('/').next().filter(|id| !id.is_empty()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
