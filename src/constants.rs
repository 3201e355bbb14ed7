// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the metal provider extension.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Provider Constants
// ============================================================================

/// Provider type handled by this extension (`spec.type` of extension resources)
pub const PROVIDER_TYPE: &str = "metal";

/// API group of the provider-specific configuration payloads
pub const PROVIDER_API_GROUP: &str = "metal.provider.extensions.gardener.cloud";

/// Current wire version of the provider-specific configuration payloads
pub const PROVIDER_API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version) of the provider payloads
pub const PROVIDER_API_GROUP_VERSION: &str = "metal.provider.extensions.gardener.cloud/v1alpha1";

/// Kind name for `CloudProfileConfig`
pub const KIND_CLOUD_PROFILE_CONFIG: &str = "CloudProfileConfig";

/// Kind name for `InfrastructureConfig`
pub const KIND_INFRASTRUCTURE_CONFIG: &str = "InfrastructureConfig";

/// Kind name for `InfrastructureStatus`
pub const KIND_INFRASTRUCTURE_STATUS: &str = "InfrastructureStatus";

/// Kind name for `ControlPlaneConfig`
pub const KIND_CONTROL_PLANE_CONFIG: &str = "ControlPlaneConfig";

/// Kind name for `WorkerConfig`
pub const KIND_WORKER_CONFIG: &str = "WorkerConfig";

/// Kind name for `WorkerStatus`
pub const KIND_WORKER_STATUS: &str = "WorkerStatus";

/// Finalizer placed on every extension resource managed by this provider
pub const EXTENSION_FINALIZER: &str = "extensions.gardener.cloud/metal";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "provider-metal";

// ============================================================================
// Firewall Constants
// ============================================================================

/// Sentinel for `firewall.controllerVersion` meaning "use the bundled controller"
pub const FIREWALL_CONTROLLER_VERSION_AUTO: &str = "auto";

/// Name of the firewall controller image in the image vector
pub const IMAGE_NAME_FIREWALL_CONTROLLER: &str = "firewall-controller";

/// Name of the droptailer image in the image vector
pub const IMAGE_NAME_DROPTAILER: &str = "droptailer";

/// Name of the audittailer image in the image vector
pub const IMAGE_NAME_AUDITTAILER: &str = "audittailer";

/// Name of the cloud controller manager image in the image vector
pub const IMAGE_NAME_CLOUD_CONTROLLER_MANAGER: &str = "metal-cloud-controller-manager";

/// Name of the authentication webhook image in the image vector
pub const IMAGE_NAME_AUTHN_WEBHOOK: &str = "authn-webhook";

/// Name of the group rolebinding controller image in the image vector
pub const IMAGE_NAME_GROUP_ROLEBINDING_CONTROLLER: &str = "group-rolebinding-controller";

/// Name of the accounting exporter image in the image vector
pub const IMAGE_NAME_ACCOUNTING_EXPORTER: &str = "accounting-exporter";

/// Name of the duros controller image in the image vector
pub const IMAGE_NAME_DUROS_CONTROLLER: &str = "duros-controller";

/// Images rendered by the seed-side control plane chart
pub const SEED_CHART_IMAGES: [&str; 5] = [
    IMAGE_NAME_CLOUD_CONTROLLER_MANAGER,
    IMAGE_NAME_AUTHN_WEBHOOK,
    IMAGE_NAME_GROUP_ROLEBINDING_CONTROLLER,
    IMAGE_NAME_ACCOUNTING_EXPORTER,
    IMAGE_NAME_DUROS_CONTROLLER,
];

/// Images rendered by the shoot-side control plane chart
pub const SHOOT_CHART_IMAGES: [&str; 2] = [IMAGE_NAME_DROPTAILER, IMAGE_NAME_AUDITTAILER];

/// Name of the firewall deployment created in the shoot's seed namespace
pub const FIREWALL_DEPLOYMENT_NAME: &str = "firewall";

/// Name of the firewall-controller-manager deployment in the seed namespace
pub const FIREWALL_CONTROLLER_MANAGER_DEPLOYMENT: &str = "firewall-controller-manager";

/// Prefix of the service account granting a firewall controller access to the seed
pub const FIREWALL_SEED_ACCESS_PREFIX: &str = "firewall-controller-seed-access-";

/// Namespace in the shoot that holds firewall monitors and droptailer secrets
pub const FIREWALL_NAMESPACE: &str = "firewall";

/// Namespace in the shoot that holds the audittailer secret
pub const AUDIT_NAMESPACE: &str = "audit";

/// Replica count of the firewall deployment
pub const FIREWALL_DEPLOYMENT_REPLICAS: i32 = 1;

/// Number of random characters appended to generated firewall names
pub const FIREWALL_NAME_SUFFIX_LEN: usize = 5;

// ============================================================================
// Timing Constants
// ============================================================================

/// Requeue interval after transient metal-API failures
pub const TRANSIENT_REQUEUE_SECS: u64 = 30;

/// Requeue interval while an external dependency is not ready yet
pub const DEPENDENCY_REQUEUE_SECS: u64 = 10;

/// Requeue interval while a firewall allocation is in progress
pub const FIREWALL_ALLOCATION_REQUEUE_SECS: u64 = 15;

/// Poll interval while waiting for the firewall deployment to disappear
pub const FIREWALL_DELETION_POLL_SECS: u64 = 5;

/// Upper bound for waiting on the firewall deployment deletion
pub const FIREWALL_DELETION_TIMEOUT_SECS: u64 = 120;

/// Maximum attempts of a firewall allocation that returned HTTP 404
pub const FIREWALL_ALLOCATION_ATTEMPTS: u32 = 3;

/// Delay between firewall allocation attempts
pub const FIREWALL_ALLOCATION_RETRY_SECS: u64 = 5;

/// TTL of the process-wide private network cache (15 minutes)
pub const NETWORK_CACHE_TTL_SECS: u64 = 900;

/// Validity of certificates deployed into the shoot (30 days)
pub const SHOOT_CERT_VALIDITY_DAYS: i64 = 30;

/// Requeue interval after a successful reconciliation
pub const RESYNC_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Controller Defaults
// ============================================================================

/// Default number of concurrent reconciles per controller
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 5;

/// Default port of the seed webhook server
pub const DEFAULT_WEBHOOK_SERVER_PORT: u16 = 443;

/// Default port of the metrics endpoint
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Grace period before an expired lease is taken over
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 2;

/// Default leader election lease name
pub const DEFAULT_LEASE_NAME: &str = "provider-metal-leader-election";

// ============================================================================
// Control Plane Constants
// ============================================================================

/// Service name of the authentication webhook in the seed namespace
pub const AUTHN_WEBHOOK_SERVICE_NAME: &str = "kube-jwt-authn-webhook";

/// Chart holding the seed-side control plane workloads
pub const CHART_CONTROL_PLANE: &str = "control-plane";

/// Chart holding the shoot-side control plane workloads
pub const CHART_SHOOT_CONTROL_PLANE: &str = "shoot-control-plane";

/// Chart holding the cloud provider configuration
pub const CHART_CLOUD_PROVIDER_CONFIG: &str = "cloud-provider-config";

/// Name of the shoot's cluster CA secret in the seed namespace
pub const CLUSTER_CA_SECRET_NAME: &str = "ca";

/// Name of the secret holding the shoot kubeconfig in the seed namespace
pub const SHOOT_ACCESS_SECRET_NAME: &str = "gardener";

/// Egress port of the accounting sink
pub const ACCOUNTING_SINK_PORT: i32 = 9000;

/// Name of the network policy permitting egress to the accounting sink
pub const ACCOUNTING_NETWORK_POLICY_NAME: &str = "allow-to-accounting-api";

/// Name of the network policy permitting egress to the storage endpoints
pub const STORAGE_NETWORK_POLICY_NAME: &str = "allow-to-storage";

/// TCP ports opened towards the storage endpoints
pub const STORAGE_PORTS: [i32; 3] = [443, 4420, 8009];

// ============================================================================
// Admission Constants
// ============================================================================

/// Networking type backed by calico
pub const NETWORK_TYPE_CALICO: &str = "calico";

/// Networking type backed by cilium
pub const NETWORK_TYPE_CILIUM: &str = "cilium";

/// Version of the calico networking provider config
pub const CALICO_CONFIG_API_VERSION: &str = "calico.networking.extensions.gardener.cloud/v1alpha1";

/// Version of the cilium networking provider config
pub const CILIUM_CONFIG_API_VERSION: &str = "cilium.networking.extensions.gardener.cloud/v1alpha1";

/// Kind of the networking provider configs
pub const NETWORK_CONFIG_KIND: &str = "NetworkConfig";

/// Path of the validating webhook
pub const WEBHOOK_VALIDATE_PATH: &str = "/webhooks/validate";

/// Path of the mutating webhook
pub const WEBHOOK_DEFAULT_PATH: &str = "/webhooks/default";

/// Default port of the admission server
pub const DEFAULT_ADMISSION_PORT: u16 = 9443;

/// Default name of the webhook configurations
pub const DEFAULT_WEBHOOK_CONFIG_NAME: &str = "provider-metal";

/// Default name of the admission service
pub const DEFAULT_WEBHOOK_SERVICE_NAME: &str = "provider-metal-admission";

/// Kind of the only accepted seed backup credentials
pub const SECRET_KIND: &str = "Secret";
