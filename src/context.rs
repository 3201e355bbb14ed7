// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` that contains:
//! - the seed Kubernetes client
//! - the controller configuration and the image vector
//! - the factory for metal API clients
//! - the process-wide private network cache
//! - the chart applier receiving control plane values

use kube::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::config::ControllerConfig;
use crate::constants::NETWORK_CACHE_TTL_SECS;
use crate::errors::Result;
use crate::imagevector::ImageVector;
use crate::metal::queries::get_private_network_from_node_network;
use crate::metal::{Credentials, MetalApi, MetalClientFactory, Network};
use crate::reconcilers::controlplane::charts::ChartApplier;

/// Private networks keyed by `(projectID, nodeCIDR)`
pub type NetworkCache = TtlCache<(String, String), Network>;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Seed client
    pub client: Client,

    /// Controller configuration file
    pub config: Arc<ControllerConfig>,

    /// Images bundled with this extension
    pub image_vector: Arc<ImageVector>,

    /// Creates metal API clients per reconcile
    pub metal: Arc<dyn MetalClientFactory>,

    /// Private networks of shoots
    pub network_cache: Arc<NetworkCache>,

    /// Receives rendered chart values
    pub charts: Arc<dyn ChartApplier>,
}

impl Context {
    /// Create a context with an empty network cache
    #[must_use]
    pub fn new(
        client: Client,
        config: ControllerConfig,
        image_vector: ImageVector,
        metal: Arc<dyn MetalClientFactory>,
        charts: Arc<dyn ChartApplier>,
    ) -> Self {
        Self {
            client,
            config: Arc::new(config),
            image_vector: Arc::new(image_vector),
            metal,
            network_cache: Arc::new(new_network_cache()),
            charts,
        }
    }

    /// A metal API client for `endpoint`
    ///
    /// # Errors
    ///
    /// See [`MetalClientFactory::client`].
    pub fn metal_client(&self, endpoint: &str, credentials: &Credentials) -> Result<Arc<dyn MetalApi>> {
        self.metal.client(endpoint, credentials)
    }
}

/// A network cache with the default lifetime
#[must_use]
pub fn new_network_cache() -> NetworkCache {
    TtlCache::new(Duration::from_secs(NETWORK_CACHE_TTL_SECS))
}

/// Resolve the private network of a shoot through the cache.
///
/// # Errors
///
/// See [`get_private_network_from_node_network`].
pub async fn cached_private_network(
    cache: &NetworkCache,
    api: &dyn MetalApi,
    project_id: &str,
    node_cidr: &str,
) -> Result<Network> {
    cache
        .get_or_load((project_id.to_string(), node_cidr.to_string()), || {
            get_private_network_from_node_network(api, project_id, node_cidr)
        })
        .await
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
