// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Metal API adapter.
//!
//! Reconcilers reach the metal API through the [`MetalApi`] trait so their
//! logic can be exercised against a `mockall` mock. The production
//! implementation is [`client::MetalClient`], created per reconcile by a
//! [`MetalClientFactory`] from the shoot's credentials secret.

pub mod client;
pub mod credentials;
pub mod queries;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::errors::Result;
pub use credentials::Credentials;
pub use types::{
    FirewallCreateRequest, FirewallFindRequest, Ip, IpFindRequest, IpUpdateRequest, Machine,
    Network, NetworkAllocateRequest, NetworkFindRequest,
};

/// Operations of the metal API used by the reconcilers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetalApi: Send + Sync {
    /// Find networks matching all set criteria
    async fn find_networks(&self, request: &NetworkFindRequest) -> Result<Vec<Network>>;

    /// Get a network by id
    async fn get_network(&self, id: &str) -> Result<Network>;

    /// Allocate a child network of the partition's private super network
    async fn allocate_network(&self, request: &NetworkAllocateRequest) -> Result<Network>;

    /// Release a network
    async fn free_network(&self, id: &str) -> Result<()>;

    /// Find firewalls matching all set criteria
    async fn find_firewalls(&self, request: &FirewallFindRequest) -> Result<Vec<Machine>>;

    /// Allocate a firewall; the allocation completes asynchronously
    async fn allocate_firewall(&self, request: &FirewallCreateRequest) -> Result<Machine>;

    /// Get a firewall by machine id
    async fn get_firewall(&self, id: &str) -> Result<Machine>;

    /// Get a machine by id
    async fn get_machine(&self, id: &str) -> Result<Machine>;

    /// Release a machine (or firewall) back to the pool
    async fn free_machine(&self, id: &str) -> Result<()>;

    /// Find IPs matching all set criteria
    async fn find_ips(&self, request: &IpFindRequest) -> Result<Vec<Ip>>;

    /// Replace the tags, type, name and description of an IP
    async fn update_ip(&self, request: &IpUpdateRequest) -> Result<Ip>;

    /// Release an IP
    async fn free_ip(&self, ip: &str) -> Result<()>;
}

/// Creates [`MetalApi`] clients for an endpoint and credentials
#[cfg_attr(test, automock)]
pub trait MetalClientFactory: Send + Sync {
    /// Build a client talking to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP client
    /// cannot be constructed.
    fn client(&self, endpoint: &str, credentials: &Credentials) -> Result<Arc<dyn MetalApi>>;
}

/// Factory producing [`client::MetalClient`]s
#[derive(Clone, Debug, Default)]
pub struct HttpMetalClientFactory;

impl MetalClientFactory for HttpMetalClientFactory {
    fn client(&self, endpoint: &str, credentials: &Credentials) -> Result<Arc<dyn MetalApi>> {
        Ok(Arc::new(client::MetalClient::new(endpoint, credentials.clone())?))
    }
}
