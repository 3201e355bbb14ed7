// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the metal API `v1` REST surface.
//!
//! Requests are authenticated either with a bearer API key or by signing the
//! `X-Date` header and the request body with HMAC-SHA256. Non-success status
//! codes are mapped onto the crate's error kinds; retries are left to the
//! reconcilers' requeue policy.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use super::credentials::Credentials;
use super::types::{
    FirewallCreateRequest, FirewallFindRequest, Ip, IpFindRequest, IpUpdateRequest, Machine,
    Network, NetworkAllocateRequest, NetworkFindRequest,
};
use super::MetalApi;
use crate::errors::{Error, Result};
use crate::metrics::record_metal_request;

/// Timeout of a single metal API request
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the signing timestamp of HMAC-authenticated requests
pub const HEADER_DATE: &str = "X-Date";

/// Authorization scheme of HMAC-authenticated requests
pub const HMAC_AUTH_TYPE: &str = "Metal-Admin";

/// Compute the hex-encoded HMAC-SHA256 signature over `date` followed by `body`.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] if `secret` cannot key the MAC.
pub fn hmac_signature(secret: &str, date: &str, body: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Unauthorized(format!("invalid HMAC key: {e}")))?;
    mac.update(date.as_bytes());
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Client of one metal API endpoint
#[derive(Clone, Debug)]
pub struct MetalClient {
    http: HttpClient,
    endpoint: String,
    credentials: Credentials,
}

impl MetalClient {
    /// Build a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProviderConfig`] if the endpoint is not an
    /// absolute `http(s)` URL, or [`Error::Internal`] if the HTTP client
    /// cannot be built.
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            Error::InvalidProviderConfig(format!("invalid metal API endpoint {endpoint:?}: {e}"))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::InvalidProviderConfig(format!(
                "metal API endpoint {endpoint:?} must use http or https"
            )));
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("building metal API client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Send a request and decode the JSON response.
    async fn call<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let bytes = self.send(operation, method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Internal(format!("{operation}: decoding metal API response: {e}"))
        })
    }

    /// Send a request and return the raw response body on success.
    async fn send<B>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        let payload = match body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        debug!(operation, method = %method, url = %url, "metal API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if body.is_some() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone());
        }
        request = match &self.credentials {
            Credentials::ApiKey(key) => request.bearer_auth(key),
            Credentials::Hmac(secret) => {
                let date = chrono::Utc::now().to_rfc3339();
                let signature = hmac_signature(secret, &date, &payload)?;
                request
                    .header(HEADER_DATE, date)
                    .header(
                        reqwest::header::AUTHORIZATION,
                        format!("{HMAC_AUTH_TYPE} {signature}"),
                    )
            }
        };

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = Error::transient(operation, format!("sending request to {url}: {e}"));
                record_metal_request(operation, err.code(), start.elapsed());
                return Err(err);
            }
        };

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transient(operation, format!("reading response body: {e}")))?;

        if status.is_success() {
            record_metal_request(operation, "success", start.elapsed());
            return Ok(bytes.to_vec());
        }

        let message = String::from_utf8_lossy(&bytes).trim().to_string();
        let err = map_status(operation, path, status, &message);
        warn!(
            operation,
            method = %method,
            url = %url,
            status = %status,
            error = %message,
            "metal API request failed"
        );
        record_metal_request(operation, err.code(), start.elapsed());
        Err(err)
    }
}

/// Map a non-success HTTP status onto an error kind.
pub(crate) fn map_status(operation: &str, path: &str, status: StatusCode, message: &str) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::not_found("metal API object", path),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Unauthorized(format!("{operation}: HTTP {status}: {message}"))
        }
        StatusCode::CONFLICT => Error::Conflict(format!("{operation}: {message}")),
        s if s.is_server_error() => Error::transient(operation, format!("HTTP {status}: {message}")),
        _ => Error::Internal(format!("{operation}: HTTP {status}: {message}")),
    }
}

#[async_trait]
impl MetalApi for MetalClient {
    async fn find_networks(&self, request: &NetworkFindRequest) -> Result<Vec<Network>> {
        self.call("find_networks", Method::POST, "v1/network/find", Some(request))
            .await
    }

    async fn get_network(&self, id: &str) -> Result<Network> {
        self.call::<(), _>("get_network", Method::GET, &format!("v1/network/{id}"), None)
            .await
    }

    async fn allocate_network(&self, request: &NetworkAllocateRequest) -> Result<Network> {
        self.call("allocate_network", Method::POST, "v1/network/allocate", Some(request))
            .await
    }

    async fn free_network(&self, id: &str) -> Result<()> {
        self.send::<()>("free_network", Method::DELETE, &format!("v1/network/free/{id}"), None)
            .await
            .map(|_| ())
    }

    async fn find_firewalls(&self, request: &FirewallFindRequest) -> Result<Vec<Machine>> {
        self.call("find_firewalls", Method::POST, "v1/firewall/find", Some(request))
            .await
    }

    async fn allocate_firewall(&self, request: &FirewallCreateRequest) -> Result<Machine> {
        self.call("allocate_firewall", Method::POST, "v1/firewall/allocate", Some(request))
            .await
    }

    async fn get_firewall(&self, id: &str) -> Result<Machine> {
        self.call::<(), _>("get_firewall", Method::GET, &format!("v1/firewall/{id}"), None)
            .await
    }

    async fn get_machine(&self, id: &str) -> Result<Machine> {
        self.call::<(), _>("get_machine", Method::GET, &format!("v1/machine/{id}"), None)
            .await
    }

    async fn free_machine(&self, id: &str) -> Result<()> {
        self.send::<()>("free_machine", Method::DELETE, &format!("v1/machine/{id}/free"), None)
            .await
            .map(|_| ())
    }

    async fn find_ips(&self, request: &IpFindRequest) -> Result<Vec<Ip>> {
        self.call("find_ips", Method::POST, "v1/ip/find", Some(request))
            .await
    }

    async fn update_ip(&self, request: &IpUpdateRequest) -> Result<Ip> {
        self.call("update_ip", Method::POST, "v1/ip", Some(request))
            .await
    }

    async fn free_ip(&self, ip: &str) -> Result<()> {
        self.send::<()>("free_ip", Method::DELETE, &format!("v1/ip/free/{ip}"), None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
