// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # provider-metal - Gardener extension for bare-metal clouds
//!
//! provider-metal lets Gardener run shoot clusters on a metal-stack
//! installation. It runs in two processes:
//!
//! - the **controller manager** in the seed reconciles the `Infrastructure`,
//!   `Worker` and `ControlPlane` extension resources of each shoot
//! - the **admission server** in the garden defaults and validates shoots,
//!   cloud profiles, seeds and cloud provider secrets
//!
//! ## Modules
//!
//! - [`apis`] - Provider config types, their wire format and codec
//! - [`validation`] - Field validation of provider configs
//! - [`metal`] - Adapter for the metal API
//! - [`reconcilers`] - The three extension controllers
//! - [`admission`] - Defaulting and validating webhooks
//! - [`gardener`] - Gardener resources consumed by the extension
//! - [`fcm`] / [`mcm`] - Firewall and machine controller manager resources
//!
//! ## Example
//!
//! ```rust,no_run
//! use provider_metal::apis::codec::decode;
//! use provider_metal::apis::metal::InfrastructureConfig;
//!
//! let raw = br#"{
//!   "apiVersion": "metal.provider.extensions.gardener.cloud/v1alpha1",
//!   "kind": "InfrastructureConfig",
//!   "partitionID": "muc",
//!   "projectID": "project-1",
//!   "firewall": {"size": "n1-medium-x86", "image": "firewall-ubuntu-3.0", "networks": ["internet"]}
//! }"#;
//! let config: InfrastructureConfig = decode(raw, true).unwrap();
//! assert_eq!(config.partition_id, "muc");
//! ```

pub mod admission;
pub mod apis;
pub mod cache;
pub mod clients;
pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod fcm;
pub mod gardener;
pub mod imagevector;
pub mod labels;
pub mod mcm;
pub mod metal;
pub mod metrics;
pub mod reconcilers;
pub mod validation;
