// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation of the provider configuration.
//!
//! Static checks look at a single value. Contextual checks compare it against
//! the cloud profile or against the previous value on update. All checks
//! collect every problem into a [`FieldErrorList`](crate::errors::FieldErrorList)
//! instead of stopping at the first one.

pub mod cloudprofile;
pub mod controlplane;
pub mod firewall;
pub mod infrastructure;
pub mod worker;

pub use crate::metal::credentials::validate_cloud_provider_secret;
pub use cloudprofile::{validate_cloud_profile_config, validate_immutable_cloud_profile_config};
pub use controlplane::{validate_control_plane_config, validate_control_plane_config_network_access};
pub use firewall::{resolve_firewall_controller_version, FirewallVersionError};
pub use infrastructure::{
    validate_infrastructure_config, validate_infrastructure_config_against_cloud_profile,
    validate_infrastructure_config_update,
};
pub use worker::validate_workers;

/// Detail of errors on fields that must not change
pub(crate) const IMMUTABLE_DETAIL: &str = "field is immutable";

#[cfg(test)]
mod controlplane_tests;
#[cfg(test)]
mod worker_tests;
