// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of the firewall-controller version of a shoot.

use thiserror::Error as ThisError;

use crate::apis::helper::parse_lenient_semver;
use crate::apis::metal::FirewallControllerVersion;
use crate::constants::FIREWALL_CONTROLLER_VERSION_AUTO;
use crate::errors::Error;

/// Why a firewall-controller version could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FirewallVersionError {
    /// No version was requested; the firewall keeps whatever it runs
    #[error("firewall controller version is not defined")]
    SpecVersionUndefined,

    /// A version is not a semantic version
    #[error("firewall controller version {0:?} is not a semantic version")]
    NoSemver(String),

    /// The requested major version differs from the bundled controller's
    #[error("firewall controller version {requested} does not match the major version of the bundled controller {bundled}")]
    ControllerTooOld { requested: String, bundled: String },

    /// The version is not offered by the cloud profile
    #[error("firewall controller version {0} is not offered by the cloud profile")]
    NotFound(String),
}

impl From<FirewallVersionError> for Error {
    fn from(err: FirewallVersionError) -> Self {
        Error::InvalidProviderConfig(err.to_string())
    }
}

/// Resolve `spec_version` against the versions offered by the cloud profile.
///
/// `auto` selects the tag of the bundled controller from the image vector.
/// The result always has the bundled controller's major version.
///
/// # Errors
///
/// See [`FirewallVersionError`].
pub fn resolve_firewall_controller_version(
    offered: &[FirewallControllerVersion],
    spec_version: &str,
    bundled_tag: &str,
) -> Result<FirewallControllerVersion, FirewallVersionError> {
    if spec_version.is_empty() {
        return Err(FirewallVersionError::SpecVersionUndefined);
    }

    let requested = if spec_version == FIREWALL_CONTROLLER_VERSION_AUTO {
        bundled_tag
    } else {
        spec_version
    };

    let requested_semver = parse_lenient_semver(requested)
        .ok_or_else(|| FirewallVersionError::NoSemver(requested.to_string()))?;
    let bundled_semver = parse_lenient_semver(bundled_tag)
        .ok_or_else(|| FirewallVersionError::NoSemver(bundled_tag.to_string()))?;

    if requested_semver.major != bundled_semver.major {
        return Err(FirewallVersionError::ControllerTooOld {
            requested: requested.to_string(),
            bundled: bundled_tag.to_string(),
        });
    }

    offered
        .iter()
        .find(|candidate| {
            candidate.version == requested
                || parse_lenient_semver(&candidate.version).as_ref() == Some(&requested_semver)
        })
        .cloned()
        .ok_or_else(|| FirewallVersionError::NotFound(requested.to_string()))
}
