// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the metal provider extension.
//!
//! This module provides:
//! - [`Error`] - the error kinds surfaced by reconcilers, admission and the metal adapter
//! - [`FieldError`] / [`FieldErrorList`] - aggregated field validation errors rendered
//!   the way the Kubernetes API server renders them
//! - [`FieldPath`] - a builder for field paths such as `spec.firewall.networks[0]`
//!
//! Errors decide their own requeue policy through [`Error::requeue_after`], so
//! controller error policies never have to parse messages.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{DEPENDENCY_REQUEUE_SECS, TRANSIENT_REQUEUE_SECS};

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the provider.
#[derive(Error, Debug)]
pub enum Error {
    /// A provider payload could not be decoded, encoded or validated structurally.
    ///
    /// These never self-heal and are not requeued.
    #[error("invalid provider config: {0}")]
    InvalidProviderConfig(String),

    /// An update touched a field that must not change
    #[error("field {field} is immutable: {message}")]
    Immutable {
        /// Path of the immutable field
        field: String,
        /// Explanation of the rejected change
        message: String,
    },

    /// The metal API (or the cluster) does not know the requested object
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of the missing object (e.g. `network`, `firewall`)
        kind: String,
        /// Name or id of the missing object
        name: String,
    },

    /// A failure that is expected to resolve on its own (metal 5xx, API timeouts)
    #[error("transient failure during {operation}: {message}")]
    Transient {
        /// Operation that failed
        operation: String,
        /// Underlying failure
        message: String,
    },

    /// More objects exist than the cluster state allows
    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborator (webhook, firewall-controller-manager, ...) is not ready yet
    #[error("external dependency not ready: {0}")]
    ExternalDependencyUnready(String),

    /// Credentials are malformed or were refused
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An invariant was violated
    #[error("internal error: {0}")]
    Internal(String),

    /// Aggregated field validation errors
    #[error(transparent)]
    Validation(#[from] FieldErrorList),

    /// Kubernetes API error
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error annotated with the object and operation it occurred in
    #[error("{operation} {kind} {name}: {source}")]
    Context {
        /// Kind of the object being processed
        kind: String,
        /// `namespace/name` of the object being processed
        name: String,
        /// Operation (reconcile, delete, migrate, restore, ...)
        operation: String,
        /// The wrapped error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for [`Error::Transient`]
    pub fn transient(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for [`Error::NotFound`]
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Wrap the error with the object and operation it occurred in.
    #[must_use]
    pub fn context(self, kind: &str, name: &str, operation: &str) -> Self {
        Self::Context {
            kind: kind.to_string(),
            name: name.to_string(),
            operation: operation.to_string(),
            source: Box::new(self),
        }
    }

    /// Strip any [`Error::Context`] wrappers.
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// `true` if the error is expected to resolve without user action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self.root() {
            Self::Transient { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 429 || resp.code >= 500,
            Self::Kube(kube::Error::Service(_)) => true,
            _ => false,
        }
    }

    /// `true` if the error reports a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// How long the controller should wait before retrying.
    ///
    /// `None` means the error will not self-heal and the controller waits for
    /// the next change of the resource.
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self.root() {
            Self::InvalidProviderConfig(_) | Self::Validation(_) | Self::Immutable { .. } => None,
            Self::ExternalDependencyUnready(_) => Some(Duration::from_secs(DEPENDENCY_REQUEUE_SECS)),
            _ => Some(Duration::from_secs(TRANSIENT_REQUEUE_SECS)),
        }
    }

    /// Short machine-readable code for status reporting and metrics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.root() {
            Self::InvalidProviderConfig(_) | Self::Validation(_) | Self::Json(_) | Self::Yaml(_) => {
                "ERR_CONFIGURATION_PROBLEM"
            }
            Self::Immutable { .. } => "ERR_IMMUTABLE",
            Self::NotFound { .. } => "ERR_NOT_FOUND",
            Self::Transient { .. } => "ERR_INFRA_UNAVAILABLE",
            Self::Conflict(_) => "ERR_CONFLICT",
            Self::ExternalDependencyUnready(_) => "ERR_DEPENDENCY_UNREADY",
            Self::Unauthorized(_) => "ERR_INFRA_UNAUTHORIZED",
            Self::Kube(_) | Self::Internal(_) | Self::Context { .. } => "ERR_INTERNAL",
        }
    }
}

// ============================================================================
// Field validation errors
// ============================================================================

/// Kind of a field validation error, mirroring the Kubernetes field error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorType {
    /// A required value is missing
    Required,
    /// The value is malformed or not allowed
    Invalid,
    /// The value is not allowed in this context
    Forbidden,
    /// The value appears more than once
    Duplicate,
    /// The value is not one of the supported values
    NotSupported,
    /// The list holds too many entries
    TooMany,
}

impl fmt::Display for FieldErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Required => "Required value",
            Self::Invalid => "Invalid value",
            Self::Forbidden => "Forbidden",
            Self::Duplicate => "Duplicate value",
            Self::NotSupported => "Unsupported value",
            Self::TooMany => "Too many",
        };
        f.write_str(text)
    }
}

/// A path to a field, e.g. `metalControlPlanes[prod].partitions[muc].networkIsolation`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    /// The empty root path
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A path starting with the given field name
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Descend into a named child field
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    /// Descend into a list element
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    /// Descend into a map entry
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{key}]", self.0))
    }

    /// The rendered path
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Error kind
    pub error_type: FieldErrorType,
    /// Path of the offending field
    pub field: String,
    /// Offending value, if any
    pub bad_value: Option<String>,
    /// Human readable detail
    pub detail: String,
}

impl FieldError {
    /// A required value is missing
    pub fn required(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self::build(FieldErrorType::Required, path, None, detail)
    }

    /// The value is malformed or not allowed
    pub fn invalid(path: &FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self::build(FieldErrorType::Invalid, path, Some(value.to_string()), detail)
    }

    /// The value is not allowed in this context
    pub fn forbidden(path: &FieldPath, detail: impl Into<String>) -> Self {
        Self::build(FieldErrorType::Forbidden, path, None, detail)
    }

    /// The value appears more than once
    pub fn duplicate(path: &FieldPath, value: impl fmt::Display) -> Self {
        Self::build(FieldErrorType::Duplicate, path, Some(value.to_string()), "")
    }

    /// The value is not one of `supported`
    pub fn not_supported(path: &FieldPath, value: impl fmt::Display, supported: &[&str]) -> Self {
        let detail = format!(
            "supported values: {}",
            supported
                .iter()
                .map(|s| format!("\"{s}\""))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::build(FieldErrorType::NotSupported, path, Some(value.to_string()), detail)
    }

    /// The list holds `actual` entries but at most `max` are allowed
    pub fn too_many(path: &FieldPath, actual: usize, max: usize) -> Self {
        Self::build(
            FieldErrorType::TooMany,
            path,
            Some(actual.to_string()),
            format!("must have at most {max} items"),
        )
    }

    fn build(
        error_type: FieldErrorType,
        path: &FieldPath,
        bad_value: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type,
            field: path.as_str().to_string(),
            bad_value,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.error_type)?;
        if let Some(value) = &self.bad_value {
            write!(f, ": \"{value}\"")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// An ordered list of field errors, surfaced as a single composite error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrorList(pub Vec<FieldError>);

impl FieldErrorList {
    /// An empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one error
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Append all errors of another list
    pub fn extend(&mut self, other: FieldErrorList) {
        self.0.extend(other.0);
    }

    /// `true` if no errors were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the recorded errors
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Convert into a `Result`, failing if any error was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] holding this list if it is non-empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("no validation errors"),
            [single] => write!(f, "{single}"),
            many => {
                f.write_str("[")?;
                for (i, err) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{err}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl std::error::Error for FieldErrorList {}

impl IntoIterator for FieldErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<FieldError> for FieldErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
