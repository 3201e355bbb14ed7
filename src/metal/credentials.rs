// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Metal API credentials stored in the shoot's cloud provider secret.

use k8s_openapi::api::core::v1::Secret;
use std::fmt;

use crate::errors::{Error, FieldError, FieldErrorList, FieldPath, Result};

/// Secret data key holding the metal API key
pub const SECRET_KEY_API_KEY: &str = "metalAPIKey";

/// Secret data key holding the metal API HMAC
pub const SECRET_KEY_HMAC: &str = "metalAPIHMac";

/// Secret data key holding the metal API endpoint (machine-class secrets only)
pub const SECRET_KEY_API_URL: &str = "metalAPIURL";

/// How a client authenticates against the metal API. Exactly one of API key
/// and HMAC is ever set.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Bearer token
    ApiKey(String),
    /// Shared secret for request signing
    Hmac(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("Credentials::ApiKey(***)"),
            Self::Hmac(_) => f.write_str("Credentials::Hmac(***)"),
        }
    }
}

impl Credentials {
    /// Build credentials from an optional key and HMAC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] unless exactly one of both is non-empty.
    pub fn from_parts(api_key: Option<&str>, hmac: Option<&str>) -> Result<Self> {
        let api_key = api_key.filter(|s| !s.is_empty());
        let hmac = hmac.filter(|s| !s.is_empty());
        match (api_key, hmac) {
            (Some(key), None) => Ok(Self::ApiKey(key.to_string())),
            (None, Some(hmac)) => Ok(Self::Hmac(hmac.to_string())),
            (None, None) => Err(Error::Unauthorized(format!(
                "either {SECRET_KEY_API_KEY} or {SECRET_KEY_HMAC} must be set"
            ))),
            (Some(_), Some(_)) => Err(Error::Unauthorized(format!(
                "only one of {SECRET_KEY_API_KEY} and {SECRET_KEY_HMAC} may be set"
            ))),
        }
    }

    /// Read credentials from a cloud provider secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the secret holds neither or both keys.
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let api_key = secret_value(secret, SECRET_KEY_API_KEY);
        let hmac = secret_value(secret, SECRET_KEY_HMAC);
        Self::from_parts(api_key.as_deref(), hmac.as_deref())
    }

    /// The API key, if this is key-based auth
    #[must_use]
    pub fn api_key(&self) -> &str {
        match self {
            Self::ApiKey(key) => key,
            Self::Hmac(_) => "",
        }
    }

    /// The HMAC secret, if this is HMAC auth
    #[must_use]
    pub fn hmac(&self) -> &str {
        match self {
            Self::ApiKey(_) => "",
            Self::Hmac(hmac) => hmac,
        }
    }
}

/// Validate a cloud provider secret without building a client.
#[must_use]
pub fn validate_cloud_provider_secret(secret: &Secret) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let api_key = secret_value(secret, SECRET_KEY_API_KEY).filter(|s| !s.is_empty());
    let hmac = secret_value(secret, SECRET_KEY_HMAC).filter(|s| !s.is_empty());
    let data = FieldPath::new("data");
    match (api_key, hmac) {
        (None, None) => errors.push(FieldError::required(
            &data,
            format!("either {SECRET_KEY_API_KEY} or {SECRET_KEY_HMAC} must be set"),
        )),
        (Some(_), Some(_)) => errors.push(FieldError::forbidden(
            &data.key(SECRET_KEY_HMAC),
            format!("must not be set together with {SECRET_KEY_API_KEY}"),
        )),
        _ => {}
    }
    errors
}

/// UTF-8 value of a secret key, trimmed of surrounding whitespace.
fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(value.0.clone())
            .ok()
            .map(|s| s.trim().to_string());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
