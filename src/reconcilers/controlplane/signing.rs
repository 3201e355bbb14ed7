// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Signatures of the firewall spec rendered into the shoot.
//!
//! The firewall controller verifies the spec against the cluster CA with
//! RSA PKCS#1 v1.5 over SHA-256.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde_json::Value;
use sha2::Sha256;

use crate::errors::{Error, Result};

/// Parse an RSA private key in PKCS#1 or PKCS#8 PEM form
///
/// # Errors
///
/// Returns [`Error::Internal`] if the key is neither.
pub fn parse_rsa_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| Error::Internal(format!("cluster CA key is not an RSA key: {e}")))
}

/// PKCS#8 PEM of a key
///
/// # Errors
///
/// Returns [`Error::Internal`] if encoding fails.
pub fn to_pkcs8_pem(key: &RsaPrivateKey) -> Result<String> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| Error::Internal(format!("encoding cluster CA key: {e}")))
}

/// Base64 signature of `data`
#[must_use]
pub fn sign(key: &RsaPrivateKey, data: &[u8]) -> String {
    let signing_key = SigningKey::<Sha256>::new(key.clone());
    BASE64.encode(signing_key.sign(data).to_bytes())
}

/// Base64 signature of the JSON encoding of a firewall spec
///
/// # Errors
///
/// Returns [`Error::Json`] if the spec cannot be encoded.
pub fn sign_firewall_spec(key: &RsaPrivateKey, spec: &Value) -> Result<String> {
    let data = serde_json::to_vec(spec)?;
    Ok(sign(key, &data))
}

#[cfg(test)]
#[path = "signing_tests.rs"]
mod signing_tests;
