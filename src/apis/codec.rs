// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Codec between raw extension payloads and the internal types.
//!
//! Payloads carry `apiVersion`/`kind`. Decoding dispatches on the version,
//! deserializes the matching wire type and converts it to the internal type.
//! Strict decoding (used by admission) additionally rejects unknown fields.

use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{metal, v1alpha1};
use crate::constants::{
    KIND_CLOUD_PROFILE_CONFIG, KIND_CONTROL_PLANE_CONFIG, KIND_INFRASTRUCTURE_CONFIG,
    KIND_INFRASTRUCTURE_STATUS, KIND_WORKER_CONFIG, KIND_WORKER_STATUS, PROVIDER_API_GROUP_VERSION,
};
use crate::errors::{Error, Result};

/// Versions this codec can decode, newest first
pub const KNOWN_VERSIONS: &[&str] = &[PROVIDER_API_GROUP_VERSION];

/// Wire types carrying `apiVersion`/`kind`
pub trait TypeMeta {
    /// Set `apiVersion` and `kind`
    fn set_type_meta(&mut self, api_version: &str, kind: &str);
}

/// An internal type with a `v1alpha1` wire representation.
pub trait ProviderObject: Sized + Clone {
    /// Kind name on the wire
    const KIND: &'static str;

    /// The `v1alpha1` representation
    type V1alpha1: Serialize + DeserializeOwned + TypeMeta + From<Self> + Into<Self>;
}

macro_rules! provider_object {
    ($internal:ty, $wire:ty, $kind:expr) => {
        impl TypeMeta for $wire {
            fn set_type_meta(&mut self, api_version: &str, kind: &str) {
                self.api_version = Some(api_version.to_string());
                self.kind = Some(kind.to_string());
            }
        }

        impl ProviderObject for $internal {
            const KIND: &'static str = $kind;
            type V1alpha1 = $wire;
        }
    };
}

provider_object!(
    metal::CloudProfileConfig,
    v1alpha1::CloudProfileConfig,
    KIND_CLOUD_PROFILE_CONFIG
);
provider_object!(
    metal::InfrastructureConfig,
    v1alpha1::InfrastructureConfig,
    KIND_INFRASTRUCTURE_CONFIG
);
provider_object!(
    metal::InfrastructureStatus,
    v1alpha1::InfrastructureStatus,
    KIND_INFRASTRUCTURE_STATUS
);
provider_object!(
    metal::ControlPlaneConfig,
    v1alpha1::ControlPlaneConfig,
    KIND_CONTROL_PLANE_CONFIG
);
provider_object!(metal::WorkerConfig, v1alpha1::WorkerConfig, KIND_WORKER_CONFIG);
provider_object!(metal::WorkerStatus, v1alpha1::WorkerStatus, KIND_WORKER_STATUS);

/// Decode raw bytes into an internal value.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the bytes are not JSON, the
/// version or kind is unknown, or (with `strict`) unknown fields are present.
pub fn decode<T: ProviderObject>(raw: &[u8], strict: bool) -> Result<T> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| Error::InvalidProviderConfig(format!("could not decode {}: {e}", T::KIND)))?;
    decode_value(&value, strict)
}

/// Decode an already parsed JSON value into an internal value.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_value<T: ProviderObject>(value: &Value, strict: bool) -> Result<T> {
    let Some(object) = value.as_object() else {
        return Err(Error::InvalidProviderConfig(format!(
            "{} must be an object",
            T::KIND
        )));
    };

    let api_version = object
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::InvalidProviderConfig(format!("{}: Object 'apiVersion' is missing", T::KIND))
        })?;

    if let Some(kind) = object.get("kind").and_then(Value::as_str) {
        if kind != T::KIND {
            return Err(Error::InvalidProviderConfig(format!(
                "expected kind {}, got {kind}",
                T::KIND
            )));
        }
    }

    match api_version {
        PROVIDER_API_GROUP_VERSION => {
            let wire: T::V1alpha1 = serde_json::from_value(value.clone()).map_err(|e| {
                Error::InvalidProviderConfig(format!("could not decode {}: {e}", T::KIND))
            })?;
            if strict {
                let retained = serde_json::to_value(&wire)?;
                let mut unknown = Vec::new();
                collect_unknown_fields(value, &retained, "", &mut unknown);
                if !unknown.is_empty() {
                    return Err(Error::InvalidProviderConfig(format!(
                        "{}: unknown fields {}",
                        T::KIND,
                        unknown.join(", ")
                    )));
                }
            }
            Ok(wire.into())
        }
        other => Err(Error::InvalidProviderConfig(format!(
            "no kind {} is registered for version {other:?}, known versions: {}",
            T::KIND,
            KNOWN_VERSIONS.join(", ")
        ))),
    }
}

/// Decode a raw extension; `None` if the extension is absent.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_raw<T: ProviderObject>(raw: Option<&RawExtension>, strict: bool) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(RawExtension(Value::Null)) => Ok(None),
        Some(RawExtension(value)) => decode_value(value, strict).map(Some),
    }
}

/// Encode an internal value as the current wire version.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode<T: ProviderObject>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&encode_value(value)?)?)
}

/// Encode an internal value as a JSON value of the current wire version.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_value<T: ProviderObject>(value: &T) -> Result<Value> {
    let mut wire: T::V1alpha1 = value.clone().into();
    wire.set_type_meta(PROVIDER_API_GROUP_VERSION, T::KIND);
    Ok(serde_json::to_value(&wire)?)
}

/// Encode an internal value as a raw extension.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode_raw<T: ProviderObject>(value: &T) -> Result<RawExtension> {
    Ok(RawExtension(encode_value(value)?))
}

/// A value that carries no information and may be dropped on re-serialization.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

/// Collect paths present in `original` that the typed decode did not retain.
fn collect_unknown_fields(original: &Value, retained: &Value, path: &str, out: &mut Vec<String>) {
    match (original, retained) {
        (Value::Object(orig), Value::Object(kept)) => {
            for (key, value) in orig {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match kept.get(key) {
                    Some(kept_value) => collect_unknown_fields(value, kept_value, &child, out),
                    None if is_empty_value(value) => {}
                    None => out.push(format!("\"{child}\"")),
                }
            }
        }
        (Value::Object(orig), _) => {
            for (key, value) in orig {
                if !is_empty_value(value) {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    out.push(format!("\"{child}\""));
                }
            }
        }
        (Value::Array(orig), Value::Array(kept)) => {
            for (i, (o, k)) in orig.iter().zip(kept.iter()).enumerate() {
                collect_unknown_fields(o, k, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod codec_tests;
