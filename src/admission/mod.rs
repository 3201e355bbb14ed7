// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission webhooks for the garden cluster.
//!
//! The server exposes two endpoints over TLS:
//! - `POST /webhooks/validate` validates shoots, cloud profiles, seeds and
//!   cloud provider secrets
//! - `POST /webhooks/default` returns a JSON patch with the shoot defaults

pub mod defaulter;
pub mod registration;
pub mod validator;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Api, DynamicObject},
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::apis::codec::decode_raw;
use crate::apis::metal::CloudProfileConfig;
use crate::config::DefaulterConfig;
use crate::constants::{PROVIDER_TYPE, WEBHOOK_DEFAULT_PATH, WEBHOOK_VALIDATE_PATH};
use crate::errors::{Error, FieldErrorList, Result};
use crate::gardener::garden::{CloudProfile, Seed, Shoot};
use crate::metrics::record_admission_review;
use crate::validation::validate_cloud_provider_secret;

/// Shared state of the webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Garden cluster client, used to look up cloud profiles
    pub client: Client,
    pub defaulter: DefaulterConfig,
}

impl WebhookState {
    #[must_use]
    pub fn new(client: Client, defaulter: DefaulterConfig) -> Self {
        Self { client, defaulter }
    }
}

/// Router with both webhooks and a health endpoint
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(WEBHOOK_VALIDATE_PATH, post(validate_handler))
        .route(WEBHOOK_DEFAULT_PATH, post(default_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the webhooks with `tls.crt` and `tls.key` from `cert_dir`.
///
/// # Errors
///
/// Returns an error if the certificates cannot be loaded or the server fails.
pub async fn serve(addr: SocketAddr, cert_dir: &Path, state: Arc<WebhookState>) -> Result<()> {
    let tls_config = RustlsConfig::from_pem_file(cert_dir.join("tls.crt"), cert_dir.join("tls.key"))
        .await
        .map_err(|e| Error::Internal(format!("TLS config error: {e}")))?;

    info!(addr = %addr, "Starting admission server");
    axum_server::bind_rustls(addr, tls_config)
        .serve(router(state).into_make_service())
        .await
        .map_err(|e| Error::Internal(format!("admission server error: {e}")))
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
        Operation::Connect => "connect",
    }
}

/// Re-type a dynamic object
fn typed<K: DeserializeOwned>(object: &DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn is_metal_shoot(shoot: &Value) -> bool {
    shoot
        .pointer("/spec/provider/type")
        .and_then(Value::as_str)
        .is_some_and(|t| t == PROVIDER_TYPE)
}

/// Response for the outcome of a validation
fn validation_response(request: &AdmissionRequest<DynamicObject>, outcome: Result<FieldErrorList>) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);
    match outcome {
        Ok(errors) if errors.is_empty() => response,
        Ok(errors) => response.deny(errors.to_string()),
        Err(e) => response.deny(e.to_string()),
    }
}

async fn cloud_profile(client: &Client, shoot: &Shoot) -> Result<CloudProfile> {
    let name = shoot
        .spec
        .cloud_profile_name
        .as_deref()
        .ok_or_else(|| Error::InvalidProviderConfig("shoot has no cloud profile".to_string()))?;
    let profiles: Api<CloudProfile> = Api::all(client.clone());
    Ok(profiles.get(name).await?)
}

async fn validate(state: &WebhookState, request: &AdmissionRequest<DynamicObject>) -> Result<FieldErrorList> {
    let Some(object) = request.object.as_ref() else {
        return Ok(FieldErrorList::new());
    };
    let old = request.old_object.as_ref();

    match request.kind.kind.as_str() {
        "Shoot" => {
            let shoot: Shoot = typed(object)?;
            if shoot.spec.provider.provider_type != PROVIDER_TYPE {
                return Ok(FieldErrorList::new());
            }
            let old = old.map(typed::<Shoot>).transpose()?;
            let profile = cloud_profile(&state.client, &shoot).await?;
            validator::validate_shoot(&shoot, old.as_ref(), &profile)
        }
        "CloudProfile" => {
            let profile: CloudProfile = typed(object)?;
            let old = old.map(typed::<CloudProfile>).transpose()?;
            validator::validate_cloud_profile(&profile, old.as_ref())
        }
        "Seed" => Ok(validator::validate_seed(&typed::<Seed>(object)?)),
        "Secret" => Ok(validate_cloud_provider_secret(&typed::<Secret>(object)?)),
        other => {
            debug!(kind = %other, "no validation for kind");
            Ok(FieldErrorList::new())
        }
    }
}

async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let outcome = validate(&state, &request).await;
    let response = validation_response(&request, outcome);
    let result = if response.allowed { "allowed" } else { "denied" };
    if !response.allowed {
        info!(
            uid = %request.uid,
            kind = %request.kind.kind,
            name = %request.name,
            reason = %response.result.message,
            "Denied admission request"
        );
    }
    record_admission_review("validate", operation_label(&request.operation), result);
    Json(response.into_review())
}

/// Provider config of the shoot's cloud profile, if it can be found.
/// Defaulting continues without firewall defaults otherwise.
async fn profile_config(client: &Client, shoot: &Value) -> Option<CloudProfileConfig> {
    let name = shoot.pointer("/spec/cloudProfileName").and_then(Value::as_str)?;
    let profiles: Api<CloudProfile> = Api::all(client.clone());
    let profile = match profiles.get_opt(name).await {
        Ok(profile) => profile?,
        Err(e) => {
            warn!(cloud_profile = %name, error = %e, "Failed to look up cloud profile");
            return None;
        }
    };
    match decode_raw::<CloudProfileConfig>(profile.spec.provider_config.as_ref(), false) {
        Ok(config) => config,
        Err(e) => {
            warn!(cloud_profile = %name, error = %e, "Cloud profile has an undecodable provider config");
            None
        }
    }
}

/// Response carrying the default patch for a shoot
fn default_response(
    request: &AdmissionRequest<DynamicObject>,
    shoot: &Value,
    profile: Option<&CloudProfileConfig>,
    config: &DefaulterConfig,
) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);
    let patch = match defaulter::default_patch(shoot, profile, config) {
        Ok(patch) => patch,
        Err(e) => return response.deny(e.to_string()),
    };
    if patch.0.is_empty() {
        return response;
    }
    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %request.uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

async fn default_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let shoot = match request.object.as_ref().map(serde_json::to_value).transpose() {
        Ok(Some(shoot)) if is_metal_shoot(&shoot) => shoot,
        Ok(_) => return Json(AdmissionResponse::from(&request).into_review()),
        Err(e) => return Json(AdmissionResponse::from(&request).deny(e.to_string()).into_review()),
    };

    let profile = profile_config(&state.client, &shoot).await;
    let response = default_response(&request, &shoot, profile.as_ref(), &state.defaulter);
    let result = if response.allowed { "patched" } else { "denied" };
    record_admission_review("default", operation_label(&request.operation), result);
    Json(response.into_review())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
