// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registration of the admission webhooks with the API server.
//!
//! The server registers itself on startup: one validating and one mutating
//! webhook configuration, both named after `--webhook-config-name`. In
//! `service` mode the API server reaches the webhooks through a Service that
//! is ensured alongside; in `url` mode through the configured URL.

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    ValidatingWebhook, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::Client;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::constants::{FIELD_MANAGER, WEBHOOK_DEFAULT_PATH, WEBHOOK_VALIDATE_PATH};
use crate::errors::{Error, Result};
use crate::labels::{LABEL_MANAGED_BY, LABEL_PROVIDER_SECRET, MANAGED_BY_VALUE};
use crate::reconcilers::resources::{apply_cluster_scoped, create_or_apply};

/// Port the webhook service listens on
pub const SERVICE_PORT: i32 = 443;

const GARDEN_GROUP: &str = "core.gardener.cloud";
const GARDEN_VERSION: &str = "v1beta1";

/// How the API server reaches the webhooks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigMode {
    /// Through a Service in the webhook namespace
    #[default]
    Service,
    /// Through a fixed URL
    Url,
}

/// Settings of the webhook registration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub name: String,
    pub mode: ConfigMode,
    /// Base URL in `url` mode
    pub url: Option<String>,
    /// Namespace of the webhook service
    pub namespace: String,
    pub service_name: String,
    /// Pod selector of the webhook service
    pub service_selectors: BTreeMap<String, String>,
    /// Port the admission server listens on
    pub server_port: u16,
    /// PEM bundle the API server verifies the webhook with
    pub ca_bundle: Option<Vec<u8>>,
}

/// Parse the `--webhook-config-service-selectors` JSON object.
///
/// # Errors
///
/// Returns [`Error::InvalidProviderConfig`] if the value is not a JSON object of strings.
pub fn parse_service_selectors(raw: &str) -> Result<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| Error::InvalidProviderConfig(format!("invalid service selectors {raw:?}: {e}")))
}

/// Read `<cert_dir>/ca.crt`, if present.
pub fn read_ca_bundle(cert_dir: &Path) -> Option<Vec<u8>> {
    let path = cert_dir.join("ca.crt");
    match std::fs::read(&path) {
        Ok(bundle) => Some(bundle),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no CA bundle for the webhook configurations");
            None
        }
    }
}

impl RegistrationConfig {
    /// Client config of the webhook served at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProviderConfig`] in `url` mode without a URL.
    pub fn client_config(&self, path: &str) -> Result<WebhookClientConfig> {
        let ca_bundle = self.ca_bundle.clone().map(ByteString);
        match self.mode {
            ConfigMode::Service => Ok(WebhookClientConfig {
                service: Some(ServiceReference {
                    name: self.service_name.clone(),
                    namespace: self.namespace.clone(),
                    path: Some(path.to_string()),
                    port: Some(SERVICE_PORT),
                }),
                ca_bundle,
                url: None,
            }),
            ConfigMode::Url => {
                let base = self.url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
                    Error::InvalidProviderConfig("url mode needs --webhook-config-url".to_string())
                })?;
                Ok(WebhookClientConfig {
                    url: Some(format!("{}{path}", base.trim_end_matches('/'))),
                    ca_bundle,
                    service: None,
                })
            }
        }
    }

    fn metadata(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            labels: Some(BTreeMap::from([(
                LABEL_MANAGED_BY.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        }
    }
}

fn rule(group: &str, version: &str, resource: &str) -> RuleWithOperations {
    RuleWithOperations {
        api_groups: Some(vec![group.to_string()]),
        api_versions: Some(vec![version.to_string()]),
        operations: Some(vec!["CREATE".to_string(), "UPDATE".to_string()]),
        resources: Some(vec![resource.to_string()]),
        scope: None,
    }
}

fn webhook_name(prefix: &str) -> String {
    format!("{prefix}.metal.provider.extensions.gardener.cloud")
}

/// The validating webhook configuration
///
/// # Errors
///
/// See [`RegistrationConfig::client_config`].
pub fn validating_configuration(config: &RegistrationConfig) -> Result<ValidatingWebhookConfiguration> {
    let client_config = config.client_config(WEBHOOK_VALIDATE_PATH)?;
    let webhook = |name: &str, rules: Vec<RuleWithOperations>, object_selector: Option<LabelSelector>| {
        ValidatingWebhook {
            name: webhook_name(name),
            client_config: client_config.clone(),
            rules: Some(rules),
            object_selector,
            admission_review_versions: vec!["v1".to_string()],
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            ..Default::default()
        }
    };

    Ok(ValidatingWebhookConfiguration {
        metadata: config.metadata(),
        webhooks: Some(vec![
            webhook(
                "validation",
                vec![
                    rule(GARDEN_GROUP, GARDEN_VERSION, "shoots"),
                    rule(GARDEN_GROUP, GARDEN_VERSION, "cloudprofiles"),
                    rule(GARDEN_GROUP, GARDEN_VERSION, "seeds"),
                ],
                None,
            ),
            webhook(
                "secrets.validation",
                vec![rule("", "v1", "secrets")],
                Some(LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        LABEL_PROVIDER_SECRET.to_string(),
                        "true".to_string(),
                    )])),
                    ..Default::default()
                }),
            ),
        ]),
    })
}

/// The mutating webhook configuration
///
/// # Errors
///
/// See [`RegistrationConfig::client_config`].
pub fn mutating_configuration(config: &RegistrationConfig) -> Result<MutatingWebhookConfiguration> {
    Ok(MutatingWebhookConfiguration {
        metadata: config.metadata(),
        webhooks: Some(vec![MutatingWebhook {
            name: webhook_name("defaulter"),
            client_config: config.client_config(WEBHOOK_DEFAULT_PATH)?,
            rules: Some(vec![rule(GARDEN_GROUP, GARDEN_VERSION, "shoots")]),
            admission_review_versions: vec!["v1".to_string()],
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            reinvocation_policy: Some("IfNeeded".to_string()),
            ..Default::default()
        }]),
    })
}

/// The Service routing to the admission server
#[must_use]
pub fn webhook_service(config: &RegistrationConfig) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(config.service_name.clone()),
            namespace: Some(config.namespace.clone()),
            labels: Some(BTreeMap::from([(
                LABEL_MANAGED_BY.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(config.service_selectors.clone()),
            ports: Some(vec![ServicePort {
                name: Some("https".to_string()),
                port: SERVICE_PORT,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::Int(i32::from(config.server_port))),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ensure the webhook configurations (and in `service` mode the Service).
///
/// # Errors
///
/// Returns an error if a configuration cannot be built or applied.
pub async fn register_webhooks(client: &Client, config: &RegistrationConfig) -> Result<()> {
    if config.mode == ConfigMode::Service {
        if config.namespace.is_empty() {
            return Err(Error::InvalidProviderConfig(
                "service mode needs --webhook-config-namespace".to_string(),
            ));
        }
        create_or_apply(client, &config.namespace, &webhook_service(config), FIELD_MANAGER).await?;
    }
    apply_cluster_scoped(client, &validating_configuration(config)?, FIELD_MANAGER).await?;
    apply_cluster_scoped(client, &mutating_configuration(config)?, FIELD_MANAGER).await?;
    info!(name = %config.name, mode = ?config.mode, "registered admission webhooks");
    Ok(())
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod registration_tests;
