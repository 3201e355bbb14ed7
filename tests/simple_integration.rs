// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the metal provider extension
//!
//! These tests talk to a real Kubernetes cluster and are skipped when none is
//! reachable.
//!
//! Run with: cargo test --test simple_integration -- --ignored

mod common;

use common::{cleanup_test_namespace, create_test_namespace, get_kube_client_or_skip, wait_for};
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams};
use provider_metal::admission::registration::{register_webhooks, ConfigMode, RegistrationConfig};
use provider_metal::clients::shoot_client;
use provider_metal::errors::Error;
use provider_metal::reconcilers::controlplane::charts::{
    values_secret_name, ChartApplier, SecretValuesApplier, SECRET_KEY_VALUES,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_chart_values_are_stored_and_removed() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let namespace = "provider-metal-test-charts";
    create_test_namespace(&client, namespace).await.unwrap();

    let applier = SecretValuesApplier::new(client.clone());
    let values = json!({"cloudControllerManager": {"replicas": 1}});
    applier.apply(namespace, "control-plane", &values).await.unwrap();

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let name = values_secret_name("control-plane");
    let stored = secrets.get(&name).await.unwrap();
    let data = stored.data.unwrap_or_default();
    let raw = String::from_utf8(data[SECRET_KEY_VALUES].0.clone()).unwrap();
    assert!(raw.contains("replicas: 1"));

    // applying twice is idempotent
    applier.apply(namespace, "control-plane", &values).await.unwrap();

    applier.delete(namespace, "control-plane").await.unwrap();
    applier.delete(namespace, "control-plane").await.unwrap();
    let gone = wait_for(Duration::from_secs(10), || {
        let secrets = secrets.clone();
        let name = name.clone();
        async move { matches!(secrets.get_opt(&name).await, Ok(None)) }
    })
    .await;
    assert!(gone, "values secret should be deleted");

    cleanup_test_namespace(&client, namespace).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_shoot_client_waits_for_access_secret() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let namespace = "provider-metal-test-shoot";
    create_test_namespace(&client, namespace).await.unwrap();

    let Err(err) = shoot_client(&client, namespace).await else {
        panic!("expected shoot_client to fail");
    };
    assert!(matches!(err, Error::ExternalDependencyUnready(_)), "got {err:?}");

    cleanup_test_namespace(&client, namespace).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_webhook_registration_in_url_mode() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };
    let config = RegistrationConfig {
        name: "provider-metal-integration-test".to_string(),
        mode: ConfigMode::Url,
        url: Some("https://provider-metal.example.com".to_string()),
        server_port: 9443,
        ..Default::default()
    };

    register_webhooks(&client, &config).await.unwrap();
    // re-registration converges
    register_webhooks(&client, &config).await.unwrap();

    let validating: Api<ValidatingWebhookConfiguration> = Api::all(client.clone());
    let mutating: Api<MutatingWebhookConfiguration> = Api::all(client.clone());
    let registered = validating.get(&config.name).await.unwrap();
    assert_eq!(registered.webhooks.unwrap_or_default().len(), 2);
    let registered = mutating.get(&config.name).await.unwrap();
    let url = registered.webhooks.unwrap_or_default()[0].client_config.url.clone();
    assert_eq!(url.as_deref(), Some("https://provider-metal.example.com/webhooks/default"));

    validating.delete(&config.name, &DeleteParams::default()).await.unwrap();
    mutating.delete(&config.name, &DeleteParams::default()).await.unwrap();
}
