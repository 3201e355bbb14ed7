// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hand-off of computed chart values.
//!
//! The control plane reconciler does not render charts itself. It passes the
//! values of each chart to a [`ChartApplier`]. The bundled
//! [`SecretValuesApplier`] stores them as `values.yaml` in a secret
//! `<chart>-values` of the shoot's seed namespace, where the chart renderer
//! picks them up.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DeleteParams;
use kube::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::constants::FIELD_MANAGER;
use crate::errors::Result;
use crate::labels::{LABEL_CHART, LABEL_MANAGED_BY, MANAGED_BY_VALUE};
use crate::reconcilers::resources::{create_or_apply, delete_if_exists};

/// Secret key holding the chart values
pub const SECRET_KEY_VALUES: &str = "values.yaml";

/// Receives the values of control plane charts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChartApplier: Send + Sync {
    /// Apply `chart` with `values` for the shoot of `namespace`
    async fn apply(&self, namespace: &str, chart: &str, values: &Value) -> Result<()>;

    /// Remove `chart` from the shoot of `namespace`
    async fn delete(&self, namespace: &str, chart: &str) -> Result<()>;
}

/// Name of the values secret of a chart
#[must_use]
pub fn values_secret_name(chart: &str) -> String {
    format!("{chart}-values")
}

/// The values secret of a chart
///
/// # Errors
///
/// Returns [`crate::errors::Error::Yaml`] if the values cannot be encoded.
pub fn values_secret(namespace: &str, chart: &str, values: &Value) -> Result<Secret> {
    let labels = BTreeMap::from([
        (LABEL_CHART.to_string(), chart.to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string()),
    ]);
    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(values_secret_name(chart)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(BTreeMap::from([(
            SECRET_KEY_VALUES.to_string(),
            serde_yaml::to_string(values)?,
        )])),
        ..Default::default()
    })
}

/// Stores chart values in secrets of the seed namespace
#[derive(Clone)]
pub struct SecretValuesApplier {
    client: Client,
}

impl SecretValuesApplier {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChartApplier for SecretValuesApplier {
    async fn apply(&self, namespace: &str, chart: &str, values: &Value) -> Result<()> {
        let secret = values_secret(namespace, chart, values)?;
        create_or_apply(&self.client, namespace, &secret, FIELD_MANAGER).await?;
        debug!(namespace = %namespace, chart = %chart, "stored chart values");
        Ok(())
    }

    async fn delete(&self, namespace: &str, chart: &str) -> Result<()> {
        let name = values_secret_name(chart);
        if delete_if_exists::<Secret>(&self.client, namespace, &name, &DeleteParams::default()).await? {
            debug!(namespace = %namespace, chart = %chart, "deleted chart values");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "charts_tests.rs"]
mod charts_tests;
