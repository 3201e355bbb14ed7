// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the metal provider extension.
//!
//! Every series is prefixed with `provider_metal_` and registered in
//! [`METRICS_REGISTRY`], which the controller manager exposes on `/metrics`.
//!
//! ```rust,no_run
//! use provider_metal::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Infrastructure", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "provider_metal";

const RECONCILE_BUCKETS: &[f64] = &[0.05, 0.25, 1.0, 2.5, 5.0, 15.0, 30.0, 60.0, 180.0];
const METAL_API_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(name, help).namespace(METRICS_NAMESPACE);
    let vec = CounterVec::new(opts, labels).expect("valid counter definition");
    METRICS_REGISTRY
        .register(Box::new(vec.clone()))
        .expect("counter registered once");
    vec
}

fn histogram(name: &str, help: &str, labels: &[&str], buckets: &[f64]) -> HistogramVec {
    let opts = HistogramOpts::new(name, help)
        .namespace(METRICS_NAMESPACE)
        .buckets(buckets.to_vec());
    let vec = HistogramVec::new(opts, labels).expect("valid histogram definition");
    METRICS_REGISTRY
        .register(Box::new(vec.clone()))
        .expect("histogram registered once");
    vec
}

fn gauge(name: &str, help: &str, labels: &[&str]) -> GaugeVec {
    let opts = Opts::new(name, help).namespace(METRICS_NAMESPACE);
    let vec = GaugeVec::new(opts, labels).expect("valid gauge definition");
    METRICS_REGISTRY
        .register(Box::new(vec.clone()))
        .expect("gauge registered once");
    vec
}

/// Reconcile outcomes per extension kind (`Infrastructure`, `Worker`,
/// `ControlPlane`) and result (`success`, `error`, `requeue`).
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Reconciliations by extension kind and result",
        &["kind", "result"],
    )
});

pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram(
        "reconciliation_duration_seconds",
        "Wall time of a reconciliation by extension kind",
        &["kind"],
        RECONCILE_BUCKETS,
    )
});

/// Requeues keyed by the error code that caused them, e.g. `ERR_INFRA_UNAVAILABLE`.
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Requeued reconciliations by extension kind and error code",
        &["kind", "code"],
    )
});

/// Metal API objects (networks, IPs, firewalls) and seed objects created.
pub static OBJECTS_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "objects_created_total",
        "Objects created in the metal API or the seed by object type",
        &["object"],
    )
});

pub static OBJECTS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "objects_deleted_total",
        "Objects deleted in the metal API or the seed by object type",
        &["object"],
    )
});

pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "errors_total",
        "Reconcile errors by extension kind and error code",
        &["kind", "code"],
    )
});

/// Metal API calls by client method and outcome (`success` or an error code).
pub static METAL_API_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "metal_api_requests_total",
        "Metal API requests by operation and outcome",
        &["operation", "outcome"],
    )
});

pub static METAL_API_REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    histogram(
        "metal_api_request_duration_seconds",
        "Round-trip time of metal API requests by operation",
        &["operation"],
        METAL_API_BUCKETS,
    )
});

/// Admission reviews by handler (`validate`, `default`), operation and
/// result (`allowed`, `denied`, `patched`).
pub static ADMISSION_REVIEWS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "admission_reviews_total",
        "Admission reviews by handler, operation and result",
        &["handler", "operation", "result"],
    )
});

pub static LEADER_TRANSITIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "leader_transitions_total",
        "Lease acquisitions and losses of this replica",
        &["transition"],
    )
});

/// 1 while the identity holds the lease.
pub static IS_LEADER: LazyLock<GaugeVec> = LazyLock::new(|| {
    gauge(
        "is_leader",
        "Whether this replica currently holds the lease",
        &["identity"],
    )
});

fn observe_reconcile(kind: &str, result: &str, elapsed: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&[kind, result]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(elapsed.as_secs_f64());
}

pub fn record_reconciliation_success(kind: &str, elapsed: Duration) {
    observe_reconcile(kind, "success", elapsed);
}

pub fn record_reconciliation_error(kind: &str, elapsed: Duration) {
    observe_reconcile(kind, "error", elapsed);
}

/// Count a requeue of `kind` caused by the error `code`.
pub fn record_reconciliation_requeue(kind: &str, code: &str) {
    RECONCILIATION_TOTAL.with_label_values(&[kind, "requeue"]).inc();
    REQUEUE_TOTAL.with_label_values(&[kind, code]).inc();
}

pub fn record_resource_created(object: &str) {
    OBJECTS_CREATED_TOTAL.with_label_values(&[object]).inc();
}

pub fn record_resource_deleted(object: &str) {
    OBJECTS_DELETED_TOTAL.with_label_values(&[object]).inc();
}

pub fn record_error(kind: &str, code: &str) {
    ERRORS_TOTAL.with_label_values(&[kind, code]).inc();
}

pub fn record_metal_request(operation: &str, outcome: &str, elapsed: Duration) {
    METAL_API_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    METAL_API_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

pub fn record_admission_review(handler: &str, operation: &str, result: &str) {
    ADMISSION_REVIEWS_TOTAL
        .with_label_values(&[handler, operation, result])
        .inc();
}

pub fn record_leader_elected(identity: &str) {
    LEADER_TRANSITIONS_TOTAL.with_label_values(&["acquired"]).inc();
    IS_LEADER.with_label_values(&[identity]).set(1.0);
}

pub fn record_leader_lost(identity: &str) {
    LEADER_TRANSITIONS_TOTAL.with_label_values(&["lost"]).inc();
    IS_LEADER.with_label_values(&[identity]).set(0.0);
}

/// Render the registry in the Prometheus text exposition format.
///
/// # Errors
///
/// Returns an error if encoding fails or yields invalid UTF-8.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("metrics are not UTF-8: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
