// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use kube_lease_manager::LeaseManagerBuilder;
use provider_metal::{
    clients::seed_client,
    config::{ConcurrencyConfig, ControllerConfig},
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, DEFAULT_LEASE_NAME,
        DEFAULT_METRICS_PORT, DEFAULT_WEBHOOK_SERVER_PORT,
    },
    context::Context,
    imagevector::ImageVector,
    metal::HttpMetalClientFactory,
    metrics::{gather_metrics, record_leader_elected, record_leader_lost},
    reconcilers::{controlplane, controlplane::charts::SecretValuesApplier, infrastructure, worker},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Controller manager of the metal provider extension
#[derive(Debug, Parser)]
#[command(name = "provider-metal-controller-manager", version)]
struct Args {
    /// Acquire a lease before starting the controllers
    #[arg(long)]
    leader_election: bool,

    /// Namespace of the leader election lease; defaults to the client namespace
    #[arg(long, env = "LEADER_ELECTION_NAMESPACE")]
    leader_election_namespace: Option<String>,

    /// Name of the leader election lease
    #[arg(long, default_value = DEFAULT_LEASE_NAME)]
    leader_election_id: String,

    /// Port of the seed webhook server
    #[arg(long, default_value_t = DEFAULT_WEBHOOK_SERVER_PORT)]
    webhook_server_port: u16,

    /// Port of the metrics and health endpoints
    #[arg(long, default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,

    #[arg(long)]
    controlplane_max_concurrent_reconciles: Option<u16>,

    #[arg(long)]
    infrastructure_max_concurrent_reconciles: Option<u16>,

    #[arg(long)]
    worker_max_concurrent_reconciles: Option<u16>,

    /// Controller configuration (YAML)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Kubeconfig of the seed; in-cluster or default discovery when unset
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,
}

/// Concurrency of each controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Concurrency {
    control_plane: u16,
    infrastructure: u16,
    worker: u16,
}

impl Concurrency {
    fn resolve(args: &Args, config: &ConcurrencyConfig) -> Self {
        Self {
            control_plane: ConcurrencyConfig::resolve(
                args.controlplane_max_concurrent_reconciles,
                config.control_plane,
            ),
            infrastructure: ConcurrencyConfig::resolve(
                args.infrastructure_max_concurrent_reconciles,
                config.infrastructure,
            ),
            worker: ConcurrencyConfig::resolve(args.worker_max_concurrent_reconciles, config.worker),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("provider-metal-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // RUST_LOG selects the filter (default info), RUST_LOG_FORMAT=json the formatter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();
    info!("Starting metal provider controller manager");

    let config = match &args.config_file {
        Some(path) => ControllerConfig::from_file(path)
            .with_context(|| format!("loading controller configuration {}", path.display()))?,
        None => {
            warn!("No --config-file given, using an empty controller configuration");
            ControllerConfig::default()
        }
    };
    let concurrency = Concurrency::resolve(&args, &config.concurrency);
    debug!(?concurrency, "Resolved controller concurrency");

    let image_vector = ImageVector::load().context("loading image vector")?;

    let client = seed_client(args.kubeconfig.as_deref()).await?;
    info!(
        webhook_server_port = args.webhook_server_port,
        "Seed client initialized, no seed webhooks are served"
    );

    let ctx = Arc::new(Context::new(
        client.clone(),
        config,
        image_vector,
        Arc::new(HttpMetalClientFactory),
        Arc::new(SecretValuesApplier::new(client.clone())),
    ));

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));

    if !args.leader_election {
        return tokio::select! {
            result = run_metrics_server(metrics_addr) => result,
            result = run_controllers(ctx, concurrency) => result,
            () = shutdown_signal() => Ok(()),
        };
    }

    let identity = pod_identity();
    let namespace = args
        .leader_election_namespace
        .clone()
        .unwrap_or_else(|| client.default_namespace().to_string());
    info!(lease = %args.leader_election_id, namespace = %namespace, identity = %identity, "Leader election enabled");

    let manager = LeaseManagerBuilder::new(client, &args.leader_election_id)
        .with_namespace(&namespace)
        .with_identity(&identity)
        .with_duration(DEFAULT_LEASE_DURATION_SECS)
        .with_grace(DEFAULT_LEASE_GRACE_SECS)
        .build()
        .await?;
    let (mut leader, lease_task) = manager.watch().await;

    let result = tokio::select! {
        result = run_metrics_server(metrics_addr) => result,
        result = lead(&mut leader, &identity, ctx, concurrency) => result,
        () = shutdown_signal() => Ok(()),
    };

    // dropping the receiver makes the lease task release the lease
    drop(leader);
    if let Err(e) = lease_task.await {
        warn!(error = %e, "Lease task failed");
    }
    result
}

/// Wait for leadership, then run the controllers until it is lost.
async fn lead(
    leader: &mut watch::Receiver<bool>,
    identity: &str,
    ctx: Arc<Context>,
    concurrency: Concurrency,
) -> Result<()> {
    info!("Waiting for leadership");
    while !*leader.borrow_and_update() {
        leader.changed().await?;
    }
    info!(identity = %identity, "Acquired leadership");
    record_leader_elected(identity);

    tokio::select! {
        result = run_controllers(ctx, concurrency) => result,
        result = lost_leadership(leader) => {
            record_leader_lost(identity);
            error!("CRITICAL: Lost leadership, exiting");
            result?;
            anyhow::bail!("lost leadership")
        }
    }
}

async fn lost_leadership(leader: &mut watch::Receiver<bool>) -> Result<()> {
    while *leader.borrow_and_update() {
        leader.changed().await?;
    }
    Ok(())
}

fn pod_identity() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("provider-metal-{}", std::process::id()))
}

/// Run all controllers; none of them is expected to return.
async fn run_controllers(ctx: Arc<Context>, concurrency: Concurrency) -> Result<()> {
    info!("Starting all controllers");
    tokio::select! {
        () = infrastructure::run_controller(ctx.clone(), concurrency.infrastructure) => {
            error!("CRITICAL: Infrastructure controller exited unexpectedly");
            anyhow::bail!("Infrastructure controller exited unexpectedly")
        }
        () = worker::run_controller(ctx.clone(), concurrency.worker) => {
            error!("CRITICAL: Worker controller exited unexpectedly");
            anyhow::bail!("Worker controller exited unexpectedly")
        }
        () = controlplane::run_controller(ctx, concurrency.control_plane) => {
            error!("CRITICAL: ControlPlane controller exited unexpectedly");
            anyhow::bail!("ControlPlane controller exited unexpectedly")
        }
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn metrics_router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
}

async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics server to {addr}"))?;
    info!(addr = %addr, "Serving metrics");
    axum::serve(listener, metrics_router()).await?;
    error!("CRITICAL: Metrics server exited unexpectedly");
    anyhow::bail!("Metrics server exited unexpectedly")
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
