// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission server of the metal provider extension.
//!
//! Registers the webhook configurations in the garden cluster and serves the
//! defaulting and validating webhooks over TLS.

use anyhow::{Context as _, Result};
use clap::Parser;
use provider_metal::{
    admission::{
        registration::{parse_service_selectors, read_ca_bundle, register_webhooks, ConfigMode, RegistrationConfig},
        serve, WebhookState,
    },
    clients::seed_client,
    config::DefaulterConfig,
    constants::{DEFAULT_ADMISSION_PORT, DEFAULT_WEBHOOK_CONFIG_NAME, DEFAULT_WEBHOOK_SERVICE_NAME},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "provider-metal-admission", version)]
struct Args {
    /// Directory holding tls.crt, tls.key and optionally ca.crt
    #[arg(long)]
    webhook_config_cert_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_ADMISSION_PORT)]
    webhook_config_server_port: u16,

    #[arg(long, value_enum, default_value_t = ConfigMode::Service)]
    webhook_config_mode: ConfigMode,

    /// Base URL of the webhooks in url mode
    #[arg(long)]
    webhook_config_url: Option<String>,

    /// Pod selector of the webhook service as JSON object
    #[arg(long, default_value = "")]
    webhook_config_service_selectors: String,

    #[arg(long, default_value = DEFAULT_WEBHOOK_CONFIG_NAME)]
    webhook_config_name: String,

    #[arg(long, env = "WEBHOOK_CONFIG_NAMESPACE", default_value = "")]
    webhook_config_namespace: String,

    #[arg(long, default_value = DEFAULT_WEBHOOK_SERVICE_NAME)]
    webhook_config_service_name: String,

    /// Kubeconfig of the garden cluster; in-cluster or default discovery when unset
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,
}

impl Args {
    fn registration(&self) -> Result<RegistrationConfig> {
        Ok(RegistrationConfig {
            name: self.webhook_config_name.clone(),
            mode: self.webhook_config_mode,
            url: self.webhook_config_url.clone(),
            namespace: self.webhook_config_namespace.clone(),
            service_name: self.webhook_config_service_name.clone(),
            service_selectors: parse_service_selectors(&self.webhook_config_service_selectors)?,
            server_port: self.webhook_config_server_port,
            ca_bundle: read_ca_bundle(&self.webhook_config_cert_dir),
        })
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if std::env::var("RUST_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .compact()
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("provider-metal-admission")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing();
    info!("Starting metal provider admission server");

    let defaulter = DefaulterConfig::from_env();
    debug!(?defaulter, "Loaded defaulter configuration");

    let registration = args.registration()?;
    let client = seed_client(args.kubeconfig.as_deref()).await?;
    register_webhooks(&client, &registration)
        .await
        .context("registering admission webhooks")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], args.webhook_config_server_port));
    let state = Arc::new(WebhookState::new(client, defaulter));
    serve(addr, &args.webhook_config_cert_dir, state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_mode_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cert_dir = dir.path().to_str().unwrap();
        let args = Args::try_parse_from([
            "provider-metal-admission",
            "--webhook-config-cert-dir",
            cert_dir,
            "--webhook-config-mode",
            "url",
            "--webhook-config-url",
            "https://admission.example.com",
            "--webhook-config-service-selectors",
            r#"{"app":"admission"}"#,
        ])
        .unwrap();

        let registration = args.registration().unwrap();
        assert_eq!(registration.mode, ConfigMode::Url);
        assert_eq!(registration.name, DEFAULT_WEBHOOK_CONFIG_NAME);
        assert_eq!(registration.server_port, DEFAULT_ADMISSION_PORT);
        assert_eq!(registration.service_selectors.len(), 1);
        assert!(registration.ca_bundle.is_none());
    }

    #[test]
    fn test_cert_dir_is_required() {
        assert!(Args::try_parse_from(["provider-metal-admission"]).is_err());
    }
}
