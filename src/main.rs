use std::sync::Arc;

use clap::Parser;
use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use database_operator::health::{HealthState, run_health_server};
use database_operator::{Args, BackendRegistry, OperatorConfig, run_controller};

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("database_operator=info,kube=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(Args::parse()).await {
        error!(error = %e, "Fatal error, exiting");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    info!(config = %args.config.display(), "Starting database-operator");

    let config = OperatorConfig::load(&args.config)?;
    let backends = BackendRegistry::from_config(&config)?;
    info!(backends = ?backends.types(), "Configured database backends");

    let client = kube_client(&args).await?;
    info!("Connected to Kubernetes cluster");

    let shutdown = CancellationToken::new();
    let health_state = Arc::new(HealthState::new());

    let health_handle = {
        let health_state = health_state.clone();
        let shutdown = shutdown.clone();
        let addr = args.health_addr;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, addr, shutdown).await {
                error!("Health server error: {}", e);
            }
        })
    };

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown.cancel();
        });
    }

    let result = run_controller(client, backends, &config, Some(health_state), shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = health_handle.await {
        error!("Health server task panicked: {}", e);
    }
    result?;

    info!("Operator stopped");
    Ok(())
}

/// Client from `--kubeconfig` when given, the default resolution otherwise
async fn kube_client(args: &Args) -> Result<Client, Box<dyn std::error::Error>> {
    let Some(path) = &args.kubeconfig else {
        return Ok(Client::try_default().await?);
    };
    let kubeconfig = Kubeconfig::read_from(path)?;
    let config =
        kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(Client::try_from(config)?)
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
