//! kc-controller entry point.
//!
//! Thin: tracing, settings, cluster and gateway wiring, then the loop.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use kc_cluster::KubeClusterProvider;
use kc_controller::{Controller, PassResult};
use kc_gateway::{GatewayClient, ProcessRunner};

#[derive(Parser)]
#[command(name = "kc-controller")]
#[command(about = "Approves gateway pairing requests for KubeClaw pods", long_about = None)]
struct Args {
    /// Run a single reconciliation pass and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Override the namespace resolved from the service account / NAMESPACE.
    #[arg(long)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    let args = Args::parse();

    let settings = kc_config::load_settings()
        .context("failed to load settings")?
        .with_namespace_override(args.namespace);

    info!("KubeClaw auto-pairing controller starting");
    info!(
        poll_interval_secs = settings.poll_interval_secs,
        label_selector = %settings.label_selector,
        "poll interval: {}s | label selector: {}",
        settings.poll_interval_secs,
        settings.label_selector
    );
    info!(config_hash = %settings.fingerprint()?, "settings loaded");

    let cluster = KubeClusterProvider::connect()
        .await
        .context("failed to build Kubernetes client")?;
    info!(
        namespace = %settings.namespace,
        source = ?settings.namespace_source,
        "operating in namespace: {}",
        settings.namespace
    );

    let gateway = GatewayClient::new(ProcessRunner::new(
        settings.gateway_bin.clone(),
        settings.gateway_timeout(),
    ));
    let controller = Controller::from_settings(cluster, gateway, &settings);

    if args.once {
        return match controller.run_once().await {
            PassResult::Completed(report) => {
                info!(?report, "single pass completed");
                Ok(())
            }
            PassResult::Failed(msg) | PassResult::Panicked(msg) => {
                anyhow::bail!("reconciliation pass failed: {msg}")
            }
        };
    }

    let passes = controller.run(shutdown_signal()).await;
    info!(passes, "controller stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
