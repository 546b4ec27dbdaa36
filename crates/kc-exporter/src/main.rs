//! kc-exporter entry point.
//!
//! Thin: tracing, settings, shared state, HTTP server, collection loop.
//! Route handlers live in `routes.rs`; collectors in `collect.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use kc_cluster::KubeClusterProvider;
use kc_exporter::{collect::Collector, metrics::encode_text, routes, serve, state};
use kc_gateway::{GatewayClient, ProcessRunner};

#[derive(Parser)]
#[command(name = "kc-exporter")]
#[command(
    about = "Prometheus exporter for KubeClaw pods and the OpenClaw gateway",
    long_about = None
)]
struct Args {
    /// Collect once, print the exposition text to stdout and exit.
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

    info!("KubeClaw metrics exporter starting");
    info!(
        metrics_port = settings.metrics_port,
        poll_interval_secs = settings.poll_interval_secs,
        "metrics port: {} | poll interval: {}s",
        settings.metrics_port,
        settings.poll_interval_secs
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

    let shared = Arc::new(
        state::AppState::new(settings.exporter_version.clone())
            .context("failed to register metrics")?,
    );

    let gateway = GatewayClient::new(ProcessRunner::new(
        settings.gateway_bin.clone(),
        settings.gateway_timeout(),
    ));
    let collector = Collector::new(
        cluster,
        gateway,
        shared.metrics.clone(),
        settings.namespace.clone(),
        settings.label_selector.clone(),
        settings.poll_interval(),
    );

    if args.once {
        collector.run_once().await;
        print!("{}", encode_text(&shared.registry)?);
        return Ok(());
    }

    let app = routes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.metrics_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("kc-exporter listening on http://{}/metrics", addr);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let server_stop = stopped(stop_rx.clone());
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_stop)
            .await
    });

    serve::supervise(collector.run(stopped(stop_rx)), server).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Resolves once the stop flag flips (or its sender is gone).
async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
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
