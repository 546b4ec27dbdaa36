//! Collection cycle: gateway counts, then cluster counts, then duration.
//!
//! Each collector writes only its own gauges. A failing source bumps its
//! error counter and leaves the rest of the cycle running.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use kc_cluster::{ClusterProvider, PodCensus};
use kc_gateway::{CommandRunner, GatewayClient};

use crate::metrics::{ErrorSource, ExporterMetrics};

/// Gateway side.
///
/// `nodes list` failing marks the gateway down and skips `nodes pending`;
/// node counts and the pending gauge keep their previous values. `nodes
/// pending` failing on its own zeroes the pending gauge.
pub async fn collect_gateway<R: CommandRunner>(
    metrics: &ExporterMetrics,
    gateway: &GatewayClient<R>,
) {
    let nodes = match gateway.list_nodes().await {
        Ok(nodes) => nodes,
        Err(e) => {
            debug!(error = %e, "gateway unavailable; skipping gateway metrics");
            metrics.set_gateway_up(false);
            metrics.record_error(ErrorSource::GatewayNodes);
            return;
        }
    };

    let online = nodes.iter().filter(|n| n.is_reachable()).count();
    metrics.set_gateway_up(true);
    metrics.set_gateway_nodes(nodes.len(), online);

    match gateway.list_pending().await {
        Ok(pending) => metrics.set_gateway_pending(pending.len()),
        Err(e) => {
            warn!(error = %e, "failed to list pending requests");
            metrics.set_gateway_pending(0);
            metrics.record_error(ErrorSource::GatewayPending);
        }
    }

    debug!(
        nodes = nodes.len(),
        online,
        "gateway: {} nodes, {} online",
        nodes.len(),
        online
    );
}

/// Cluster side. On a listing error every pod gauge keeps its last value.
pub async fn collect_cluster(
    metrics: &ExporterMetrics,
    cluster: &dyn ClusterProvider,
    namespace: &str,
    label_selector: &str,
) -> Option<PodCensus> {
    match cluster.list_pods(namespace, label_selector).await {
        Ok(pods) => {
            let census = PodCensus::from_pods(&pods);
            metrics.set_census(&census);
            debug!(
                total = census.total,
                running = census.running,
                paired = census.paired,
                "kubernetes: {} pods, {} running, {} paired",
                census.total,
                census.running,
                census.paired
            );
            Some(census)
        }
        Err(e) => {
            error!(error = %e, namespace, "error collecting kubernetes metrics");
            metrics.record_error(ErrorSource::Kubernetes);
            None
        }
    }
}

/// Owns the collaborators for the exporter loop.
pub struct Collector<C, R> {
    cluster: C,
    gateway: GatewayClient<R>,
    metrics: ExporterMetrics,
    namespace: String,
    label_selector: String,
    interval: Duration,
}

impl<C, R> Collector<C, R>
where
    C: ClusterProvider,
    R: CommandRunner,
{
    pub fn new(
        cluster: C,
        gateway: GatewayClient<R>,
        metrics: ExporterMetrics,
        namespace: impl Into<String>,
        label_selector: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            cluster,
            gateway,
            metrics,
            namespace: namespace.into(),
            label_selector: label_selector.into(),
            interval,
        }
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn gateway(&self) -> &GatewayClient<R> {
        &self.gateway
    }

    /// One full cycle. The duration gauge is written whatever the individual
    /// sources did.
    pub async fn collect_all(&self) {
        let started = Instant::now();

        collect_gateway(&self.metrics, &self.gateway).await;
        collect_cluster(
            &self.metrics,
            &self.cluster,
            &self.namespace,
            &self.label_selector,
        )
        .await;

        let elapsed = started.elapsed();
        self.metrics.record_duration(elapsed);
        debug!(elapsed_ms = elapsed.as_millis() as u64, "metrics collected");
    }

    /// One cycle with failure isolation. Returns `false` if the cycle
    /// panicked; that is counted under `collection_loop`.
    pub async fn run_once(&self) -> bool {
        match AssertUnwindSafe(self.collect_all()).catch_unwind().await {
            Ok(()) => true,
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "error in collection loop");
                self.metrics.record_error(ErrorSource::CollectionLoop);
                false
            }
        }
    }

    /// Collect until `shutdown` resolves. Returns the number of cycles run.
    pub async fn run<S>(&self, shutdown: S) -> u64
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            self.run_once().await;
            cycles += 1;

            tokio::select! {
                _ = &mut shutdown => {
                    info!(cycles, "shutdown requested; stopping collection loop");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        cycles
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
