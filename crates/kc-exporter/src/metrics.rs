//! Prometheus metric set for the KubeClaw exporter.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `kubeclaw_gateway_up` | Gauge | |
//! | `kubeclaw_gateway_nodes_total` | Gauge | |
//! | `kubeclaw_gateway_nodes_online` | Gauge | |
//! | `kubeclaw_gateway_nodes_pending` | Gauge | |
//! | `kubeclaw_pods_total` | Gauge | |
//! | `kubeclaw_pods_running` / `_pending` / `_failed` | Gauge | |
//! | `kubeclaw_pods_ready` | Gauge | |
//! | `kubeclaw_paired_nodes` | Gauge | |
//! | `kubeclaw_scrape_errors_total` | Counter | `source` |
//! | `kubeclaw_scrape_duration_seconds` | Gauge | |
//! | `kubeclaw_exporter_info` | Gauge | `version`, `component` |
//!
//! Every gauge is last-known-value: a failed collection leaves it untouched
//! unless the collector says otherwise. Only the error counter accumulates.

use std::time::Duration;

use prometheus::{
    Encoder, Gauge, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

use kc_cluster::PodCensus;

pub const COMPONENT: &str = "kubeclaw-exporter";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    RegistrationFailed(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    EncodingFailed(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Value of the `source` label on `kubeclaw_scrape_errors_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    /// `nodes list` unavailable.
    GatewayNodes,
    /// `nodes pending` unavailable.
    GatewayPending,
    /// Pod listing failed.
    Kubernetes,
    /// A whole cycle failed unexpectedly.
    CollectionLoop,
}

impl ErrorSource {
    pub const ALL: [ErrorSource; 4] = [
        ErrorSource::GatewayNodes,
        ErrorSource::GatewayPending,
        ErrorSource::Kubernetes,
        ErrorSource::CollectionLoop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSource::GatewayNodes => "gateway_nodes",
            ErrorSource::GatewayPending => "gateway_pending",
            ErrorSource::Kubernetes => "kubernetes",
            ErrorSource::CollectionLoop => "collection_loop",
        }
    }
}

/// The exported values, owned explicitly instead of living in a global
/// registry. Cloning shares the underlying metrics.
#[derive(Clone)]
pub struct ExporterMetrics {
    gateway_up: IntGauge,
    gateway_nodes_total: IntGauge,
    gateway_nodes_online: IntGauge,
    gateway_nodes_pending: IntGauge,

    pods_total: IntGauge,
    pods_running: IntGauge,
    pods_pending: IntGauge,
    pods_failed: IntGauge,
    pods_ready: IntGauge,
    paired_nodes: IntGauge,

    scrape_errors_total: IntCounterVec,
    scrape_duration_seconds: Gauge,
    exporter_info: IntGaugeVec,
}

impl ExporterMetrics {
    /// Create every metric and register it with `registry`.
    ///
    /// # Errors
    ///
    /// Fails if a metric name is already registered.
    pub fn new(registry: &Registry) -> MetricsResult<Self> {
        let gauge = |name: &str, help: &str| -> MetricsResult<IntGauge> {
            let g = IntGauge::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        let gateway_up = gauge(
            "kubeclaw_gateway_up",
            "Whether the OpenClaw gateway is reachable",
        )?;
        let gateway_nodes_total =
            gauge("kubeclaw_gateway_nodes_total", "Total nodes registered with the gateway")?;
        let gateway_nodes_online =
            gauge("kubeclaw_gateway_nodes_online", "Gateway nodes currently online")?;
        let gateway_nodes_pending =
            gauge("kubeclaw_gateway_nodes_pending", "Pending node pairing requests")?;

        let pods_total = gauge("kubeclaw_pods_total", "Total KubeClaw pods")?;
        let pods_running = gauge("kubeclaw_pods_running", "KubeClaw pods in Running phase")?;
        let pods_pending = gauge("kubeclaw_pods_pending", "KubeClaw pods in Pending phase")?;
        let pods_failed = gauge("kubeclaw_pods_failed", "KubeClaw pods in Failed phase")?;
        let pods_ready = gauge("kubeclaw_pods_ready", "KubeClaw pods with Ready condition")?;
        let paired_nodes = gauge(
            "kubeclaw_paired_nodes",
            "Running, ready KubeClaw pods carrying a pod ID",
        )?;

        let scrape_errors_total = IntCounterVec::new(
            Opts::new("kubeclaw_scrape_errors_total", "Total scrape errors"),
            &["source"],
        )?;
        registry.register(Box::new(scrape_errors_total.clone()))?;
        // Expose every source at 0 from the first scrape.
        for source in ErrorSource::ALL {
            scrape_errors_total.with_label_values(&[source.as_str()]);
        }

        let scrape_duration_seconds = Gauge::with_opts(Opts::new(
            "kubeclaw_scrape_duration_seconds",
            "Time spent collecting metrics",
        ))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        let exporter_info = IntGaugeVec::new(
            Opts::new("kubeclaw_exporter_info", "KubeClaw exporter information"),
            &["version", "component"],
        )?;
        registry.register(Box::new(exporter_info.clone()))?;

        Ok(Self {
            gateway_up,
            gateway_nodes_total,
            gateway_nodes_online,
            gateway_nodes_pending,
            pods_total,
            pods_running,
            pods_pending,
            pods_failed,
            pods_ready,
            paired_nodes,
            scrape_errors_total,
            scrape_duration_seconds,
            exporter_info,
        })
    }

    pub fn set_build_info(&self, version: &str) {
        self.exporter_info
            .with_label_values(&[version, COMPONENT])
            .set(1);
    }

    pub fn set_gateway_up(&self, up: bool) {
        self.gateway_up.set(i64::from(up));
    }

    pub fn set_gateway_nodes(&self, total: usize, online: usize) {
        self.gateway_nodes_total.set(to_i64(total));
        self.gateway_nodes_online.set(to_i64(online));
    }

    pub fn set_gateway_pending(&self, pending: usize) {
        self.gateway_nodes_pending.set(to_i64(pending));
    }

    pub fn set_census(&self, census: &PodCensus) {
        self.pods_total.set(to_i64(census.total));
        self.pods_running.set(to_i64(census.running));
        self.pods_pending.set(to_i64(census.pending));
        self.pods_failed.set(to_i64(census.failed));
        self.pods_ready.set(to_i64(census.ready));
        self.paired_nodes.set(to_i64(census.paired));
    }

    pub fn record_error(&self, source: ErrorSource) {
        self.scrape_errors_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    pub fn record_duration(&self, elapsed: Duration) {
        self.scrape_duration_seconds.set(elapsed.as_secs_f64());
    }

    /// Current values, for logs and tests.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            gateway_up: self.gateway_up.get(),
            gateway_nodes_total: self.gateway_nodes_total.get(),
            gateway_nodes_online: self.gateway_nodes_online.get(),
            gateway_nodes_pending: self.gateway_nodes_pending.get(),
            pods_total: self.pods_total.get(),
            pods_running: self.pods_running.get(),
            pods_pending: self.pods_pending.get(),
            pods_failed: self.pods_failed.get(),
            pods_ready: self.pods_ready.get(),
            paired_nodes: self.paired_nodes.get(),
            scrape_duration_seconds: self.scrape_duration_seconds.get(),
        }
    }

    pub fn errors(&self, source: ErrorSource) -> u64 {
        self.scrape_errors_total
            .with_label_values(&[source.as_str()])
            .get()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub gateway_up: i64,
    pub gateway_nodes_total: i64,
    pub gateway_nodes_online: i64,
    pub gateway_nodes_pending: i64,
    pub pods_total: i64,
    pub pods_running: i64,
    pub pods_pending: i64,
    pub pods_failed: i64,
    pub pods_ready: i64,
    pub paired_nodes: i64,
    pub scrape_duration_seconds: f64,
}

/// Encode everything in `registry` in the Prometheus text format.
pub fn encode_text(registry: &Registry) -> MetricsResult<String> {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| MetricsError::EncodingFailed(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::EncodingFailed(e.to_string()))
}

fn to_i64<T: TryInto<i64>>(n: T) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}
