//! Shared state for the exporter's HTTP surface.
//!
//! Handlers receive `State<Arc<AppState>>`. The collection loop holds its
//! own clone of [`ExporterMetrics`]; both write to and read from the same
//! registry.

use prometheus::Registry;

use crate::metrics::{ExporterMetrics, MetricsResult, COMPONENT};

/// Static build metadata included in health responses and the info metric.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: String,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub metrics: ExporterMetrics,
    pub build: BuildInfo,
}

impl AppState {
    /// Fresh registry with every metric registered and the info gauge set.
    pub fn new(version: impl Into<String>) -> MetricsResult<Self> {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry)?;
        let build = BuildInfo {
            service: COMPONENT,
            version: version.into(),
        };
        metrics.set_build_info(&build.version);

        Ok(Self {
            registry,
            metrics,
            build,
        })
    }
}
