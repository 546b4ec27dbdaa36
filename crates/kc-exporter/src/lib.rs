//! kc-exporter library target.
//!
//! Exposes the metric set, the collectors and the router for integration
//! tests. The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod collect;
pub mod metrics;
pub mod routes;
pub mod serve;
pub mod state;
