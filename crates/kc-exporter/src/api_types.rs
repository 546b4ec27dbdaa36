//! Response types for the exporter's HTTP endpoints.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /healthz
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}
