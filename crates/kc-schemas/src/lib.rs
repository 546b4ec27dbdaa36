//! kc-schemas
//!
//! Shared record shapes for the two populations the controller and exporter
//! merge: pods observed in the cluster and entries observed on the gateway.
//!
//! Gateway JSON is schema-less from our side, so the gateway records keep the
//! raw value next to the few typed fields we actually read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label selector restricting which pods take part in pairing.
pub const LABEL_SELECTOR: &str = "app.kubernetes.io/name=kubeclaw";

/// Container env key a pod uses to declare its pairing identity.
pub const POD_ID_ENV_VAR: &str = "KUBECLAW_POD_ID";

/// Field names carrying a pending request's identifier, in preference order.
pub const REQUEST_ID_FIELDS: &[&str] = &["id", "requestId", "request_id"];

/// Gateway node status values (lower-cased) that count as reachable.
pub const REACHABLE_STATUSES: &[&str] = &["online", "connected", "active"];

// ---------------------------------------------------------------------------
// Cluster side
// ---------------------------------------------------------------------------

/// Pod lifecycle phase as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Map the cluster's phase string. Missing or unrecognised values are `Unknown`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Pending") => PodPhase::Pending,
            Some("Running") => PodPhase::Running,
            Some("Succeeded") => PodPhase::Succeeded,
            Some("Failed") => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        }
    }

    /// Only pending and running pods may authorize a pairing.
    pub fn may_pair(&self) -> bool {
        matches!(self, PodPhase::Pending | PodPhase::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCondition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    /// `None` for env entries sourced from `valueFrom` (secret/configmap refs).
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerEnv {
    pub name: String,
    pub env: Vec<EnvVar>,
}

/// Transient, per-pass view of one labelled pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePod {
    pub name: String,
    pub phase: PodPhase,
    pub containers: Vec<ContainerEnv>,
    pub conditions: Vec<PodCondition>,
}

impl CandidatePod {
    pub fn new(name: impl Into<String>, phase: PodPhase) -> Self {
        Self {
            name: name.into(),
            phase,
            containers: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Every non-empty identity value declared across all containers.
    /// May repeat when several containers declare the same token.
    pub fn identity_tokens(&self) -> impl Iterator<Item = &str> {
        self.containers
            .iter()
            .flat_map(|c| c.env.iter())
            .filter(|e| e.name == POD_ID_ENV_VAR)
            .filter_map(|e| e.value.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn has_identity(&self) -> bool {
        self.identity_tokens().next().is_some()
    }

    /// `Ready` condition with status `True`.
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.kind == "Ready" && c.status == "True")
    }
}

// ---------------------------------------------------------------------------
// Gateway side
// ---------------------------------------------------------------------------

/// Return the first field in `names` that is present on `obj` with a usable
/// value. Non-empty strings are returned as-is; numbers are rendered in
/// decimal. Anything else (null, empty string, bool, nested) is skipped.
pub fn first_present_field(obj: &Value, names: &[&str]) -> Option<String> {
    let map = obj.as_object()?;
    names.iter().find_map(|name| match map.get(*name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One entry from `nodes pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// First usable value of [`REQUEST_ID_FIELDS`]; `None` marks the record malformed.
    pub request_id: Option<String>,
    /// Free-text description; carries an identity token by convention.
    pub description: Option<String>,
    pub raw: Value,
}

impl PendingRequest {
    pub fn from_value(raw: Value) -> Self {
        let request_id = first_present_field(&raw, REQUEST_ID_FIELDS);
        let description = raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            request_id,
            description,
            raw,
        }
    }
}

/// One entry from `nodes list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredNode {
    pub status: Option<String>,
    pub raw: Value,
}

impl RegisteredNode {
    pub fn from_value(raw: Value) -> Self {
        let status = raw.get("status").and_then(Value::as_str).map(str::to_string);
        Self { status, raw }
    }

    /// Case-insensitive membership in [`REACHABLE_STATUSES`].
    pub fn is_reachable(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| {
                let lower = s.to_ascii_lowercase();
                REACHABLE_STATUSES.contains(&lower.as_str())
            })
            .unwrap_or(false)
    }
}
