//! kc-config
//!
//! Startup settings shared by the controller and the exporter.
//!
//! Everything is read once, before the first pass, and is immutable
//! afterwards. Sources, highest precedence first:
//!
//! - namespace: service-account namespace file -> `NAMESPACE` -> `"default"`
//! - numbers and names: environment variable -> built-in default
//!
//! The label selector is fixed and not configurable.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_METRICS_PORT: u16 = 9090;
pub const DEFAULT_GATEWAY_BIN: &str = "openclaw";
/// Upper bound on every gateway CLI invocation.
pub const GATEWAY_TIMEOUT_SECS: u64 = 30;

pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";
pub const ENV_NAMESPACE: &str = "NAMESPACE";
pub const ENV_GATEWAY_BIN: &str = "OPENCLAW_BIN";
pub const ENV_EXPORTER_VERSION: &str = "EXPORTER_VERSION";

// ---------------------------------------------------------------------------
// Environment source
// ---------------------------------------------------------------------------

/// Read-only view of environment variables.
///
/// Production code uses [`ProcessEnv`]; tests pass a `BTreeMap`.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Where the effective namespace came from (logged at startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceSource {
    ServiceAccount,
    Environment,
    Default,
    CommandLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub poll_interval_secs: u64,
    pub metrics_port: u16,
    pub namespace: String,
    pub namespace_source: NamespaceSource,
    pub label_selector: String,
    pub gateway_bin: String,
    pub gateway_timeout_secs: u64,
    pub exporter_version: String,
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Replace the namespace with an explicit operator override.
    pub fn with_namespace_override(mut self, namespace: Option<String>) -> Self {
        if let Some(ns) = namespace.filter(|ns| !ns.trim().is_empty()) {
            self.namespace = ns.trim().to_string();
            self.namespace_source = NamespaceSource::CommandLine;
        }
        self
    }

    /// SHA-256 (hex) over the canonical JSON form. Two processes with the same
    /// fingerprint were started with identical effective settings.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).context("settings serialize failed")?;
        Ok(sha256_hex(canonical.as_bytes()))
    }
}

/// Resolve settings from the real process environment and the in-cluster
/// service-account file.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&ProcessEnv, Path::new(SERVICE_ACCOUNT_NAMESPACE_PATH))
}

pub fn load_settings_from(env: &dyn EnvSource, namespace_file: &Path) -> Result<Settings> {
    let poll_interval_secs = parse_env_or(env, ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS)?;
    if poll_interval_secs == 0 {
        bail!("{ENV_POLL_INTERVAL} must be greater than zero");
    }
    let metrics_port = parse_env_or(env, ENV_METRICS_PORT, DEFAULT_METRICS_PORT)?;
    let (namespace, namespace_source) = resolve_namespace(env, namespace_file)?;

    let gateway_bin =
        non_blank(env, ENV_GATEWAY_BIN).unwrap_or_else(|| DEFAULT_GATEWAY_BIN.to_string());
    let exporter_version = non_blank(env, ENV_EXPORTER_VERSION)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    Ok(Settings {
        poll_interval_secs,
        metrics_port,
        namespace,
        namespace_source,
        label_selector: kc_schemas::LABEL_SELECTOR.to_string(),
        gateway_bin,
        gateway_timeout_secs: GATEWAY_TIMEOUT_SECS,
        exporter_version,
    })
}

/// Namespace precedence: service-account file, then `NAMESPACE`, then
/// `"default"`. A present but blank file falls through to the next source.
pub fn resolve_namespace(
    env: &dyn EnvSource,
    namespace_file: &Path,
) -> Result<(String, NamespaceSource)> {
    if namespace_file.exists() {
        let raw = fs::read_to_string(namespace_file).with_context(|| {
            format!("failed to read namespace file: {}", namespace_file.display())
        })?;
        let ns = raw.trim();
        if !ns.is_empty() {
            return Ok((ns.to_string(), NamespaceSource::ServiceAccount));
        }
    }

    if let Some(ns) = non_blank(env, ENV_NAMESPACE) {
        return Ok((ns, NamespaceSource::Environment));
    }

    Ok((DEFAULT_NAMESPACE.to_string(), NamespaceSource::Default))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_blank(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_or<T>(env: &dyn EnvSource, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(env, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}='{raw}': {e}")),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
