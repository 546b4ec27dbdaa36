//! Cluster provider boundary.
//!
//! [`ClusterProvider`] is the only way the rest of the workspace reads pod
//! state. The production implementation wraps a `kube::Client`; tests use the
//! in-memory fake from `kc-testkit`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::KubeConfigOptions;
use tracing::info;

use kc_schemas::{CandidatePod, ContainerEnv, EnvVar, PodCondition, PodPhase};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// Neither in-cluster config nor a local kubeconfig could be loaded.
    #[error("cluster config unavailable: {0}")]
    Config(String),

    /// Transport, auth, or API failure while listing pods.
    #[error("failed to list pods in namespace '{namespace}': {message}")]
    List { namespace: String, message: String },
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// List pods in `namespace` matching `label_selector`, any phase.
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<CandidatePod>, ClusterError>;
}

// ---------------------------------------------------------------------------
// kube-backed provider
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct KubeClusterProvider {
    client: kube::Client,
}

impl KubeClusterProvider {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// In-cluster config first, then the local kubeconfig.
    pub async fn connect() -> Result<Self, ClusterError> {
        let config = match kube::Config::incluster() {
            Ok(config) => {
                info!("loaded in-cluster Kubernetes config");
                config
            }
            Err(_) => {
                let config = kube::Config::from_kubeconfig(&KubeConfigOptions::default())
                    .await
                    .map_err(|e| ClusterError::Config(e.to_string()))?;
                info!("loaded local kubeconfig");
                config
            }
        };

        let client =
            kube::Client::try_from(config).map_err(|e| ClusterError::Config(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterProvider for KubeClusterProvider {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<CandidatePod>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| ClusterError::List {
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        Ok(pods.items.iter().map(candidate_from_pod).collect())
    }
}

/// Project a full `Pod` onto the handful of fields the engine reads.
pub fn candidate_from_pod(pod: &Pod) -> CandidatePod {
    let status = pod.status.as_ref();

    let phase = PodPhase::parse(status.and_then(|s| s.phase.as_deref()));

    let conditions = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conds| {
            conds
                .iter()
                .map(|c| PodCondition {
                    kind: c.type_.clone(),
                    status: c.status.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| ContainerEnv {
                    name: c.name.clone(),
                    env: c
                        .env
                        .as_ref()
                        .map(|env| {
                            env.iter()
                                .map(|e| EnvVar {
                                    name: e.name.clone(),
                                    value: e.value.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    CandidatePod {
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase,
        containers,
        conditions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(value: serde_json::Value) -> Pod {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_phase_env_and_conditions() {
        let p = pod(json!({
            "metadata": {"name": "kubeclaw-0"},
            "spec": {"containers": [
                {"name": "agent", "env": [
                    {"name": "KUBECLAW_POD_ID", "value": "abc123"},
                    {"name": "FROM_SECRET", "valueFrom": {"secretKeyRef": {"name": "s", "key": "k"}}}
                ]},
                {"name": "sidecar"}
            ]},
            "status": {
                "phase": "Running",
                "conditions": [{"type": "Ready", "status": "True"}]
            }
        }));

        let c = candidate_from_pod(&p);
        assert_eq!(c.name, "kubeclaw-0");
        assert_eq!(c.phase, PodPhase::Running);
        assert_eq!(c.containers.len(), 2);
        assert_eq!(c.containers[0].env[1].value, None);
        assert!(c.containers[1].env.is_empty());
        assert!(c.is_ready());
        assert_eq!(c.identity_tokens().collect::<Vec<_>>(), vec!["abc123"]);
    }

    #[test]
    fn missing_status_is_unknown_and_not_ready() {
        let p = pod(json!({
            "metadata": {"name": "fresh"},
            "spec": {"containers": [{"name": "agent"}]}
        }));
        let c = candidate_from_pod(&p);
        assert_eq!(c.phase, PodPhase::Unknown);
        assert!(!c.is_ready());
        assert!(!c.has_identity());
    }
}
