//! Identity extraction against a provider.
//!
//! - failed / succeeded pods never contribute a token, even when declared
//! - a listing error is returned, never flattened into an empty set

use std::sync::Mutex;

use async_trait::async_trait;
use kc_cluster::{extract_identities, ClusterError, ClusterProvider};
use kc_schemas::{CandidatePod, ContainerEnv, EnvVar, PodPhase, LABEL_SELECTOR, POD_ID_ENV_VAR};

struct OneShotProvider {
    result: Mutex<Option<Result<Vec<CandidatePod>, ClusterError>>>,
    seen: Mutex<Vec<(String, String)>>,
}

impl OneShotProvider {
    fn new(result: Result<Vec<CandidatePod>, ClusterError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClusterProvider for OneShotProvider {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<CandidatePod>, ClusterError> {
        self.seen
            .lock()
            .unwrap()
            .push((namespace.to_string(), label_selector.to_string()));
        self.result.lock().unwrap().take().unwrap_or(Ok(Vec::new()))
    }
}

fn pod(name: &str, phase: PodPhase, token: &str) -> CandidatePod {
    let mut p = CandidatePod::new(name, phase);
    p.containers.push(ContainerEnv {
        name: "agent".to_string(),
        env: vec![EnvVar {
            name: POD_ID_ENV_VAR.to_string(),
            value: Some(token.to_string()),
        }],
    });
    p
}

#[tokio::test]
async fn terminated_pods_contribute_no_identity() {
    let provider = OneShotProvider::new(Ok(vec![
        pod("done", PodPhase::Succeeded, "tok-done"),
        pod("dead", PodPhase::Failed, "tok-dead"),
        pod("live", PodPhase::Running, "tok-live"),
        pod("boot", PodPhase::Pending, "tok-boot"),
    ]));

    let ids = extract_identities(&provider, "kc", LABEL_SELECTOR).await.unwrap();

    assert!(ids.contains("tok-live"));
    assert!(ids.contains("tok-boot"));
    assert!(!ids.contains("tok-done"));
    assert!(!ids.contains("tok-dead"));

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[("kc".to_string(), LABEL_SELECTOR.to_string())]);
}

#[tokio::test]
async fn listing_error_propagates() {
    let provider = OneShotProvider::new(Err(ClusterError::List {
        namespace: "kc".to_string(),
        message: "connection refused".to_string(),
    }));

    let err = extract_identities(&provider, "kc", LABEL_SELECTOR)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}
