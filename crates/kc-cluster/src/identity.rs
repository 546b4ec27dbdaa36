//! Identity extraction.
//!
//! A token is valid only while some pending or running pod declares it.
//! Terminated pods (failed, succeeded) and pods in unknown phase never
//! contribute, even if their spec still carries a token.

use std::collections::BTreeSet;

use tracing::info;

use kc_schemas::CandidatePod;

use crate::{ClusterError, ClusterProvider};

/// Distinct, non-empty identity tokens of pods allowed to pair.
pub fn valid_identities(pods: &[CandidatePod]) -> BTreeSet<String> {
    pods.iter()
        .filter(|p| p.phase.may_pair())
        .flat_map(|p| p.identity_tokens())
        .map(str::to_string)
        .collect()
}

/// List pods and reduce them to valid identities.
///
/// Listing errors propagate: an API failure must not look like "no pods".
pub async fn extract_identities(
    provider: &dyn ClusterProvider,
    namespace: &str,
    label_selector: &str,
) -> Result<BTreeSet<String>, ClusterError> {
    let pods = provider.list_pods(namespace, label_selector).await?;
    let ids = valid_identities(&pods);
    info!(
        namespace,
        pods = pods.len(),
        identities = ids.len(),
        "found {} valid pod IDs in namespace {}",
        ids.len(),
        namespace
    );
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_schemas::{ContainerEnv, EnvVar, PodPhase, POD_ID_ENV_VAR};

    fn pod_with_tokens(phase: PodPhase, tokens: &[&str]) -> CandidatePod {
        let mut p = CandidatePod::new("p", phase);
        for t in tokens {
            p.containers.push(ContainerEnv {
                name: format!("c-{t}"),
                env: vec![EnvVar {
                    name: POD_ID_ENV_VAR.to_string(),
                    value: Some(t.to_string()),
                }],
            });
        }
        p
    }

    #[test]
    fn duplicates_collapse() {
        let pods = vec![
            pod_with_tokens(PodPhase::Running, &["a", "a"]),
            pod_with_tokens(PodPhase::Pending, &["a", "b"]),
        ];
        let ids = valid_identities(&pods);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn only_pending_and_running_contribute() {
        let pods = vec![
            pod_with_tokens(PodPhase::Failed, &["f"]),
            pod_with_tokens(PodPhase::Succeeded, &["s"]),
            pod_with_tokens(PodPhase::Unknown, &["u"]),
            pod_with_tokens(PodPhase::Running, &["r"]),
        ];
        let ids = valid_identities(&pods);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("r"));
    }

    #[test]
    fn empty_token_is_not_a_wildcard() {
        let pods = vec![pod_with_tokens(PodPhase::Running, &[""])];
        assert!(valid_identities(&pods).is_empty());
    }
}
