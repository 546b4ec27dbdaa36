//! kc-testkit
//!
//! In-memory stand-ins for the two external collaborators plus pod builders.
//! Scenario tests in `kc-controller` and `kc-exporter` script a sequence of
//! cluster and gateway replies and then assert on the calls that were made.
//!
//! Replies are consumed front to back; the last scripted reply repeats.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use kc_cluster::{ClusterError, ClusterProvider};
use kc_gateway::{CommandOutput, CommandRunner, GatewayError};
use kc_schemas::{CandidatePod, ContainerEnv, EnvVar, PodCondition, PodPhase, POD_ID_ENV_VAR};

// ---------------------------------------------------------------------------
// Pod builder
// ---------------------------------------------------------------------------

pub struct PodBuilder {
    pod: CandidatePod,
}

pub fn pod(name: &str, phase: PodPhase) -> PodBuilder {
    PodBuilder {
        pod: CandidatePod::new(name, phase),
    }
}

impl PodBuilder {
    /// Add a container declaring `token` as its identity.
    pub fn identity(mut self, token: &str) -> Self {
        let idx = self.pod.containers.len();
        self.pod.containers.push(ContainerEnv {
            name: format!("container-{idx}"),
            env: vec![EnvVar {
                name: POD_ID_ENV_VAR.to_string(),
                value: Some(token.to_string()),
            }],
        });
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.pod.conditions.retain(|c| c.kind != "Ready");
        self.pod.conditions.push(PodCondition {
            kind: "Ready".to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
        });
        self
    }

    pub fn build(self) -> CandidatePod {
        self.pod
    }
}

// ---------------------------------------------------------------------------
// Cluster fake
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum ClusterReply {
    Pods(Vec<CandidatePod>),
    Error(ClusterError),
    /// Panic inside `list_pods`, standing in for an unexpected failure.
    Panic,
}

#[derive(Default)]
pub struct StaticCluster {
    replies: Mutex<VecDeque<ClusterReply>>,
    calls: AtomicUsize,
}

impl StaticCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pods(pods: Vec<CandidatePod>) -> Self {
        let c = Self::new();
        c.push(ClusterReply::Pods(pods));
        c
    }

    pub fn push(&self, reply: ClusterReply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_error(&self, message: &str) -> &Self {
        self.push(ClusterReply::Error(ClusterError::List {
            namespace: "test".to_string(),
            message: message.to_string(),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterProvider for StaticCluster {
    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<CandidatePod>, ClusterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = next_reply(&self.replies).unwrap_or(ClusterReply::Pods(Vec::new()));
        match reply {
            ClusterReply::Pods(pods) => Ok(pods),
            ClusterReply::Error(e) => Err(e),
            ClusterReply::Panic => panic!("scripted cluster panic"),
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway fake
// ---------------------------------------------------------------------------

pub type RunnerReply = Result<CommandOutput, GatewayError>;

/// Scripted [`CommandRunner`].
///
/// Replies are keyed by argv prefix: a script for `["nodes", "approve"]`
/// answers every `nodes approve <id>` call that has no more specific script.
/// Unscripted commands fail with `NotFound`.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<BTreeMap<String, VecDeque<RunnerReply>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, args: &[&str], reply: RunnerReply) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(args.join(" "))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_ok(&self, args: &[&str], stdout: &str) -> &Self {
        self.on(args, Ok(CommandOutput::ok(stdout)))
    }

    pub fn on_json(&self, args: &[&str], doc: serde_json::Value) -> &Self {
        self.on_ok(args, &doc.to_string())
    }

    pub fn on_exit(&self, args: &[&str], code: i32, stderr: &str) -> &Self {
        self.on(args, Ok(CommandOutput::failed(code, "", stderr)))
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose argv starts with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.len() >= prefix.len() && c.iter().zip(prefix).all(|(a, b)| a == b))
            .count()
    }

    /// Request ids passed to `nodes approve`, in call order.
    pub fn approved_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.len() == 3 && c[0] == "nodes" && c[1] == "approve")
            .map(|c| c[2].clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    fn program(&self) -> &str {
        "openclaw"
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());

        let mut scripts = self.scripts.lock().unwrap();
        for n in (1..=args.len()).rev() {
            if let Some(queue) = scripts.get_mut(&args[..n].join(" ")) {
                if queue.len() > 1 {
                    if let Some(reply) = queue.pop_front() {
                        return reply;
                    }
                } else if let Some(reply) = queue.front() {
                    return reply.clone();
                }
            }
        }

        Err(GatewayError::NotFound {
            program: "openclaw".to_string(),
        })
    }
}

fn next_reply<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut q = queue.lock().unwrap();
    if q.len() > 1 {
        q.pop_front()
    } else {
        q.front().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_reply_repeats() {
        let r = ScriptedRunner::new();
        r.on_ok(&["nodes", "list", "--json"], "[1]")
            .on_ok(&["nodes", "list", "--json"], "[2]");

        let a = r.run(&["nodes", "list", "--json"]).await.unwrap();
        let b = r.run(&["nodes", "list", "--json"]).await.unwrap();
        let c = r.run(&["nodes", "list", "--json"]).await.unwrap();
        assert_eq!(a.stdout, "[1]");
        assert_eq!(b.stdout, "[2]");
        assert_eq!(c.stdout, "[2]");
    }

    #[tokio::test]
    async fn prefix_script_answers_approvals() {
        let r = ScriptedRunner::new();
        r.on_ok(&["nodes", "approve"], "");
        assert!(r.run(&["nodes", "approve", "r9"]).await.unwrap().success);
        assert!(r.run(&["nodes", "pending", "--json"]).await.is_err());
        assert_eq!(r.approved_ids(), vec!["r9"]);
        assert_eq!(r.count(&["nodes"]), 2);
    }

    #[tokio::test]
    async fn cluster_replays_in_order() {
        let c = StaticCluster::new();
        c.push_error("boom")
            .push(ClusterReply::Pods(vec![pod("a", PodPhase::Running).build()]));
        assert!(c.list_pods("ns", "sel").await.is_err());
        assert_eq!(c.list_pods("ns", "sel").await.unwrap().len(), 1);
        assert_eq!(c.list_pods("ns", "sel").await.unwrap().len(), 1);
        assert_eq!(c.calls(), 3);
    }
}
