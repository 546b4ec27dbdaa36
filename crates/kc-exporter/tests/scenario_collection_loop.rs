use std::time::Duration;

use async_trait::async_trait;
use kc_cluster::{ClusterError, ClusterProvider};
use kc_exporter::collect::Collector;
use kc_exporter::metrics::{ErrorSource, ExporterMetrics};
use kc_gateway::GatewayClient;
use kc_schemas::{CandidatePod, PodPhase, LABEL_SELECTOR};
use kc_testkit::{pod, ClusterReply, ScriptedRunner, StaticCluster};
use prometheus::Registry;
use serde_json::json;

fn collector(
    cluster: StaticCluster,
    runner: ScriptedRunner,
) -> Collector<StaticCluster, ScriptedRunner> {
    Collector::new(
        cluster,
        GatewayClient::new(runner),
        ExporterMetrics::new(&Registry::new()).unwrap(),
        "ns",
        LABEL_SELECTOR,
        Duration::from_millis(5),
    )
}

#[tokio::test]
async fn gateway_and_cluster_are_collected_independently() {
    let cluster = StaticCluster::with_pods(vec![pod("a", PodPhase::Running)
        .identity("a")
        .ready(true)
        .build()]);
    // gateway binary missing
    let c = collector(cluster, ScriptedRunner::new());

    assert!(c.run_once().await);

    let snap = c.metrics().snapshot();
    assert_eq!(snap.gateway_up, 0);
    assert_eq!(snap.pods_total, 1);
    assert_eq!(snap.paired_nodes, 1);
    assert_eq!(c.metrics().errors(ErrorSource::GatewayNodes), 1);
    assert_eq!(c.metrics().errors(ErrorSource::Kubernetes), 0);
}

#[tokio::test]
async fn panicking_cycle_is_counted_and_loop_continues() {
    let cluster = StaticCluster::new();
    cluster
        .push(ClusterReply::Panic)
        .push(ClusterReply::Pods(vec![pod("a", PodPhase::Running).build()]));
    let runner = ScriptedRunner::new();
    runner
        .on_json(&["nodes", "list", "--json"], json!([]))
        .on_json(&["nodes", "pending", "--json"], json!([]));
    let c = collector(cluster, runner);

    let shutdown = async {
        while c.metrics().snapshot().pods_total == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    let cycles = tokio::time::timeout(Duration::from_secs(5), c.run(shutdown))
        .await
        .expect("loop should keep collecting after a panic");

    assert!(cycles >= 2);
    assert_eq!(c.metrics().errors(ErrorSource::CollectionLoop), 1);
    assert_eq!(c.metrics().snapshot().gateway_up, 1);
}

/// Takes `delay` to answer, then fails.
struct SlowFailingCluster {
    delay: Duration,
}

#[async_trait]
impl ClusterProvider for SlowFailingCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<CandidatePod>, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Err(ClusterError::List {
            namespace: namespace.to_string(),
            message: "apiserver timeout".to_string(),
        })
    }
}

#[tokio::test]
async fn duration_is_recorded_even_when_sources_fail() {
    let delay = Duration::from_millis(30);
    let c = Collector::new(
        SlowFailingCluster { delay },
        GatewayClient::new(ScriptedRunner::new()),
        ExporterMetrics::new(&Registry::new()).unwrap(),
        "ns",
        LABEL_SELECTOR,
        Duration::from_millis(5),
    );

    c.collect_all().await;

    let snap = c.metrics().snapshot();
    assert!(
        snap.scrape_duration_seconds >= delay.as_secs_f64(),
        "duration {} shorter than the cluster delay",
        snap.scrape_duration_seconds
    );
    assert_eq!(c.metrics().errors(ErrorSource::Kubernetes), 1);
    assert_eq!(c.metrics().errors(ErrorSource::GatewayNodes), 1);
}
