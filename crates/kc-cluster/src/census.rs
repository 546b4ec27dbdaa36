//! Cluster-side counts for the exporter.

use kc_schemas::{CandidatePod, PodPhase};

/// Per-cycle pod counts. Rebuilt from scratch on every scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PodCensus {
    pub total: u64,
    pub running: u64,
    pub pending: u64,
    pub failed: u64,
    pub succeeded: u64,
    pub unknown: u64,
    /// Pods whose `Ready` condition is `True`, any phase.
    pub ready: u64,
    /// Running, ready, and carrying an identity token.
    pub paired: u64,
}

impl PodCensus {
    pub fn from_pods(pods: &[CandidatePod]) -> Self {
        let mut c = PodCensus {
            total: pods.len() as u64,
            ..PodCensus::default()
        };

        for pod in pods {
            match pod.phase {
                PodPhase::Running => c.running += 1,
                PodPhase::Pending => c.pending += 1,
                PodPhase::Failed => c.failed += 1,
                PodPhase::Succeeded => c.succeeded += 1,
                PodPhase::Unknown => c.unknown += 1,
            }

            let ready = pod.is_ready();
            if ready {
                c.ready += 1;
            }
            if pod.phase == PodPhase::Running && ready && pod.has_identity() {
                c.paired += 1;
            }
        }

        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_census_is_all_zero() {
        assert_eq!(PodCensus::from_pods(&[]), PodCensus::default());
    }

    #[test]
    fn phases_sum_to_total() {
        let pods = vec![
            CandidatePod::new("a", PodPhase::Running),
            CandidatePod::new("b", PodPhase::Pending),
            CandidatePod::new("c", PodPhase::Failed),
            CandidatePod::new("d", PodPhase::Succeeded),
            CandidatePod::new("e", PodPhase::Unknown),
        ];
        let c = PodCensus::from_pods(&pods);
        assert_eq!(c.total, 5);
        assert_eq!(
            c.running + c.pending + c.failed + c.succeeded + c.unknown,
            c.total
        );
        assert_eq!(c.ready, 0);
        assert_eq!(c.paired, 0);
    }
}
