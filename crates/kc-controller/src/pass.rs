//! One reconciliation pass.
//!
//! extract identities -> fetch pending -> correlate -> approve
//!
//! The pass keeps no state between calls. Whatever fails to approve stays in
//! the gateway's pending list and is picked up again by the next pass.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use kc_cluster::{extract_identities, ClusterProvider};
use kc_gateway::{CommandRunner, GatewayClient};
use kc_reconcile::correlate;

/// Longest description excerpt written to debug logs.
const DESCRIPTION_LOG_CHARS: usize = 50;

/// Where a pass stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// No pending/running pod declares an identity; nothing to do yet.
    NoIdentities,
    /// `nodes pending` failed; treated the same as "nothing pending".
    GatewayUnavailable,
    NoPending,
    /// Correlation ran and every match was attempted.
    Processed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub identities: usize,
    pub pending: usize,
    pub malformed: usize,
    /// Request ids approved this pass, in attempt order.
    pub approved: Vec<String>,
    /// Request ids whose approval failed this pass.
    pub failed: Vec<String>,
}

impl PassReport {
    fn stopped(outcome: PassOutcome, identities: usize) -> Self {
        Self {
            outcome,
            identities,
            pending: 0,
            malformed: 0,
            approved: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Run a single pass.
///
/// Only a cluster listing failure is returned as `Err`; gateway trouble is
/// absorbed into the report.
pub async fn reconcile_pass<R: CommandRunner>(
    cluster: &dyn ClusterProvider,
    gateway: &GatewayClient<R>,
    namespace: &str,
    label_selector: &str,
) -> Result<PassReport> {
    let identities = extract_identities(cluster, namespace, label_selector)
        .await
        .context("listing pairing pods")?;
    if identities.is_empty() {
        debug!("no valid pod IDs found, skipping approval check");
        return Ok(PassReport::stopped(PassOutcome::NoIdentities, 0));
    }

    let pending = match gateway.list_pending().await {
        Ok(pending) => pending,
        Err(_) => {
            return Ok(PassReport::stopped(
                PassOutcome::GatewayUnavailable,
                identities.len(),
            ))
        }
    };
    if pending.is_empty() {
        debug!("no pending requests");
        return Ok(PassReport::stopped(PassOutcome::NoPending, identities.len()));
    }

    info!(
        pending = pending.len(),
        identities = identities.len(),
        "processing {} pending request(s) against {} pod ID(s)",
        pending.len(),
        identities.len()
    );

    let correlation = correlate(&identities, &pending);

    for m in &correlation.malformed {
        warn!(index = m.index, raw = %m.raw, "pending request missing an ID field");
    }
    for u in &correlation.unmatched {
        let excerpt: String = u
            .description
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(DESCRIPTION_LOG_CHARS)
            .collect();
        debug!(
            request_id = %u.request_id,
            "request {} description '{}' does not match any pod ID",
            u.request_id,
            excerpt
        );
    }

    let mut report = PassReport {
        outcome: PassOutcome::Processed,
        identities: identities.len(),
        pending: pending.len(),
        malformed: correlation.malformed.len(),
        approved: Vec::new(),
        failed: Vec::new(),
    };

    // One attempt per request id per pass, even if the gateway lists it twice.
    let mut attempted: BTreeSet<&str> = BTreeSet::new();
    for m in &correlation.matches {
        if !attempted.insert(m.request_id.as_str()) {
            continue;
        }

        info!(
            request_id = %m.request_id,
            pod_id = %m.identity,
            "auto-approving request {} (pod ID: {})",
            m.request_id,
            m.identity
        );
        if gateway.approve(&m.request_id).await {
            info!(request_id = %m.request_id, "approved request {}", m.request_id);
            report.approved.push(m.request_id.clone());
        } else {
            warn!(request_id = %m.request_id, "failed to approve request {}", m.request_id);
            report.failed.push(m.request_id.clone());
        }
    }

    Ok(report)
}
