use std::collections::BTreeSet;

use kc_schemas::PendingRequest;

use crate::{CorrelationReport, MalformedRequest, PairingMatch, UnmatchedRequest};

/// Match every pending request against the identity set.
///
/// Output order follows `pending`; the result does not depend on the order
/// of `identities`.
pub fn correlate(identities: &BTreeSet<String>, pending: &[PendingRequest]) -> CorrelationReport {
    let mut report = CorrelationReport::empty();

    for (index, req) in pending.iter().enumerate() {
        let Some(request_id) = req.request_id.as_deref() else {
            report.malformed.push(MalformedRequest {
                index,
                raw: req.raw.clone(),
            });
            continue;
        };

        match req.description.as_deref() {
            Some(desc) if identities.contains(desc) => {
                report.matches.push(PairingMatch::new(request_id, desc));
            }
            _ => report.unmatched.push(UnmatchedRequest {
                request_id: request_id.to_string(),
                description: req.description.clone(),
            }),
        }
    }

    report
}
