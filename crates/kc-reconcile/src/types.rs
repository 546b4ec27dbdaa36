use std::collections::BTreeSet;

use serde_json::Value;

/// A pending request whose description names a live identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairingMatch {
    pub request_id: String,
    pub identity: String,
}

impl PairingMatch {
    pub fn new(request_id: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            identity: identity.into(),
        }
    }
}

/// A pending request with no usable identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct MalformedRequest {
    /// Position in the pending list as returned by the gateway.
    pub index: usize,
    pub raw: Value,
}

/// A well-formed request whose description matches no identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnmatchedRequest {
    pub request_id: String,
    pub description: Option<String>,
}

/// Full correlation outcome. `matches` follows the order of the pending list.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CorrelationReport {
    pub matches: Vec<PairingMatch>,
    pub malformed: Vec<MalformedRequest>,
    pub unmatched: Vec<UnmatchedRequest>,
}

impl CorrelationReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Matches as a set, for order-insensitive comparison.
    pub fn match_set(&self) -> BTreeSet<PairingMatch> {
        self.matches.iter().cloned().collect()
    }
}
