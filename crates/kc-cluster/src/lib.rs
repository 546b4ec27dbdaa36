//! kc-cluster
//!
//! Cluster side of the merge: list the labelled pods, derive the set of
//! identities allowed to pair, and count pods for the exporter.
//!
//! Nothing here is cached. Every call reflects the cluster as observed at
//! that moment, and listing errors are returned to the caller rather than
//! being turned into an empty result.

pub mod census;
pub mod identity;
pub mod provider;

pub use census::PodCensus;
pub use identity::{extract_identities, valid_identities};
pub use provider::{candidate_from_pod, ClusterError, ClusterProvider, KubeClusterProvider};
