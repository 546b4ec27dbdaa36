//! kc-reconcile
//!
//! Correlation of gateway pairing requests with cluster identities.
//!
//! - A request matches iff its description is byte-for-byte equal to a valid
//!   identity. No substring, prefix, trimming, or case folding.
//! - A request without an identifier is malformed and never matches.
//! - The empty string is never an identity, so it never matches either.
//!
//! Deterministic, pure logic. No IO. No gateway calls.

mod engine;
mod types;

pub use engine::correlate;
pub use types::*;
