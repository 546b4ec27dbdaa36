//! kc-controller library target.
//!
//! Exposes the single-pass engine and the polling loop for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod controller;
pub mod pass;

pub use controller::{Controller, PassResult};
pub use pass::{reconcile_pass, PassOutcome, PassReport};
