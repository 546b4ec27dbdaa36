//! kc-gateway
//!
//! Client for the gateway's command-line interface.
//!
//! Three logical operations, each one external process invocation:
//!
//! | operation      | argv                         |
//! |----------------|------------------------------|
//! | list nodes     | `nodes list --json`          |
//! | list pending   | `nodes pending --json`       |
//! | approve        | `nodes approve <request-id>` |
//!
//! Failures never escape as panics. List operations return
//! `Err(GatewayError)` for every failure kind (missing binary, timeout,
//! non-zero exit, empty or malformed output), which callers treat as
//! "gateway unavailable". `approve` reports a plain `bool`.
//!
//! The client performs no retries; callers retry on their next pass.

pub mod client;
pub mod error;
pub mod normalizer;
pub mod runner;

pub use client::GatewayClient;
pub use error::GatewayError;
pub use normalizer::{normalize_list, parse_stdout, ListKind, ListShape};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
