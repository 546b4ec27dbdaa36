//! Response normalization for gateway list commands.
//!
//! The gateway has shipped several JSON shapes for the same list. This module
//! tries a fixed, ordered set of known shapes and falls back to an empty list
//! (reported as [`ListShape::Unrecognized`] so the caller can warn).
//!
//! Pure: no IO, no logging, no process handling.

use serde_json::Value;

use crate::GatewayError;

/// Longest stdout excerpt carried in an [`GatewayError::InvalidJson`].
pub(crate) const PREVIEW_CHARS: usize = 200;

/// Which list command produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `nodes list --json`
    Nodes,
    /// `nodes pending --json`
    Pending,
}

impl ListKind {
    /// Object keys that may wrap the array, in the order they are tried.
    pub fn wrapper_keys(&self) -> &'static [&'static str] {
        match self {
            ListKind::Nodes => &["nodes", "list"],
            ListKind::Pending => &["nodes", "requests"],
        }
    }

    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ListKind::Nodes => &["nodes", "list", "--json"],
            ListKind::Pending => &["nodes", "pending", "--json"],
        }
    }
}

/// Which known shape matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `[ ... ]`
    BareArray,
    /// `{ "<key>": [ ... ] }`
    Wrapped(&'static str),
    /// Anything else. Normalized to an empty list.
    Unrecognized,
}

/// Decode trimmed CLI stdout as JSON.
pub fn parse_stdout(command: &str, stdout: &str) -> Result<Value, GatewayError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::EmptyOutput {
            command: command.to_string(),
        });
    }
    serde_json::from_str(trimmed).map_err(|_| GatewayError::InvalidJson {
        command: command.to_string(),
        preview: trimmed.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// Reduce a list response to its items.
pub fn normalize_list(doc: Value, kind: ListKind) -> (ListShape, Vec<Value>) {
    match doc {
        Value::Array(items) => (ListShape::BareArray, items),
        Value::Object(mut map) => {
            for key in kind.wrapper_keys() {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return (ListShape::Wrapped(key), items);
                }
            }
            (ListShape::Unrecognized, Vec::new())
        }
        _ => (ListShape::Unrecognized, Vec::new()),
    }
}
