/// Every way a gateway invocation can fail.
///
/// `command` fields carry the rendered argv (e.g. `openclaw nodes list --json`)
/// for logging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("'{program}' CLI not found on PATH")]
    NotFound { program: String },

    #[error("timed out after {secs}s running: {command}")]
    Timeout { command: String, secs: u64 },

    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("{command} failed (rc={}): {stderr}", display_code(.code))]
    NonZeroExit {
        command: String,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
        stderr: String,
    },

    #[error("{command} produced no output")]
    EmptyOutput { command: String },

    #[error("failed to parse JSON from {command}: {preview}")]
    InvalidJson { command: String, preview: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_exit_display() {
        let err = GatewayError::NonZeroExit {
            command: "openclaw nodes pending --json".to_string(),
            code: Some(2),
            stderr: "gateway unreachable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "openclaw nodes pending --json failed (rc=2): gateway unreachable"
        );
    }

    #[test]
    fn signal_exit_display() {
        let err = GatewayError::NonZeroExit {
            command: "openclaw nodes list --json".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("rc=signal"));
    }
}
