//! Process boundary.
//!
//! [`CommandRunner`] is the seam between the gateway client and the operating
//! system. [`ProcessRunner`] spawns the real binary; tests substitute a
//! scripted runner.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::normalizer::PREVIEW_CHARS;
use crate::GatewayError;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Program name used when rendering commands for logs.
    fn program(&self) -> &str;

    /// Run the program with `args`. `Err` only for failures to start or finish
    /// (missing binary, spawn failure, timeout); a non-zero exit is `Ok` with
    /// `success == false`.
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GatewayError>;
}

/// Spawns `program` as a child process with a hard timeout.
///
/// The child is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn render(&self, args: &[&str]) -> String {
        render_command(&self.program, args)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GatewayError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Err(_) => {
                return Err(GatewayError::Timeout {
                    command: self.render(args),
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::NotFound {
                    program: self.program.clone(),
                })
            }
            Ok(Err(e)) => {
                return Err(GatewayError::Spawn {
                    command: self.render(args),
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        // stdout feeds identity matching, so it must decode exactly; stderr is
        // only ever logged.
        let stdout = String::from_utf8(output.stdout).map_err(|e| GatewayError::InvalidJson {
            command: self.render(args),
            preview: String::from_utf8_lossy(e.as_bytes())
                .chars()
                .take(PREVIEW_CHARS)
                .collect(),
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `program arg1 arg2 ...` for log lines and error values.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut s = program.to_string();
    for a in args {
        s.push(' ');
        s.push_str(a);
    }
    s
}
