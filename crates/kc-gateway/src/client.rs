//! Typed gateway operations over a [`CommandRunner`].

use tracing::{error, warn};

use kc_schemas::{PendingRequest, RegisteredNode};

use crate::normalizer::{normalize_list, parse_stdout, ListKind, ListShape};
use crate::runner::render_command;
use crate::{CommandRunner, GatewayError};

#[derive(Debug, Clone)]
pub struct GatewayClient<R> {
    runner: R,
}

impl<R: CommandRunner> GatewayClient<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// `nodes list --json`
    pub async fn list_nodes(&self) -> Result<Vec<RegisteredNode>, GatewayError> {
        let items = self.fetch_list(ListKind::Nodes).await?;
        Ok(items.into_iter().map(RegisteredNode::from_value).collect())
    }

    /// `nodes pending --json`
    pub async fn list_pending(&self) -> Result<Vec<PendingRequest>, GatewayError> {
        let items = self.fetch_list(ListKind::Pending).await?;
        Ok(items.into_iter().map(PendingRequest::from_value).collect())
    }

    /// `nodes approve <id>`. `true` only on a zero exit status.
    ///
    /// Approving an id the gateway no longer knows is just a failed call;
    /// nothing is recorded locally either way.
    pub async fn approve(&self, request_id: &str) -> bool {
        let args = ["nodes", "approve", request_id];
        match self.runner.run(&args).await {
            Ok(out) if out.success => true,
            Ok(out) => {
                error!(
                    request_id,
                    code = ?out.code,
                    stderr = out.stderr.trim(),
                    "approve failed for {request_id}"
                );
                false
            }
            Err(e) => {
                error!(request_id, error = %e, "failed to approve request {request_id}");
                false
            }
        }
    }

    async fn fetch_list(&self, kind: ListKind) -> Result<Vec<serde_json::Value>, GatewayError> {
        let args = kind.args();
        let command = render_command(self.runner.program(), args);

        let result = self.run_json(&command, args).await;
        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                log_failure(&e);
                return Err(e);
            }
        };

        let (shape, items) = normalize_list(doc, kind);
        if shape == ListShape::Unrecognized {
            warn!(command = %command, "unexpected JSON structure from {command}; treating as empty");
        }
        Ok(items)
    }

    async fn run_json(
        &self,
        command: &str,
        args: &[&str],
    ) -> Result<serde_json::Value, GatewayError> {
        let out = self.runner.run(args).await?;
        if !out.success {
            return Err(GatewayError::NonZeroExit {
                command: command.to_string(),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        parse_stdout(command, &out.stdout)
    }
}

fn log_failure(e: &GatewayError) {
    match e {
        GatewayError::NonZeroExit { .. } => warn!(error = %e, "gateway command failed"),
        _ => error!(error = %e, "gateway command failed"),
    }
}
