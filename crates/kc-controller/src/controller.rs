//! Polling loop around [`reconcile_pass`].
//!
//! Each pass runs inside its own span with a fresh `pass_id`. Errors and
//! panics are caught at the pass boundary and logged; the loop always sleeps
//! the configured interval and starts the next pass.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use kc_cluster::ClusterProvider;
use kc_config::Settings;
use kc_gateway::{CommandRunner, GatewayClient};

use crate::pass::{reconcile_pass, PassReport};

/// How a single pass ended, from the loop's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassResult {
    Completed(PassReport),
    /// The pass returned an error (cluster listing failed).
    Failed(String),
    Panicked(String),
}

impl PassResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, PassResult::Completed(_))
    }
}

pub struct Controller<C, R> {
    cluster: C,
    gateway: GatewayClient<R>,
    namespace: String,
    label_selector: String,
    interval: Duration,
}

impl<C, R> Controller<C, R>
where
    C: ClusterProvider,
    R: CommandRunner,
{
    pub fn new(
        cluster: C,
        gateway: GatewayClient<R>,
        namespace: impl Into<String>,
        label_selector: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            cluster,
            gateway,
            namespace: namespace.into(),
            label_selector: label_selector.into(),
            interval,
        }
    }

    pub fn from_settings(cluster: C, gateway: GatewayClient<R>, settings: &Settings) -> Self {
        Self::new(
            cluster,
            gateway,
            settings.namespace.clone(),
            settings.label_selector.clone(),
            settings.poll_interval(),
        )
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn gateway(&self) -> &GatewayClient<R> {
        &self.gateway
    }

    /// Run exactly one pass with failure isolation.
    pub async fn run_once(&self) -> PassResult {
        let pass_id = Uuid::new_v4();
        let span = info_span!("reconcile_pass", %pass_id, namespace = %self.namespace);

        let pass = reconcile_pass(
            &self.cluster,
            &self.gateway,
            &self.namespace,
            &self.label_selector,
        );

        match AssertUnwindSafe(pass).catch_unwind().instrument(span).await {
            Ok(Ok(report)) => PassResult::Completed(report),
            Ok(Err(e)) => {
                error!(%pass_id, error = ?e, "error during reconciliation pass");
                PassResult::Failed(format!("{e:#}"))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(%pass_id, panic = %msg, "reconciliation pass panicked");
                PassResult::Panicked(msg)
            }
        }
    }

    /// Run passes until `shutdown` resolves. A pass in flight when shutdown
    /// is requested finishes first. Returns the number of passes run.
    pub async fn run<S>(&self, shutdown: S) -> u64
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut passes = 0u64;

        loop {
            self.run_once().await;
            passes += 1;

            tokio::select! {
                _ = &mut shutdown => {
                    info!(passes, "shutdown requested; stopping reconciliation loop");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        passes
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
