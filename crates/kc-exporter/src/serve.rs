//! Ties the HTTP server task to the collection loop.

use std::future::Future;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Drive `collection` to completion, then wait for `server`.
///
/// If the server task ends first, for any reason, the collection loop is
/// dropped and an error is returned: a dead scrape endpoint must take the
/// process down with it.
pub async fn supervise<F>(
    collection: F,
    mut server: JoinHandle<std::io::Result<()>>,
) -> anyhow::Result<()>
where
    F: Future<Output = u64>,
{
    let early_exit = tokio::select! {
        cycles = collection => {
            info!(cycles, "collection loop stopped");
            None
        }
        res = &mut server => Some(res),
    };

    match early_exit {
        None => {
            server
                .await
                .context("server task failed")?
                .context("server crashed")?;
            Ok(())
        }
        Some(res) => {
            error!("metrics server stopped before shutdown was requested");
            res.context("server task failed")?
                .context("server crashed")?;
            anyhow::bail!("metrics server exited unexpectedly")
        }
    }
}
