use crate::workspace::{runtime, Workspace};
use anyhow::Context;
use std::path::Path;

/// Start the engine and keep it running until Ctrl-C.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(root)?;
    let purged = ws
        .store
        .purge_expired(chrono::Utc::now())
        .context("failed to purge expired store entries")?;
    if purged > 0 {
        tracing::info!(purged, "expired store entries removed");
    }

    runtime()?.block_on(async {
        ws.engine.start().await?;
        println!("Proactive engine running. Press Ctrl-C to stop.");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        ws.engine.stop();
        println!("Stopped.");
        anyhow::Ok(())
    })
}
