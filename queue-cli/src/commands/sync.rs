//! Synchronize drafts with the server.

use anyhow::{bail, Result};
use queue_client::{DraftId, SyncResult};

use super::describe_result;
use crate::config::Settings;

/// Sync one draft.
pub async fn one(settings: &Settings, id: DraftId) -> Result<()> {
    let queue = settings.open(false).await?;
    let result = queue.sync_draft(id).await?;
    report(&[result])
}

/// Sync every pending draft, oldest first.
pub async fn all(settings: &Settings) -> Result<()> {
    let queue = settings.open(false).await?;
    let results = queue.sync_all().await?;

    if results.is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }
    report(&results)?;
    println!("  Pending: {}", queue.pending_count().await?);
    Ok(())
}

/// Print results; fail if any draft did not sync.
fn report(results: &[SyncResult]) -> Result<()> {
    for result in results {
        println!("{}", describe_result(result));
    }

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        bail!("{} of {} drafts failed to sync", failed, results.len());
    }
    Ok(())
}
