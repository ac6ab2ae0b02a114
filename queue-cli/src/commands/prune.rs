//! Remove synced drafts.

use anyhow::Result;

use crate::config::Settings;

/// Run the prune command.
pub async fn run(settings: &Settings) -> Result<()> {
    let queue = settings.open(false).await?;
    let removed = queue.prune_synced().await?;
    println!("Removed {} synced drafts", removed);
    Ok(())
}
