//! Show queue status.

use anyhow::Result;
use queue_client::ConnectivityMonitor;
use std::time::Duration;

use crate::config::Settings;

/// Run the status command.
pub async fn run(settings: &Settings) -> Result<()> {
    let queue = settings.open(false).await?;
    let drafts = queue.drafts().await?;
    let pending = drafts.iter().filter(|d| d.is_pending()).count();
    let failed = drafts.iter().filter(|d| d.last_error().is_some()).count();

    println!("=== leadq status ===");
    println!();
    println!("Queue:");
    println!("  Storage: {}", settings.storage_path().display());
    println!("  Drafts:  {}", drafts.len());
    println!("  Pending: {}", pending);
    println!("  Failed:  {}", failed);
    println!();

    // Wait for the first probe, bounded by the request timeout
    let wait = settings.queue.api.timeout() + Duration::from_secs(1);
    let probed = tokio::time::timeout(wait, queue.monitor().ready())
        .await
        .is_ok();

    println!("Connection:");
    if settings.mock {
        println!("  API:     mock");
    } else {
        println!("  API:     {}", settings.queue.api.leads_url());
    }
    let state = match (probed, queue.monitor().is_offline()) {
        (false, _) => "UNKNOWN (probe timed out)",
        (true, true) => "OFFLINE",
        (true, false) => "ONLINE",
    };
    println!("  Status:  {}", state);

    Ok(())
}
