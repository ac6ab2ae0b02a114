//! Keep the queue open and sync on reconnect.

use anyhow::Result;

use crate::config::Settings;

/// Run the watch command until interrupted.
pub async fn run(settings: &Settings) -> Result<()> {
    let queue = settings.open(true).await?;
    let mut snapshots = queue.subscribe();

    let initial = snapshots.borrow_and_update().clone();
    println!(
        "Watching {} ({} pending). Press Ctrl-C to stop.",
        settings.storage_path().display(),
        initial.pending_count
    );
    let mut last = (initial.pending_count, initial.is_offline);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                let current = (snap.pending_count, snap.is_offline);
                if current != last {
                    let state = if snap.is_offline { "offline" } else { "online" };
                    println!("{}: {} pending", state, snap.pending_count);
                    last = current;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping.");
                break;
            }
        }
    }

    queue.shutdown();
    Ok(())
}
