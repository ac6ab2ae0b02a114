//! Delete a draft.

use anyhow::{Context, Result};
use queue_client::DraftId;

use crate::config::Settings;

/// Run the delete command.
pub async fn run(settings: &Settings, id: DraftId) -> Result<()> {
    let queue = settings.open(false).await?;

    queue
        .delete_draft(id)
        .await
        .with_context(|| format!("Failed to delete draft {}", id))?;

    println!("Deleted draft {}", id);
    println!("  Pending: {}", queue.pending_count().await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_client::{CustomerRef, DraftInput};
    use tempfile::tempdir;

    #[tokio::test]
    async fn delete_removes_draft() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path(), None, true).unwrap();
        let id = {
            let queue = settings.open(false).await.unwrap();
            queue
                .create_draft(DraftInput::new(CustomerRef::named("Acme")))
                .await
                .unwrap()
                .id
        };

        run(&settings, id).await.unwrap();

        let queue = settings.open(false).await.unwrap();
        assert!(queue.drafts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_fails() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path(), None, true).unwrap();

        assert!(run(&settings, DraftId::new()).await.is_err());
    }
}
