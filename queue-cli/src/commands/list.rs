//! List stored drafts.

use anyhow::Result;
use queue_client::Draft;

use super::{describe_state, draft_total};
use crate::config::Settings;

/// Run the list command.
pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let queue = settings.open(false).await?;
    let drafts = queue.drafts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!("No drafts.");
        return Ok(());
    }

    for draft in &drafts {
        println!("{}", format_row(draft));
    }
    println!();
    println!(
        "{} drafts, {} pending",
        drafts.len(),
        drafts.iter().filter(|d| d.is_pending()).count()
    );

    Ok(())
}

fn format_row(draft: &Draft) -> String {
    let customer = match &draft.customer {
        queue_client::CustomerRef::Remote { id } => format!("#{}", id),
        queue_client::CustomerRef::Name { name } => name.clone(),
    };
    format!(
        "{}  {:<20}  {:>3} items  {:>10.2}  {}",
        draft.id,
        customer,
        draft.items.len(),
        draft_total(draft),
        describe_state(&draft.sync_state)
    )
}
