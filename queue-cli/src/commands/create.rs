//! Capture a lead draft.

use anyhow::{bail, Result};
use queue_client::{CustomerRef, DraftInput, LineItem};

use crate::config::Settings;

/// Parse `SKU:QUANTITY:UNIT_PRICE`.
pub fn parse_item(raw: &str) -> Result<LineItem, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [sku, quantity, unit_price] = parts.as_slice() else {
        return Err(format!("expected SKU:QUANTITY:UNIT_PRICE, got '{}'", raw));
    };

    let quantity: u32 = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity '{}'", quantity))?;
    let unit_price: f64 = unit_price
        .trim()
        .parse()
        .map_err(|_| format!("invalid unit price '{}'", unit_price))?;

    Ok(LineItem::new(sku.trim(), quantity, unit_price))
}

/// Build the customer reference from the mutually exclusive flags.
pub fn customer(id: Option<String>, name: Option<String>) -> Result<CustomerRef> {
    match (id, name) {
        (Some(id), None) => Ok(CustomerRef::remote(id)),
        (None, Some(name)) => Ok(CustomerRef::named(name)),
        _ => bail!("Must specify exactly one of --customer-id or --customer-name"),
    }
}

/// Run the create command.
pub async fn run(settings: &Settings, customer: CustomerRef, items: Vec<LineItem>) -> Result<()> {
    let queue = settings.open(false).await?;

    let mut input = DraftInput::new(customer);
    for item in items {
        input = input.with_item(item);
    }

    let draft = queue.create_draft(input).await?;
    let pending = queue.pending_count().await?;

    println!("Created draft {}", draft.id);
    println!("  Items:   {}", draft.items.len());
    println!("  Total:   {:.2}", super::draft_total(&draft));
    println!("  Pending: {}", pending);

    Ok(())
}
