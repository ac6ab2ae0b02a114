//! Draft input validation.

use queue_types::{CustomerRef, DraftInput, ValidationError};

/// Check that input may enter the queue.
///
/// An empty item list is allowed; a draft may be captured before any
/// products are chosen.
pub fn validate_input(input: &DraftInput) -> Result<(), ValidationError> {
    let customer = match &input.customer {
        CustomerRef::Remote { id } => id,
        CustomerRef::Name { name } => name,
    };
    if customer.trim().is_empty() {
        return Err(ValidationError::MissingCustomer);
    }

    for (index, item) in input.items.iter().enumerate() {
        if item.sku.trim().is_empty() {
            return Err(ValidationError::EmptySku { index });
        }
        if item.quantity == 0 {
            return Err(ValidationError::ZeroQuantity { index });
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(ValidationError::InvalidUnitPrice { index });
        }
    }

    Ok(())
}
