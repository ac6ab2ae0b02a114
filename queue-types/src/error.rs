//! Error types for leadq data.

use thiserror::Error;

/// A draft that cannot enter the queue.
///
/// Raised before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Customer reference is blank.
    #[error("customer reference is required")]
    MissingCustomer,

    /// A line item has no SKU.
    #[error("item {index}: sku is required")]
    EmptySku {
        /// Position of the offending item.
        index: usize,
    },

    /// A line item has zero quantity.
    #[error("item {index}: quantity must be positive")]
    ZeroQuantity {
        /// Position of the offending item.
        index: usize,
    },

    /// A line item has a negative or non-finite price.
    #[error("item {index}: unit price must be a non-negative number")]
    InvalidUnitPrice {
        /// Position of the offending item.
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::ZeroQuantity { index: 2 };
        assert_eq!(err.to_string(), "item 2: quantity must be positive");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidationError>();
    }
}
