use uuid::Uuid;

use crate::store::StoreError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================
//
// Validation errors and not-found conditions are distinct variants so the
// caller can map them to different outcomes. Storage failures pass through
// untouched via `Store` rather than being masked as business-rule failures.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid line item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Card payment requires a card number")]
    MissingCardNumber,

    #[error("Card number failed validation")]
    InvalidCardNumber,

    #[error("Identity must not be empty")]
    EmptyIdentity,

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Line item not found: {0}")]
    LineItemNotFound(Uuid),

    #[error("Product not found in catalog: {0}")]
    ProductNotFound(Uuid),

    #[error("Order {0} is not pending")]
    OrderNotPending(Uuid),

    #[error("Order {0} has no payable total")]
    ZeroTotal(Uuid),

    #[error("Identity is not allowed to manage order {0}")]
    Forbidden(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    /// True for errors caused by bad input rather than missing resources or
    /// backend trouble.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OrderError::InvalidQuantity(_)
                | OrderError::MissingCardNumber
                | OrderError::InvalidCardNumber
                | OrderError::EmptyIdentity
        )
    }
}
