// ============================================================================
// Order Domain - Ledger & Payment Lifecycle
// ============================================================================
//
// This module contains ALL order-specific code:
// - Value objects (PaymentMethod, PaymentStatus, CatalogProduct)
// - Records (Order, LineItem, PricedLineItem)
// - Errors (OrderError enum)
// - Line-item ledger (subtotal ownership)
// - Order manager (lifecycle orchestration + confirmation workflow)
//
// Persistence and catalog access go through the seams in `crate::store`.
//
// ============================================================================

pub mod errors;
pub mod ledger;
pub mod manager;
pub mod model;
pub mod value_objects;

// Re-export for convenience
pub use errors::*;
pub use ledger::*;
pub use manager::*;
pub use model::*;
pub use value_objects::*;
