// ============================================================================
// Domain Layer
// ============================================================================

pub mod card;
pub mod confirmation;
pub mod order;
