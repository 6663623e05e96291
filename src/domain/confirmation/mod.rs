// ============================================================================
// Confirmation Subsystem - One-Time Payment Codes
// ============================================================================
//
// Issues and validates the short-lived single-use codes that gate the
// PENDING -> PAID transition. Knows nothing about orders; it only proves
// control of an identity and reports success back to the order manager.
//
// ============================================================================

pub mod issuer;
pub mod model;

pub use issuer::CodeIssuer;
pub use model::ConfirmationCode;
