use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Confirmation Code Record
// ============================================================================

/// A one-time numeric credential tied to an identity (email).
///
/// Rows are never deleted; a code past its freshness window simply stays
/// unused forever, which keeps the full audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationCode {
    pub id: Uuid,
    pub identity: String,
    pub code: String,
    pub generated_at: DateTime<Utc>,
    pub used: bool,
}

impl ConfirmationCode {
    pub fn new(identity: impl Into<String>, code: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            code,
            generated_at: Utc::now(),
            used: false,
        }
    }
}
