use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use super::model::ConfirmationCode;
use crate::store::{CodeStore, StoreError};

// ============================================================================
// Confirmation-Code Issuer
// ============================================================================
//
// Per-code state machine: ISSUED --(first matching, fresh, unused
// validation)--> CONSUMED. Expired codes stay ISSUED in storage but can
// never validate again.
//
// Validation collapses "wrong code", "expired code" and "already used" into
// a single boolean so callers (and their callers) cannot tell which one
// happened. That ambiguity is a deliberate hardening choice, not an
// omission.
//
// ============================================================================

const CODE_DIGITS: usize = 6;

/// Freshness window measured from generation time.
const FRESHNESS_MINUTES: i64 = 10;

pub struct CodeIssuer {
    store: Arc<dyn CodeStore>,
}

impl CodeIssuer {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self { store }
    }

    pub fn freshness_window() -> Duration {
        Duration::minutes(FRESHNESS_MINUTES)
    }

    /// Generate and persist a fresh code for `identity`.
    ///
    /// Previously issued unused codes for the same identity are left alone:
    /// several may be concurrently valid (resend tolerance).
    pub async fn generate(&self, identity: &str) -> Result<ConfirmationCode, StoreError> {
        let code = random_code();
        let record = ConfirmationCode::new(identity, code);

        self.store.insert_code(&record).await?;

        tracing::info!(
            identity = identity,
            code_id = %record.id,
            "Confirmation code issued"
        );

        Ok(record)
    }

    /// Validate a submitted code for `identity`.
    ///
    /// The candidate is the most recently generated unused record matching
    /// identity and code within the freshness window; it is consumed with a
    /// conditional update so a replayed or concurrently submitted code can
    /// win at most once. Every non-success is `Ok(false)`; only backend
    /// failures surface as `Err`.
    pub async fn validate(&self, identity: &str, submitted: &str) -> Result<bool, StoreError> {
        let cutoff = Utc::now() - Self::freshness_window();

        let candidate = match self.store.latest_match(identity, submitted, cutoff).await? {
            Some(record) => record,
            None => {
                tracing::debug!(identity = identity, "Confirmation code rejected");
                return Ok(false);
            }
        };

        let consumed = self.store.consume(candidate.id).await?;

        if consumed {
            tracing::info!(
                identity = identity,
                code_id = %candidate.id,
                "Confirmation code consumed"
            );
        } else {
            // Lost the race against a concurrent submission of the same code.
            tracing::debug!(identity = identity, code_id = %candidate.id, "Confirmation code rejected");
        }

        Ok(consumed)
    }
}

/// Uniformly random 6-digit numeric string; leading zeros allowed.
fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn issuer_with_store() -> (CodeIssuer, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (CodeIssuer::new(store.clone()), store)
    }

    #[test]
    fn test_random_code_shape() {
        for _ in 0..100 {
            let code = random_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_generated_code_validates_once() {
        let (issuer, _store) = issuer_with_store();

        let code = issuer.generate("buyer@example.com").await.unwrap();
        assert!(!code.used);

        assert!(issuer.validate("buyer@example.com", &code.code).await.unwrap());
        // Replay of the same code must fail.
        assert!(!issuer.validate("buyer@example.com", &code.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_code_rejected() {
        let (issuer, _store) = issuer_with_store();

        let code = issuer.generate("buyer@example.com").await.unwrap();
        let wrong = if code.code == "000000" { "000001" } else { "000000" };

        assert!(!issuer.validate("buyer@example.com", wrong).await.unwrap());
        // The real code is still spendable after a failed attempt.
        assert!(issuer.validate("buyer@example.com", &code.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_identity_rejected() {
        let (issuer, _store) = issuer_with_store();

        let code = issuer.generate("buyer@example.com").await.unwrap();
        assert!(!issuer.validate("other@example.com", &code.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let (issuer, store) = issuer_with_store();

        let code = issuer.generate("buyer@example.com").await.unwrap();
        store.backdate_code(code.id, Duration::minutes(30));

        assert!(!issuer.validate("buyer@example.com", &code.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_just_inside_window_accepted() {
        let (issuer, store) = issuer_with_store();

        let code = issuer.generate("buyer@example.com").await.unwrap();
        store.backdate_code(code.id, Duration::minutes(9));

        assert!(issuer.validate("buyer@example.com", &code.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_multiple_outstanding_codes_coexist() {
        let (issuer, _store) = issuer_with_store();

        let first = issuer.generate("buyer@example.com").await.unwrap();
        let second = issuer.generate("buyer@example.com").await.unwrap();

        // Generating a second code does not invalidate the first.
        assert!(issuer.validate("buyer@example.com", &second.code).await.unwrap());
        if first.code != second.code {
            assert!(issuer.validate("buyer@example.com", &first.code).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_collision_consumes_most_recent_only() {
        let (issuer, store) = issuer_with_store();

        // Force a generation collision: two live records with the same code.
        let older = ConfirmationCode::new("buyer@example.com", "123456".to_string());
        let newer = ConfirmationCode::new("buyer@example.com", "123456".to_string());
        store.insert_code(&older).await.unwrap();
        store.insert_code(&newer).await.unwrap();
        store.backdate_code(older.id, Duration::minutes(2));

        assert!(issuer.validate("buyer@example.com", "123456").await.unwrap());

        // Only the most recent record was consumed; the older one survives.
        let codes = store.codes_for("buyer@example.com");
        let consumed: Vec<_> = codes.iter().filter(|c| c.used).collect();
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].id, newer.id);
    }
}
