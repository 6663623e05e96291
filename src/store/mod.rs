// ============================================================================
// Persistence & Collaborator Seams
// ============================================================================
//
// The domain layer talks to storage, the product catalog, and the
// authorization policy exclusively through these traits. Two backends are
// provided: an in-memory one (tests, demo wiring) and a Postgres one.
//
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::confirmation::ConfirmationCode;
use crate::domain::order::{CatalogProduct, LineItem, Order};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryStore, StaticCatalog};
pub use postgres::PgStore;

/// Backend failure while touching a store. Deliberately separate from the
/// business-rule error taxonomy: callers must never see a storage outage as
/// a validation failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// CRUD surface for order rows.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Recompute the order total as the sum of its line-item subtotals and
    /// persist it, as one atomic unit of work. Returns the new total, or
    /// `None` if the order does not exist.
    async fn recalculate_total(&self, order_id: Uuid) -> Result<Option<Decimal>, StoreError>;

    /// Flip the order to `Paid`, conditional on it still being `Pending`.
    /// Returns whether a row was updated.
    async fn mark_paid(&self, order_id: Uuid) -> Result<bool, StoreError>;
}

/// CRUD surface for line-item rows.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    async fn insert_line_item(&self, item: &LineItem) -> Result<(), StoreError>;

    async fn fetch_line_item(&self, item_id: Uuid) -> Result<Option<LineItem>, StoreError>;

    /// Overwrite quantity and subtotal. Returns whether a row was affected.
    async fn update_line_item(
        &self,
        item_id: Uuid,
        quantity: i32,
        subtotal: Decimal,
    ) -> Result<bool, StoreError>;

    /// Returns whether the row existed.
    async fn delete_line_item(&self, item_id: Uuid) -> Result<bool, StoreError>;

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<LineItem>, StoreError>;
}

/// Storage for confirmation codes. Rows are append-only plus a single
/// conditional flag flip; codes are retained as an audit trail, never
/// deleted.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn insert_code(&self, code: &ConfirmationCode) -> Result<(), StoreError>;

    /// Most recently generated unused record for `identity` matching `code`
    /// with `generated_at >= cutoff`. Older matching records stay untouched.
    async fn latest_match(
        &self,
        identity: &str,
        code: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<ConfirmationCode>, StoreError>;

    /// Mark the record used, conditional on it still being unused. The
    /// condition is what makes concurrent submissions of the same code
    /// single-winner. Returns whether the flag was flipped by this call.
    async fn consume(&self, code_id: Uuid) -> Result<bool, StoreError>;
}

/// Read-only view of the product catalog. Owned by the (out-of-scope)
/// catalog subsystem; the ledger only prices against it.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, StoreError>;
}

/// Capability check injected into the order manager in place of ad-hoc role
/// string matching at every call site.
pub trait AccessPolicy: Send + Sync {
    fn can_manage(&self, identity: &str, order: &Order) -> bool;
}

/// Policy for deployments where the surrounding layer has already
/// authorized the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_manage(&self, _identity: &str, _order: &Order) -> bool {
        true
    }
}
