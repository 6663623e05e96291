use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{Catalog, CodeStore, LineItemStore, OrderStore, StoreError};
use crate::domain::confirmation::ConfirmationCode;
use crate::domain::order::{CatalogProduct, LineItem, Order, PaymentStatus};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Backs all store traits with a single mutex-guarded table set, which makes
// every operation (including recalculate_total's read-sum-write) atomic.
// Used by the test suite and the demo wiring; Postgres is the production
// backend.
//
// ============================================================================

#[derive(Default)]
struct Tables {
    orders: HashMap<Uuid, Order>,
    line_items: HashMap<Uuid, LineItem>,
    codes: Vec<ConfirmationCode>,
    products: HashMap<Uuid, CatalogProduct>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put_product(&self, product_id: Uuid, product: CatalogProduct) {
        self.lock().products.insert(product_id, product);
    }

    pub fn remove_product(&self, product_id: Uuid) {
        self.lock().products.remove(&product_id);
    }

    /// Shift a stored code's generation timestamp into the past. Test
    /// support for the freshness-window properties.
    pub fn backdate_code(&self, code_id: Uuid, by: Duration) {
        let mut tables = self.lock();
        if let Some(code) = tables.codes.iter_mut().find(|c| c.id == code_id) {
            code.generated_at = code.generated_at - by;
        }
    }

    /// All stored codes for an identity, in generation order.
    pub fn codes_for(&self, identity: &str) -> Vec<ConfirmationCode> {
        self.lock()
            .codes
            .iter()
            .filter(|c| c.identity == identity)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.lock().orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(&order_id).cloned())
    }

    async fn recalculate_total(&self, order_id: Uuid) -> Result<Option<Decimal>, StoreError> {
        let mut tables = self.lock();

        let total: Decimal = tables
            .line_items
            .values()
            .filter(|item| item.order_id == order_id)
            .map(|item| item.subtotal)
            .sum();

        match tables.orders.get_mut(&order_id) {
            Some(order) => {
                order.total = total;
                Ok(Some(total))
            }
            None => Ok(None),
        }
    }

    async fn mark_paid(&self, order_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.orders.get_mut(&order_id) {
            Some(order) if order.payment_status == PaymentStatus::Pending => {
                order.payment_status = PaymentStatus::Paid;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl LineItemStore for InMemoryStore {
    async fn insert_line_item(&self, item: &LineItem) -> Result<(), StoreError> {
        self.lock().line_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn fetch_line_item(&self, item_id: Uuid) -> Result<Option<LineItem>, StoreError> {
        Ok(self.lock().line_items.get(&item_id).cloned())
    }

    async fn update_line_item(
        &self,
        item_id: Uuid,
        quantity: i32,
        subtotal: Decimal,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.line_items.get_mut(&item_id) {
            Some(item) => {
                item.quantity = quantity;
                item.subtotal = subtotal;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_line_item(&self, item_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock().line_items.remove(&item_id).is_some())
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<LineItem>, StoreError> {
        Ok(self
            .lock()
            .line_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CodeStore for InMemoryStore {
    async fn insert_code(&self, code: &ConfirmationCode) -> Result<(), StoreError> {
        self.lock().codes.push(code.clone());
        Ok(())
    }

    async fn latest_match(
        &self,
        identity: &str,
        code: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<ConfirmationCode>, StoreError> {
        // Later insertion wins a generated_at tie, matching the Postgres
        // ORDER BY generated_at DESC behavior closely enough for tests.
        let tables = self.lock();
        let mut best: Option<&ConfirmationCode> = None;
        for candidate in tables.codes.iter().filter(|c| {
            c.identity == identity && c.code == code && !c.used && c.generated_at >= cutoff
        }) {
            match best {
                Some(current) if candidate.generated_at < current.generated_at => {}
                _ => best = Some(candidate),
            }
        }
        Ok(best.cloned())
    }

    async fn consume(&self, code_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.codes.iter_mut().find(|c| c.id == code_id) {
            Some(code) if !code.used => {
                code.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, StoreError> {
        Ok(self.lock().products.get(&product_id).cloned())
    }
}

/// Fixed catalog built once at wiring time. Stands in for the (out-of-scope)
/// catalog subsystem when running against Postgres.
pub struct StaticCatalog {
    products: HashMap<Uuid, CatalogProduct>,
}

impl StaticCatalog {
    pub fn new(products: impl IntoIterator<Item = (Uuid, CatalogProduct)>) -> Self {
        Self {
            products: products.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn product(&self, product_id: Uuid) -> Result<Option<CatalogProduct>, StoreError> {
        Ok(self.products.get(&product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::PaymentMethod;

    #[tokio::test]
    async fn test_mark_paid_is_conditional() {
        let store = InMemoryStore::new();
        let order = Order::new(Uuid::new_v4(), PaymentMethod::Cash, None);
        store.insert_order(&order).await.unwrap();

        assert!(store.mark_paid(order.id).await.unwrap());
        // Second flip must report no effect.
        assert!(!store.mark_paid(order.id).await.unwrap());
        assert!(!store.mark_paid(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_is_conditional() {
        let store = InMemoryStore::new();
        let code = ConfirmationCode::new("a@b.c", "123456".to_string());
        store.insert_code(&code).await.unwrap();

        assert!(store.consume(code.id).await.unwrap());
        assert!(!store.consume(code.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_recalculate_total_sums_only_own_items() {
        let store = InMemoryStore::new();
        let order = Order::new(Uuid::new_v4(), PaymentMethod::Cash, None);
        let other = Order::new(Uuid::new_v4(), PaymentMethod::Cash, None);
        store.insert_order(&order).await.unwrap();
        store.insert_order(&other).await.unwrap();

        store
            .insert_line_item(&LineItem::new(order.id, Uuid::new_v4(), 2, Decimal::from(20)))
            .await
            .unwrap();
        store
            .insert_line_item(&LineItem::new(other.id, Uuid::new_v4(), 1, Decimal::from(99)))
            .await
            .unwrap();

        let total = store.recalculate_total(order.id).await.unwrap().unwrap();
        assert_eq!(total, Decimal::from(20));
        assert_eq!(
            store.fetch_order(order.id).await.unwrap().unwrap().total,
            Decimal::from(20)
        );
    }

    #[tokio::test]
    async fn test_recalculate_total_empty_order_is_zero() {
        let store = InMemoryStore::new();
        let order = Order::new(Uuid::new_v4(), PaymentMethod::Cash, None);
        store.insert_order(&order).await.unwrap();

        let total = store.recalculate_total(order.id).await.unwrap().unwrap();
        assert_eq!(total, Decimal::ZERO);
    }
}
