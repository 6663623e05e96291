use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::errors::OrderError;
use super::model::{LineItem, PricedLineItem};
use crate::store::{Catalog, LineItemStore};

// ============================================================================
// Line-Item Ledger
// ============================================================================
//
// Owns line-item rows and their derived subtotals. Pricing always reads the
// *current* catalog unit price, including on quantity updates (the price is
// not frozen at add time). The ledger never touches the parent order's
// total; restoring that invariant is the order manager's follow-up step.
//
// ============================================================================

pub struct LineItemLedger {
    items: Arc<dyn LineItemStore>,
    catalog: Arc<dyn Catalog>,
}

impl LineItemLedger {
    pub fn new(items: Arc<dyn LineItemStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { items, catalog }
    }

    fn validate_quantity(quantity: i32) -> Result<(), OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        Ok(())
    }

    async fn unit_price(&self, product_id: Uuid) -> Result<Decimal, OrderError> {
        match self.catalog.product(product_id).await? {
            Some(product) => Ok(product.unit_price),
            None => {
                tracing::warn!(product_id = %product_id, "Product missing from catalog");
                Err(OrderError::ProductNotFound(product_id))
            }
        }
    }

    /// Add a product line to an order.
    ///
    /// Quantity is validated before any store call; a product absent from
    /// the catalog is a typed error rather than a silent zero price.
    pub async fn add(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, OrderError> {
        Self::validate_quantity(quantity)?;

        let unit_price = self.unit_price(product_id).await?;
        let subtotal = unit_price * Decimal::from(quantity);
        let item = LineItem::new(order_id, product_id, quantity, subtotal);

        self.items.insert_line_item(&item).await?;

        tracing::debug!(
            order_id = %order_id,
            line_item_id = %item.id,
            quantity = quantity,
            subtotal = %subtotal,
            "Line item added"
        );

        Ok(item)
    }

    /// Change a line item's quantity, repricing against the current catalog.
    ///
    /// Returns `Ok(false)` when the line item does not exist.
    pub async fn update_quantity(
        &self,
        line_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool, OrderError> {
        Self::validate_quantity(quantity)?;

        let item = match self.items.fetch_line_item(line_item_id).await? {
            Some(item) => item,
            None => return Ok(false),
        };

        let unit_price = self.unit_price(item.product_id).await?;
        let subtotal = unit_price * Decimal::from(quantity);

        let affected = self
            .items
            .update_line_item(line_item_id, quantity, subtotal)
            .await?;

        if affected {
            tracing::debug!(
                line_item_id = %line_item_id,
                quantity = quantity,
                subtotal = %subtotal,
                "Line item updated"
            );
        }

        Ok(affected)
    }

    /// Delete a line item. Returns whether it existed.
    pub async fn remove(&self, line_item_id: Uuid) -> Result<bool, OrderError> {
        let existed = self.items.delete_line_item(line_item_id).await?;
        if existed {
            tracing::debug!(line_item_id = %line_item_id, "Line item removed");
        }
        Ok(existed)
    }

    pub async fn fetch(&self, line_item_id: Uuid) -> Result<Option<LineItem>, OrderError> {
        Ok(self.items.fetch_line_item(line_item_id).await?)
    }

    /// All line items for an order, enriched with product display name and
    /// current unit price. A product that has since vanished from the
    /// catalog does not fail the listing; its name falls back to the id.
    pub async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<PricedLineItem>, OrderError> {
        let items = self.items.list_by_order(order_id).await?;

        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            let product = self.catalog.product(item.product_id).await?;
            let (product_name, current_unit_price) = match product {
                Some(p) => (p.name, Some(p.unit_price)),
                None => (item.product_id.to_string(), None),
            };
            priced.push(PricedLineItem {
                item,
                product_name,
                current_unit_price,
            });
        }

        Ok(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CatalogProduct;
    use crate::store::InMemoryStore;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn ledger_with_product(price: Decimal) -> (LineItemLedger, Arc<InMemoryStore>, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let product_id = Uuid::new_v4();
        store.put_product(
            product_id,
            CatalogProduct {
                name: "Widget".to_string(),
                unit_price: price,
            },
        );
        let ledger = LineItemLedger::new(store.clone(), store.clone());
        (ledger, store, product_id)
    }

    #[tokio::test]
    async fn test_add_computes_subtotal() {
        let (ledger, _store, product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();

        let item = ledger.add(order_id, product_id, 3).await.unwrap();

        assert_eq!(item.quantity, 3);
        assert_eq!(item.subtotal, dec(30));
        assert_eq!(item.order_id, order_id);
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let (ledger, store, product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();

        for qty in [0, -1, -100] {
            let err = ledger.add(order_id, product_id, qty).await.unwrap_err();
            assert!(matches!(err, OrderError::InvalidQuantity(q) if q == qty));
        }

        // No side effects on validation failure.
        assert!(store.list_by_order(order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_typed_error() {
        let (ledger, store, _product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();
        let ghost = Uuid::new_v4();

        let err = ledger.add(order_id, ghost, 1).await.unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound(id) if id == ghost));
        assert!(store.list_by_order(order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_reprices_at_current_price() {
        let (ledger, store, product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();

        let item = ledger.add(order_id, product_id, 2).await.unwrap();
        assert_eq!(item.subtotal, dec(20));

        // Catalog price changes after the line was added.
        store.put_product(
            product_id,
            CatalogProduct {
                name: "Widget".to_string(),
                unit_price: dec(12),
            },
        );

        assert!(ledger.update_quantity(item.id, 3).await.unwrap());

        let updated = ledger.fetch(item.id).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.subtotal, dec(36));
    }

    #[tokio::test]
    async fn test_update_missing_item_returns_false() {
        let (ledger, _store, _product_id) = ledger_with_product(dec(10));
        assert!(!ledger.update_quantity(Uuid::new_v4(), 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_rejects_non_positive_quantity_without_mutation() {
        let (ledger, _store, product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();

        let item = ledger.add(order_id, product_id, 2).await.unwrap();

        let err = ledger.update_quantity(item.id, 0).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity(0)));

        let unchanged = ledger.fetch(item.id).await.unwrap().unwrap();
        assert_eq!(unchanged.quantity, 2);
        assert_eq!(unchanged.subtotal, dec(20));
    }

    #[tokio::test]
    async fn test_remove() {
        let (ledger, _store, product_id) = ledger_with_product(dec(10));
        let order_id = Uuid::new_v4();

        let item = ledger.add(order_id, product_id, 1).await.unwrap();

        assert!(ledger.remove(item.id).await.unwrap());
        assert!(!ledger.remove(item.id).await.unwrap());
        assert!(ledger.fetch(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_enriches_with_catalog_data() {
        let (ledger, _store, product_id) = ledger_with_product(dec(15));
        let order_id = Uuid::new_v4();

        ledger.add(order_id, product_id, 2).await.unwrap();

        let listed = ledger.list_by_order(order_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_name, "Widget");
        assert_eq!(listed[0].current_unit_price, Some(dec(15)));
        assert_eq!(listed[0].item.subtotal, dec(30));
    }

    #[tokio::test]
    async fn test_list_survives_vanished_product() {
        let (ledger, store, product_id) = ledger_with_product(dec(15));
        let order_id = Uuid::new_v4();

        ledger.add(order_id, product_id, 1).await.unwrap();
        store.remove_product(product_id);

        let listed = ledger.list_by_order(order_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_name, product_id.to_string());
        assert_eq!(listed[0].current_unit_price, None);
    }
}
