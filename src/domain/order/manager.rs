use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::errors::OrderError;
use super::ledger::LineItemLedger;
use super::model::{LineItem, Order, PricedLineItem};
use super::value_objects::{PaymentMethod, PaymentStatus};
use crate::domain::card;
use crate::domain::confirmation::{CodeIssuer, ConfirmationCode};
use crate::store::{AccessPolicy, OrderStore};

// ============================================================================
// Order Manager
// ============================================================================
//
// Orchestrates: order lifecycle -> line-item ledger -> total recalculation
// -> confirmation-code workflow. The ledger and the code issuer are pure
// collaborators with no knowledge of each other; only this layer ties a
// validated code to the PENDING -> PAID transition.
//
// Every line-item mutation is followed by a total recalculation so the
// order total stays equal to the sum of its line-item subtotals.
//
// ============================================================================

pub struct OrderManager {
    orders: Arc<dyn OrderStore>,
    ledger: LineItemLedger,
    issuer: CodeIssuer,
    policy: Arc<dyn AccessPolicy>,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        ledger: LineItemLedger,
        issuer: CodeIssuer,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            orders,
            ledger,
            issuer,
            policy,
        }
    }

    /// Create a new order in `Pending` status with a zero total.
    ///
    /// Card orders require a non-empty, Luhn-valid card number; only its
    /// last 4 digits are kept. Nothing is persisted on validation failure.
    pub async fn create_order(
        &self,
        user_id: Uuid,
        payment_method: PaymentMethod,
        card_number: Option<&str>,
    ) -> Result<Order, OrderError> {
        let card_suffix = match payment_method {
            PaymentMethod::Cash => None,
            PaymentMethod::Card => {
                let number = card_number
                    .filter(|n| !n.trim().is_empty())
                    .ok_or(OrderError::MissingCardNumber)?;
                if !card::validate(number) {
                    return Err(OrderError::InvalidCardNumber);
                }
                Some(card::last_four(number))
            }
        };

        let order = Order::new(user_id, payment_method, card_suffix);
        self.orders.insert_order(&order).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            method = payment_method.as_str(),
            "Order created"
        );

        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .fetch_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Fetch an order on behalf of `identity`, enforcing the injected
    /// access policy.
    pub async fn get_order_for(&self, identity: &str, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self.get_order(order_id).await?;
        self.authorize(identity, &order)?;
        Ok(order)
    }

    pub async fn list_line_items(&self, order_id: Uuid) -> Result<Vec<PricedLineItem>, OrderError> {
        // Surface a not-found order distinctly from an empty ledger.
        self.get_order(order_id).await?;
        self.ledger.list_by_order(order_id).await
    }

    /// Add a line item to a pending order, then restore the total invariant.
    pub async fn add_line_item(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, OrderError> {
        let order = self.get_order(order_id).await?;
        self.require_pending(&order)?;

        let item = self.ledger.add(order_id, product_id, quantity).await?;
        self.recalculate_total(order_id).await?;

        Ok(item)
    }

    /// Change a line item's quantity, then restore the total invariant.
    pub async fn update_line_item(
        &self,
        line_item_id: Uuid,
        quantity: i32,
    ) -> Result<LineItem, OrderError> {
        let item = self
            .ledger
            .fetch(line_item_id)
            .await?
            .ok_or(OrderError::LineItemNotFound(line_item_id))?;

        let order = self.get_order(item.order_id).await?;
        self.require_pending(&order)?;

        if !self.ledger.update_quantity(line_item_id, quantity).await? {
            // Deleted between fetch and update.
            return Err(OrderError::LineItemNotFound(line_item_id));
        }
        self.recalculate_total(item.order_id).await?;

        self.ledger
            .fetch(line_item_id)
            .await?
            .ok_or(OrderError::LineItemNotFound(line_item_id))
    }

    /// Remove a line item, then restore the total invariant.
    pub async fn remove_line_item(&self, line_item_id: Uuid) -> Result<(), OrderError> {
        let item = self
            .ledger
            .fetch(line_item_id)
            .await?
            .ok_or(OrderError::LineItemNotFound(line_item_id))?;

        let order = self.get_order(item.order_id).await?;
        self.require_pending(&order)?;

        if !self.ledger.remove(line_item_id).await? {
            return Err(OrderError::LineItemNotFound(line_item_id));
        }
        self.recalculate_total(item.order_id).await?;

        Ok(())
    }

    /// Recompute the order total from its line items and persist it.
    ///
    /// Idempotent: repeated calls with no intervening line-item changes
    /// yield the same total. The read-sum-write happens as one atomic unit
    /// at the store layer.
    pub async fn recalculate_total(&self, order_id: Uuid) -> Result<Decimal, OrderError> {
        let total = self
            .orders
            .recalculate_total(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        tracing::debug!(order_id = %order_id, total = %total, "Order total recalculated");

        Ok(total)
    }

    /// Issue a confirmation code for finalizing payment of `order_id`.
    ///
    /// Preconditions: the order exists, is still pending, has a total
    /// strictly greater than zero, the identity is non-empty, and the
    /// access policy allows it. Any violation issues no code.
    pub async fn request_confirmation_code(
        &self,
        order_id: Uuid,
        identity: &str,
    ) -> Result<ConfirmationCode, OrderError> {
        if identity.trim().is_empty() {
            return Err(OrderError::EmptyIdentity);
        }

        let order = self.get_order(order_id).await?;
        self.authorize(identity, &order)?;
        self.require_pending(&order)?;

        if order.total <= Decimal::ZERO {
            return Err(OrderError::ZeroTotal(order_id));
        }

        self.issuer.generate(identity).await.map_err(OrderError::from)
    }

    /// Submit a confirmation code to finalize payment.
    ///
    /// On a validated code the order transitions `Pending -> Paid`; on any
    /// rejection the order is left untouched and `Ok(false)` is returned.
    /// The caller learns only "validated" vs "not validated".
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        identity: &str,
        submitted_code: &str,
    ) -> Result<bool, OrderError> {
        let order = self.get_order(order_id).await?;
        self.authorize(identity, &order)?;
        self.require_pending(&order)?;

        if !self.issuer.validate(identity, submitted_code).await? {
            return Ok(false);
        }

        if !self.orders.mark_paid(order_id).await? {
            // Another request confirmed the order in the meantime.
            tracing::warn!(order_id = %order_id, "Order already left pending state");
            return Ok(false);
        }

        tracing::info!(order_id = %order_id, "Order payment confirmed");

        Ok(true)
    }

    fn authorize(&self, identity: &str, order: &Order) -> Result<(), OrderError> {
        if self.policy.can_manage(identity, order) {
            Ok(())
        } else {
            Err(OrderError::Forbidden(order.id))
        }
    }

    fn require_pending(&self, order: &Order) -> Result<(), OrderError> {
        if order.payment_status == PaymentStatus::Pending {
            Ok(())
        } else {
            Err(OrderError::OrderNotPending(order.id))
        }
    }
}
