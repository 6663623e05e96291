use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{PaymentMethod, PaymentStatus};

// ============================================================================
// Order Records
// ============================================================================

/// One purchase transaction owned by a user.
///
/// `total` is always materialized (0 for an empty order, never null) and is
/// kept equal to the sum of line-item subtotals by `recalculate_total`.
/// `card_suffix` is present iff the payment method is `Card`; it holds the
/// last 4 digits only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub card_suffix: Option<String>,
}

impl Order {
    pub fn new(
        user_id: Uuid,
        payment_method: PaymentMethod,
        card_suffix: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            total: Decimal::ZERO,
            payment_method,
            payment_status: PaymentStatus::Pending,
            card_suffix,
        }
    }
}

/// One product line within an order.
///
/// `subtotal` is derived: unit price at time of write x quantity. The price
/// is not frozen at add time; quantity updates reprice against the current
/// catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl LineItem {
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: i32, subtotal: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            subtotal,
        }
    }
}

/// A line item enriched for presentation: product display name and the
/// current catalog unit price alongside the persisted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLineItem {
    pub item: LineItem,
    pub product_name: String,
    pub current_unit_price: Option<Decimal>,
}
