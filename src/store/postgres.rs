use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{CodeStore, LineItemStore, OrderStore, StoreError};
use crate::domain::confirmation::ConfirmationCode;
use crate::domain::order::{LineItem, Order, PaymentMethod, PaymentStatus};

// ============================================================================
// Postgres Store
// ============================================================================
//
// Production backend for orders, line items and confirmation codes. The two
// race-sensitive operations are single statements:
// - recalculate_total sums and writes in one UPDATE, so a concurrent
//   line-item mutation can never be half-observed;
// - consume flips the used flag with a `used = FALSE` guard, so one code
//   can be spent at most once even under concurrent submissions.
//
// ============================================================================

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bootstrap the three tables. Cheap to call on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                total NUMERIC NOT NULL DEFAULT 0,
                payment_method TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                card_suffix TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS line_items (
                id UUID PRIMARY KEY,
                order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                product_id UUID NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                subtotal NUMERIC NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS line_items_order_idx ON line_items (order_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS confirmation_codes (
                id UUID PRIMARY KEY,
                identity TEXT NOT NULL,
                code TEXT NOT NULL,
                generated_at TIMESTAMPTZ NOT NULL,
                used BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS confirmation_codes_lookup_idx \
             ON confirmation_codes (identity, code, generated_at)",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Order ledger schema ready");

        Ok(())
    }
}

type OrderRow = (
    Uuid,
    Uuid,
    DateTime<Utc>,
    Decimal,
    String,
    String,
    Option<String>,
);

fn order_from_row(row: OrderRow) -> Result<Order, StoreError> {
    let (id, user_id, created_at, total, method, status, card_suffix) = row;

    let payment_method = PaymentMethod::parse(&method)
        .ok_or_else(|| StoreError::Backend(format!("unknown payment method: {method}")))?;
    let payment_status = PaymentStatus::parse(&status)
        .ok_or_else(|| StoreError::Backend(format!("unknown payment status: {status}")))?;

    Ok(Order {
        id,
        user_id,
        created_at,
        total,
        payment_method,
        payment_status,
        card_suffix,
    })
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, created_at, total, payment_method, payment_status, card_suffix)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.created_at)
        .bind(order.total)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.card_suffix.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, created_at, total, payment_method, payment_status, card_suffix
            FROM orders WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(order_from_row).transpose()
    }

    async fn recalculate_total(&self, order_id: Uuid) -> Result<Option<Decimal>, StoreError> {
        // Sum and write in one statement; the snapshot of line_items and
        // the total update cannot be interleaved by a concurrent mutation.
        let row: Option<(Decimal,)> = sqlx::query_as(
            r#"
            UPDATE orders
            SET total = COALESCE(
                (SELECT SUM(subtotal) FROM line_items WHERE order_id = $1), 0)
            WHERE id = $1
            RETURNING total
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(total,)| total))
    }

    async fn mark_paid(&self, order_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = 'PAID' \
             WHERE id = $1 AND payment_status = 'PENDING'",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LineItemStore for PgStore {
    async fn insert_line_item(&self, item: &LineItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO line_items (id, order_id, product_id, quantity, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.subtotal)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_line_item(&self, item_id: Uuid) -> Result<Option<LineItem>, StoreError> {
        let row: Option<(Uuid, Uuid, Uuid, i32, Decimal)> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, subtotal FROM line_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, order_id, product_id, quantity, subtotal)| LineItem {
            id,
            order_id,
            product_id,
            quantity,
            subtotal,
        }))
    }

    async fn update_line_item(
        &self,
        item_id: Uuid,
        quantity: i32,
        subtotal: Decimal,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE line_items SET quantity = $2, subtotal = $3 WHERE id = $1",
        )
        .bind(item_id)
        .bind(quantity)
        .bind(subtotal)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_line_item(&self, item_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM line_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_order(&self, order_id: Uuid) -> Result<Vec<LineItem>, StoreError> {
        let rows: Vec<(Uuid, Uuid, Uuid, i32, Decimal)> = sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, subtotal \
             FROM line_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, order_id, product_id, quantity, subtotal)| LineItem {
                id,
                order_id,
                product_id,
                quantity,
                subtotal,
            })
            .collect())
    }
}

#[async_trait]
impl CodeStore for PgStore {
    async fn insert_code(&self, code: &ConfirmationCode) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO confirmation_codes (id, identity, code, generated_at, used)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(code.id)
        .bind(&code.identity)
        .bind(&code.code)
        .bind(code.generated_at)
        .bind(code.used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_match(
        &self,
        identity: &str,
        code: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<ConfirmationCode>, StoreError> {
        let row: Option<(Uuid, String, String, DateTime<Utc>, bool)> = sqlx::query_as(
            r#"
            SELECT id, identity, code, generated_at, used
            FROM confirmation_codes
            WHERE identity = $1 AND code = $2 AND used = FALSE AND generated_at >= $3
            ORDER BY generated_at DESC
            LIMIT 1
            "#,
        )
        .bind(identity)
        .bind(code)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, identity, code, generated_at, used)| ConfirmationCode {
            id,
            identity,
            code,
            generated_at,
            used,
        }))
    }

    async fn consume(&self, code_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE confirmation_codes SET used = TRUE WHERE id = $1 AND used = FALSE",
        )
        .bind(code_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
