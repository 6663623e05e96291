use std::sync::Arc;

use rust_decimal::Decimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod domain;
mod store;

use domain::confirmation::CodeIssuer;
use domain::order::{CatalogProduct, LineItemLedger, OrderManager, PaymentMethod};
use store::{
    AllowAll, Catalog, CodeStore, InMemoryStore, LineItemStore, OrderStore, PgStore, StaticCatalog,
};

struct Backends {
    orders: Arc<dyn OrderStore>,
    line_items: Arc<dyn LineItemStore>,
    codes: Arc<dyn CodeStore>,
    catalog: Arc<dyn Catalog>,
}

fn demo_catalog() -> Vec<(Uuid, CatalogProduct)> {
    vec![
        (
            Uuid::from_u128(5),
            CatalogProduct {
                name: "Mechanical keyboard".to_string(),
                unit_price: Decimal::from(10),
            },
        ),
        (
            Uuid::from_u128(6),
            CatalogProduct {
                name: "Wireless mouse".to_string(),
                unit_price: Decimal::from(15),
            },
        ),
    ]
}

/// Postgres when DATABASE_URL is set, in-memory otherwise. The catalog is a
/// fixed collaborator either way; product data is owned elsewhere.
async fn build_backends() -> anyhow::Result<Backends> {
    let catalog: Arc<dyn Catalog> = Arc::new(StaticCatalog::new(demo_catalog()));

    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            tracing::info!("Connecting to Postgres...");
            let pool = sqlx::postgres::PgPool::connect(&url).await?;
            let store = Arc::new(PgStore::new(pool));
            store.migrate().await?;

            Ok(Backends {
                orders: store.clone(),
                line_items: store.clone(),
                codes: store,
                catalog,
            })
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            let store = Arc::new(InMemoryStore::new());

            Ok(Backends {
                orders: store.clone(),
                line_items: store.clone(),
                codes: store,
                catalog,
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_ledger=debug")),
        )
        .init();

    tracing::info!("Starting order ledger demo");

    let backends = build_backends().await?;

    let ledger = LineItemLedger::new(backends.line_items, backends.catalog);
    let issuer = CodeIssuer::new(backends.codes);
    let manager = OrderManager::new(backends.orders, ledger, issuer, Arc::new(AllowAll));

    // === Walk the full order lifecycle ===
    let user_id = Uuid::new_v4();
    let identity = "buyer@example.com";

    let order = manager
        .create_order(user_id, PaymentMethod::Cash, None)
        .await?;
    tracing::info!(order_id = %order.id, total = %order.total, "Order created");

    manager
        .add_line_item(order.id, Uuid::from_u128(5), 2)
        .await?;
    let total = manager.recalculate_total(order.id).await?;
    tracing::info!(total = %total, "Total after first line item");

    manager
        .add_line_item(order.id, Uuid::from_u128(6), 1)
        .await?;
    let total = manager.recalculate_total(order.id).await?;
    tracing::info!(total = %total, "Total after second line item");

    for line in manager.list_line_items(order.id).await? {
        tracing::info!(
            product = %line.product_name,
            quantity = line.item.quantity,
            subtotal = %line.item.subtotal,
            "Line item"
        );
    }

    let code = manager.request_confirmation_code(order.id, identity).await?;
    tracing::info!(identity = identity, "Confirmation code issued");

    // A wrong code must leave the order pending.
    let wrong = if code.code == "000000" { "000001" } else { "000000" };
    let accepted = manager.confirm_payment(order.id, identity, wrong).await?;
    tracing::info!(accepted = accepted, "Wrong code submitted");

    let accepted = manager
        .confirm_payment(order.id, identity, &code.code)
        .await?;
    tracing::info!(accepted = accepted, "Correct code submitted");

    let order = manager.get_order(order.id).await?;
    tracing::info!(
        order_id = %order.id,
        status = order.payment_status.as_str(),
        total = %order.total,
        "Final order state"
    );
    tracing::debug!(payload = %serde_json::to_string(&order)?, "Final order record");

    Ok(())
}
