//! # Order Repository
//!
//! Persistence for orders and their items.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout tx ──► insert_order (order + items, snapshot prices)          │
//! │              ──► set_payment_intent (card only)                         │
//! │                                                                         │
//! │  fulfilment  ──► transition_status   processing → dispatched → ...      │
//! │                  (compare-and-set on the status read, stamps *_at)      │
//! │                                                                         │
//! │  payments    ──► set_payment_status  pending → paid | failed            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Order items are immutable once inserted.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vela_core::order::{check_payment_transition, check_transition};
use vela_core::{Order, OrderItem, OrderStatus, PaymentStatus};

const ORDER_COLUMNS: &str = "id, tracking_id, user_id, shipping_address, subtotal_cents, \
     shipping_fee_cents, taxes_cents, discount_cents, coupon_code, total_cents, status, \
     payment_status, payment_method, payment_intent_id, created_at, updated_at, \
     dispatched_at, shipped_at, delivered_at, on_hold_at, cancelled_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, combination_id, title, image_url, \
     price_cents, quantity, combinations, created_at";

/// Repository for orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn get_by_tracking_id(&self, tracking_id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE tracking_id = ?1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(tracking_id.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY created_at, rowid",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// A user's orders, most recent first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    /// Moves an order to `to`, stamping the matching timestamp.
    ///
    /// ## Errors
    /// - `NotFound` if the order doesn't exist
    /// - `Domain(InvalidStatusTransition)` if the status machine forbids it
    /// - `Conflict` if the status changed between the read and the write
    pub async fn transition_status(&self, order_id: &str, to: OrderStatus) -> DbResult<Order> {
        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        let from = current.ok_or_else(|| DbError::not_found("Order", order_id))?;

        check_transition(order_id, from, to)?;

        let now = Utc::now();
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE orders SET status = ");
        query.push_bind(to).push(", updated_at = ").push_bind(now);
        if let Some(column) = to.timestamp_column() {
            query.push(", ").push(column).push(" = ").push_bind(now);
        }
        query
            .push(" WHERE id = ")
            .push_bind(order_id.to_string())
            .push(" AND status = ")
            .push_bind(from);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Order",
                format!("{} is no longer {}", order_id, from),
            ));
        }

        info!(order_id = %order_id, from = %from, to = %to, "Order status changed");

        self.get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    /// Records the outcome of a payment confirmed outside the checkout.
    pub async fn set_payment_status(&self, order_id: &str, to: PaymentStatus) -> DbResult<()> {
        let current: Option<PaymentStatus> =
            sqlx::query_scalar("SELECT payment_status FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        let from = current.ok_or_else(|| DbError::not_found("Order", order_id))?;

        check_payment_transition(order_id, from, to)?;

        let result = sqlx::query(
            "UPDATE orders SET payment_status = ?2, updated_at = ?3 WHERE id = ?1 AND payment_status = ?4",
        )
        .bind(order_id)
        .bind(to)
        .bind(Utc::now())
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Order",
                format!("{} payment is no longer {}", order_id, from),
            ));
        }

        info!(order_id = %order_id, payment_status = %to, "Payment status recorded");
        Ok(())
    }
}

// =============================================================================
// Transactional Writes
// =============================================================================

/// Inserts an order and its items inside the caller's transaction.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    order: &Order,
    items: &[OrderItem],
) -> DbResult<()> {
    debug!(order_id = %order.id, tracking_id = %order.tracking_id, items = items.len(), "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tracking_id, user_id, shipping_address,
            subtotal_cents, shipping_fee_cents, taxes_cents, discount_cents,
            coupon_code, total_cents, status, payment_status, payment_method,
            payment_intent_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&order.id)
    .bind(&order.tracking_id)
    .bind(&order.user_id)
    .bind(Json(&order.shipping_address))
    .bind(order.subtotal_cents)
    .bind(order.shipping_fee_cents)
    .bind(order.taxes_cents)
    .bind(order.discount_cents)
    .bind(&order.coupon_code)
    .bind(order.total_cents)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(&order.payment_intent_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    if items.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO order_items (id, order_id, product_id, combination_id, title, image_url, \
         price_cents, quantity, combinations, created_at) ",
    );
    query.push_values(items, |mut row, item| {
        row.push_bind(item.id.clone())
            .push_bind(item.order_id.clone())
            .push_bind(item.product_id.clone())
            .push_bind(item.combination_id.clone())
            .push_bind(item.title.clone())
            .push_bind(item.image_url.clone())
            .push_bind(item.price_cents)
            .push_bind(item.quantity)
            .push_bind(item.combinations.clone())
            .push_bind(item.created_at);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}

/// Stores the gateway's payment intent id on an order.
pub async fn set_payment_intent(
    conn: &mut SqliteConnection,
    order_id: &str,
    payment_intent_id: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE orders SET payment_intent_id = ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(order_id)
    .bind(payment_intent_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    Ok(())
}

/// Generates a new order id.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new order item id.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a human-facing tracking id: 12 upper-case hex characters,
/// random and independent of the order's primary key.
pub fn generate_tracking_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
