//! # Stock Repository
//!
//! Applies aggregated stock decrements with conditional, batched UPDATEs.
//!
//! ## Decrement Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WITH deltas(id, qty) AS (VALUES (?, ?), (?, ?), ...)                   │
//! │  UPDATE products                                                        │
//! │     SET stock = products.stock - deltas.qty                             │
//! │    FROM deltas                                                          │
//! │   WHERE products.id = deltas.id                                         │
//! │     AND products.stock >= deltas.qty      ← re-checked at write time    │
//! │                                                                         │
//! │  rows_affected == deltas.len()  → ok                                    │
//! │  rows_affected <  deltas.len()  → Conflict (caller rolls back)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One statement per table, never a read-modify-write per row. A NULL
//! product stock never satisfies the predicate, so it behaves as zero.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use vela_core::stock::{StockDeltas, StockTarget};

/// Repository for stock levels.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Applies deltas in their own write transaction.
    ///
    /// Checkout calls [`apply_deltas`] inside its own transaction instead.
    pub async fn apply(&self, deltas: &StockDeltas) -> DbResult<()> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        apply_deltas(&mut tx, deltas).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Current stock of a product or combination, `None` if the row is absent.
    ///
    /// A simple product with NULL stock reads as 0.
    pub async fn available(&self, target: &StockTarget) -> DbResult<Option<i64>> {
        let row: Option<Option<i64>> = match target {
            StockTarget::Product(id) => {
                sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            StockTarget::Combination(id) => {
                sqlx::query_scalar("SELECT stock FROM combinations WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(|stock| stock.unwrap_or(0)))
    }
}

/// Decrements every row in `deltas`, all or nothing.
///
/// ## Errors
/// `DbError::Conflict` if any row lacked stock at decrement time. Rows that
/// were decremented before the shortfall was noticed stay decremented until
/// the caller rolls its transaction back.
pub async fn apply_deltas(conn: &mut SqliteConnection, deltas: &StockDeltas) -> DbResult<()> {
    if deltas.is_empty() {
        return Ok(());
    }

    apply_table(conn, "products", &deltas.products).await?;
    apply_table(conn, "combinations", &deltas.combinations).await?;

    debug!(
        products = deltas.products.len(),
        combinations = deltas.combinations.len(),
        "Stock decremented"
    );
    Ok(())
}

async fn apply_table(
    conn: &mut SqliteConnection,
    table: &'static str,
    rows: &[(String, i64)],
) -> DbResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("WITH deltas(id, qty) AS (");
    query.push_values(rows, |mut row, (id, qty)| {
        row.push_bind(id.clone()).push_bind(*qty);
    });
    query
        .push(") UPDATE ")
        .push(table)
        .push(" SET stock = ")
        .push(table)
        .push(".stock - deltas.qty, updated_at = ")
        .push_bind(Utc::now())
        .push(" FROM deltas WHERE ")
        .push(table)
        .push(".id = deltas.id AND ")
        .push(table)
        .push(".stock >= deltas.qty");

    let result = query.build().execute(&mut *conn).await?;

    if result.rows_affected() != rows.len() as u64 {
        warn!(
            table,
            expected = rows.len(),
            updated = result.rows_affected(),
            "Stock decrement lost a race"
        );
        return Err(DbError::conflict(
            "Stock",
            format!(
                "{} of {} {} rows lacked stock at decrement time",
                rows.len() as u64 - result.rows_affected(),
                rows.len(),
                table
            ),
        ));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::NewProduct;
    use crate::{Database, DbConfig};
    use vela_core::stock::compute_deltas;

    #[tokio::test]
    async fn test_batched_decrement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 1_000, 5)).await.unwrap();
        let cap = db.catalog().insert_product(&NewProduct::simple("Cap", 1_500, 2)).await.unwrap();

        let deltas = compute_deltas(vec![
            (StockTarget::Product(mug.id.clone()), 2),
            (StockTarget::Product(cap.id.clone()), 2),
            (StockTarget::Product(mug.id.clone()), 1),
        ]);
        db.stock().apply(&deltas).await.unwrap();

        let stock = db.stock();
        assert_eq!(stock.available(&StockTarget::Product(mug.id)).await.unwrap(), Some(2));
        assert_eq!(stock.available(&StockTarget::Product(cap.id)).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_shortfall_is_conflict_and_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 1_000, 5)).await.unwrap();
        let cap = db.catalog().insert_product(&NewProduct::simple("Cap", 1_500, 1)).await.unwrap();

        let deltas = compute_deltas(vec![
            (StockTarget::Product(mug.id.clone()), 2),
            (StockTarget::Product(cap.id.clone()), 3),
        ]);
        let err = db.stock().apply(&deltas).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // the mug decrement was rolled back with the transaction
        let stock = db.stock();
        assert_eq!(stock.available(&StockTarget::Product(mug.id)).await.unwrap(), Some(5));
        assert_eq!(stock.available(&StockTarget::Product(cap.id)).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_null_stock_behaves_as_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut new = NewProduct::simple("Poster", 500, 0);
        new.stock = None;
        let poster = db.catalog().insert_product(&new).await.unwrap();

        let target = StockTarget::Product(poster.id.clone());
        assert_eq!(db.stock().available(&target).await.unwrap(), Some(0));

        let err = db
            .stock()
            .apply(&compute_deltas(vec![(target, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }
}
