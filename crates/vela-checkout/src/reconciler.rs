//! # Stock Reconciler
//!
//! Collapses resolved lines into per-row deltas and applies them with the
//! batched conditional decrement from `vela_db::repository::stock`.
//!
//! ```text
//! lines: Mug×2, Tee/Red/M×1, Mug×1
//!    │
//!    ▼  compute_deltas
//! products:     [(mug, 3)]
//! combinations: [(red-m, 1)]
//!    │
//!    ▼  apply_deltas (≤ 2 statements)
//! rows_affected == rows → Ok
//! otherwise             → Conflict, caller's transaction rolls back
//! ```

use sqlx::SqliteConnection;
use tracing::debug;

use crate::cart::ResolvedLine;
use crate::error::CheckoutResult;
use vela_core::stock::{compute_deltas, StockDeltas};
use vela_db::repository::stock::apply_deltas;

/// Aggregated stock deltas for `lines`.
pub fn deltas_for(lines: &[ResolvedLine]) -> StockDeltas {
    compute_deltas(lines.iter().map(|l| (l.stock_target(), l.quantity)))
}

/// Decrements stock for `lines` inside the caller's transaction.
pub async fn reconcile(
    conn: &mut SqliteConnection,
    lines: &[ResolvedLine],
) -> CheckoutResult<StockDeltas> {
    let deltas = deltas_for(lines);
    apply_deltas(conn, &deltas).await?;
    debug!(rows = deltas.row_count(), "Stock reconciled");
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use vela_core::stock::StockTarget;
    use vela_core::Money;
    use vela_db::{Database, DbConfig, NewProduct};

    fn line(product_id: &str, combination_id: Option<&str>, quantity: i64) -> ResolvedLine {
        ResolvedLine {
            product_id: product_id.into(),
            combination_id: combination_id.map(String::from),
            quantity,
            unit_price: Money::from_cents(100),
            available_stock: 10,
            title: "Item".into(),
            image_url: None,
            combination_label: None,
        }
    }

    #[test]
    fn test_duplicate_lines_collapse() {
        let deltas = deltas_for(&[
            line("mug", None, 2),
            line("tee", Some("red-m"), 1),
            line("mug", None, 1),
        ]);
        assert_eq!(deltas.products, vec![("mug".to_string(), 3)]);
        assert_eq!(deltas.combinations, vec![("red-m".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_reconcile_and_lose_race() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 100, 5)).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        reconcile(&mut tx, &[line(&mug.id, None, 2), line(&mug.id, None, 1)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let target = StockTarget::Product(mug.id.clone());
        assert_eq!(db.stock().available(&target).await.unwrap(), Some(2));

        let mut tx = db.begin_write().await.unwrap();
        let err = reconcile(&mut tx, &[line(&mug.id, None, 3)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        drop(tx);

        assert_eq!(db.stock().available(&target).await.unwrap(), Some(2));
    }
}
