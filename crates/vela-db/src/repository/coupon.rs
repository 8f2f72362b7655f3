//! # Coupon Repository
//!
//! Coupon storage and the conditional redemption used at checkout.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE coupons                                                         │
//! │     SET usage_limit = usage_limit - 1,     (NULL stays NULL)            │
//! │         used_count  = used_count + 1                                    │
//! │   WHERE code = ?                                                        │
//! │     AND (usage_limit IS NULL OR usage_limit > 0)                        │
//! │  RETURNING usage_limit                                                  │
//! │                                                                         │
//! │  no row returned   → Conflict (last use taken by a concurrent checkout) │
//! │  negative returned → Conflict                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Eligibility (window, minimum, discount) is decided in
//! `vela_core::coupon`; this module only stores and decrements.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use vela_core::coupon::{normalize_code, NewCoupon};
use vela_core::Coupon;

/// Repository for coupons.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Looks up a coupon by code (trimmed, case-sensitive).
    pub async fn get(&self, code: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        fetch_coupon(&mut conn, code).await
    }

    /// Validates and stores a new coupon.
    ///
    /// ## Errors
    /// - `DbError::Validation` for a bad code, amount or inverted window
    /// - `DbError::UniqueViolation` if the code exists
    pub async fn insert(&self, new: &NewCoupon) -> DbResult<Coupon> {
        new.validate()?;

        let coupon = Coupon {
            code: normalize_code(&new.code).to_string(),
            amount: new.amount,
            amount_type: new.amount_type,
            min_order_cents: new.min_order_cents,
            usage_limit: new.usage_limit,
            used_count: 0,
            valid_from: new.valid_from,
            valid_to: new.valid_to,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                code, amount, amount_type, min_order_cents, usage_limit,
                used_count, valid_from, valid_to, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&coupon.code)
        .bind(coupon.amount)
        .bind(coupon.amount_type)
        .bind(coupon.min_order_cents)
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .bind(coupon.valid_from)
        .bind(coupon.valid_to)
        .bind(coupon.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("coupon code", &coupon.code),
            other => other,
        })?;

        info!(code = %coupon.code, "Coupon created");
        Ok(coupon)
    }
}

pub async fn fetch_coupon(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT code, amount, amount_type, min_order_cents, usage_limit,
               used_count, valid_from, valid_to, created_at
        FROM coupons
        WHERE code = ?1
        "#,
    )
    .bind(normalize_code(code))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(coupon)
}

/// Consumes one use of a coupon inside the caller's transaction.
///
/// Returns the remaining usage limit (`None` = unlimited).
pub async fn redeem_coupon(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<i64>> {
    let code = normalize_code(code);

    let remaining: Option<Option<i64>> = sqlx::query_scalar(
        r#"
        UPDATE coupons
        SET usage_limit = usage_limit - 1,
            used_count = used_count + 1
        WHERE code = ?1
          AND (usage_limit IS NULL OR usage_limit > 0)
        RETURNING usage_limit
        "#,
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    match remaining {
        None => {
            warn!(code = %code, "Coupon exhausted at redemption");
            Err(DbError::conflict("Coupon", format!("{} has no uses left", code)))
        }
        Some(Some(left)) if left < 0 => {
            warn!(code = %code, left, "Coupon usage went negative");
            Err(DbError::conflict("Coupon", format!("{} has no uses left", code)))
        }
        Some(left) => {
            debug!(code = %code, remaining = ?left, "Coupon redeemed");
            Ok(left)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use vela_core::AmountType;

    fn save10(limit: Option<i64>) -> NewCoupon {
        let mut c = NewCoupon::with_window_strings("SAVE10", 10, AmountType::Percentage, None, None)
            .unwrap();
        c.usage_limit = limit;
        c
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&save10(Some(3))).await.unwrap();

        let c = db.coupons().get(" SAVE10 ").await.unwrap().unwrap();
        assert_eq!(c.amount_type, AmountType::Percentage);
        assert_eq!(c.usage_limit, Some(3));
        assert!(db.coupons().get("save10").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_and_duplicate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bad = save10(None);
        bad.amount = 150;
        assert!(matches!(
            db.coupons().insert(&bad).await,
            Err(DbError::Validation(_))
        ));

        db.coupons().insert(&save10(None)).await.unwrap();
        assert!(matches!(
            db.coupons().insert(&save10(None)).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_redeem_until_exhausted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&save10(Some(1))).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        assert_eq!(redeem_coupon(&mut tx, "SAVE10").await.unwrap(), Some(0));
        let err = redeem_coupon(&mut tx, "SAVE10").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        tx.commit().await.unwrap();

        let c = db.coupons().get("SAVE10").await.unwrap().unwrap();
        assert_eq!(c.usage_limit, Some(0));
        assert_eq!(c.used_count, 1);
    }

    #[tokio::test]
    async fn test_unlimited_coupon_counts_uses() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons().insert(&save10(None)).await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        assert_eq!(redeem_coupon(&mut tx, "SAVE10").await.unwrap(), None);
        assert_eq!(redeem_coupon(&mut tx, "SAVE10").await.unwrap(), None);
        tx.commit().await.unwrap();

        let c = db.coupons().get("SAVE10").await.unwrap().unwrap();
        assert_eq!(c.used_count, 2);
    }

    #[tokio::test]
    async fn test_redeem_unknown_code_is_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin_write().await.unwrap();
        assert!(matches!(
            redeem_coupon(&mut tx, "GHOST").await,
            Err(DbError::Conflict { .. })
        ));
    }
}
