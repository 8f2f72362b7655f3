//! # Coupon Ledger
//!
//! Quotes coupons against an order amount and redeems them inside a
//! checkout transaction.
//!
//! Eligibility rules live in `vela_core::coupon::evaluate`; the conditional
//! decrement lives in `vela_db::repository::coupon::redeem_coupon`. This
//! module ties the two to a connection and to the checkout error taxonomy.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, instrument};

use crate::error::CheckoutResult;
use vela_core::coupon::{evaluate, normalize_code, CouponQuote};
use vela_core::{CoreError, Money};
use vela_db::repository::coupon::{fetch_coupon, redeem_coupon};
use vela_db::Database;

/// Coupon validation on the pool, outside any checkout.
#[derive(Debug, Clone)]
pub struct CouponLedger {
    db: Database,
}

impl CouponLedger {
    pub fn new(db: Database) -> Self {
        CouponLedger { db }
    }

    /// Quotes `code` for `order_amount` as of now.
    #[instrument(skip(self))]
    pub async fn validate(&self, code: &str, order_amount: Money) -> CheckoutResult<CouponQuote> {
        let mut conn = self.db.pool().acquire().await.map_err(vela_db::DbError::from)?;
        quote_coupon(&mut conn, code, order_amount, Utc::now()).await
    }
}

/// Quotes `code` for `order_amount` at `now`.
///
/// ## Errors
/// - `CouponNotFound` for an unknown code
/// - `CouponInactive`, `CouponMinimumNotMet`, `CouponExhausted` when the
///   coupon does not apply
pub async fn quote_coupon(
    conn: &mut SqliteConnection,
    code: &str,
    order_amount: Money,
    now: DateTime<Utc>,
) -> CheckoutResult<CouponQuote> {
    let code = normalize_code(code);
    let coupon = fetch_coupon(conn, code)
        .await?
        .ok_or_else(|| CoreError::CouponNotFound(code.to_string()))?;

    let quote = evaluate(&coupon, order_amount, now)?;
    debug!(code = %quote.code, discount = %quote.discount, "Coupon quoted");
    Ok(quote)
}

/// Consumes one use of `code`. Losing the last use to a concurrent
/// checkout is a `Conflict`.
pub async fn redeem(conn: &mut SqliteConnection, code: &str) -> CheckoutResult<()> {
    redeem_coupon(conn, code).await?;
    Ok(())
}
