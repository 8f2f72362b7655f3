//! # Coupon Rules
//!
//! Eligibility and discount arithmetic for coupon codes. The database side
//! (lookup and the conditional redemption) lives in vela-db; this module only
//! decides, given a coupon row, whether it applies and for how much.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validity window contains now?   no  → CouponInactive               │
//! │  2. order_amount >= min_order?      no  → CouponMinimumNotMet          │
//! │  3. usage_limit absent or > 0?      no  → CouponExhausted              │
//! │  4. discount = percentage ? round_half_up(amount% of order) : amount   │
//! │  5. discount = min(discount, order_amount)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{parse_bound, SaleWindow};
use crate::types::{AmountType, Coupon};
use crate::validation::{validate_coupon_code, validate_non_negative};

// =============================================================================
// Quote
// =============================================================================

/// The discount a coupon grants for a given order amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponQuote {
    pub code: String,
    pub discount: Money,
}

/// Normalizes a submitted code. Matching is case-sensitive after trimming.
#[inline]
pub fn normalize_code(code: &str) -> &str {
    code.trim()
}

impl Coupon {
    /// Validity window, if the coupon has one.
    pub fn validity(&self) -> Option<SaleWindow> {
        SaleWindow::from_bounds(self.valid_from, self.valid_to)
    }

    /// Whether the coupon has redemptions left.
    #[inline]
    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.map_or(true, |n| n > 0)
    }
}

/// Checks a coupon against an order amount and computes its discount.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use vela_core::coupon::evaluate;
/// use vela_core::{AmountType, Coupon, Money};
///
/// let coupon = Coupon {
///     code: "SAVE10".into(),
///     amount: 10,
///     amount_type: AmountType::Percentage,
///     min_order_cents: 5_000,
///     usage_limit: Some(3),
///     used_count: 0,
///     valid_from: None,
///     valid_to: None,
///     created_at: Utc::now(),
/// };
///
/// let quote = evaluate(&coupon, Money::from_cents(20_000), Utc::now()).unwrap();
/// assert_eq!(quote.discount.cents(), 2_000);
/// ```
pub fn evaluate(coupon: &Coupon, order_amount: Money, now: DateTime<Utc>) -> CoreResult<CouponQuote> {
    if let Some(window) = coupon.validity() {
        if !window.contains(now) {
            return Err(CoreError::CouponInactive {
                code: coupon.code.clone(),
            });
        }
    }

    if order_amount.cents() < coupon.min_order_cents {
        return Err(CoreError::CouponMinimumNotMet {
            code: coupon.code.clone(),
            minimum_cents: coupon.min_order_cents,
            amount_cents: order_amount.cents(),
        });
    }

    if !coupon.has_uses_left() {
        return Err(CoreError::CouponExhausted {
            code: coupon.code.clone(),
        });
    }

    let raw = match coupon.amount_type {
        AmountType::Percentage => order_amount.percent(coupon.amount),
        AmountType::Fixed => Money::from_cents(coupon.amount),
    };

    Ok(CouponQuote {
        code: coupon.code.clone(),
        discount: raw.min(order_amount).clamp_non_negative(),
    })
}

// =============================================================================
// New Coupon
// =============================================================================

/// Input for creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub amount: i64,
    pub amount_type: AmountType,
    #[serde(default)]
    pub min_order_cents: i64,
    pub usage_limit: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl NewCoupon {
    /// Builds a coupon input from RFC 3339 date strings, failing on
    /// unparseable dates instead of treating them as absent.
    pub fn with_window_strings(
        code: impl Into<String>,
        amount: i64,
        amount_type: AmountType,
        valid_from: Option<&str>,
        valid_to: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(NewCoupon {
            code: code.into(),
            amount,
            amount_type,
            min_order_cents: 0,
            usage_limit: None,
            valid_from: parse_bound("valid_from", valid_from)?,
            valid_to: parse_bound("valid_to", valid_to)?,
        })
    }

    /// Validates code format, amount ranges and window ordering.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_coupon_code(&self.code)?;

        match self.amount_type {
            AmountType::Percentage if !(0..=100).contains(&self.amount) => {
                return Err(ValidationError::OutOfRange {
                    field: "amount".to_string(),
                    min: 0,
                    max: 100,
                });
            }
            AmountType::Fixed => validate_non_negative("amount", self.amount)?,
            AmountType::Percentage => {}
        }

        validate_non_negative("min_order_cents", self.min_order_cents)?;
        if let Some(limit) = self.usage_limit {
            validate_non_negative("usage_limit", limit)?;
        }

        SaleWindow::new(self.valid_from, self.valid_to).map_err(|_| {
            ValidationError::InvertedWindow {
                field: "validity window".to_string(),
            }
        })?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
