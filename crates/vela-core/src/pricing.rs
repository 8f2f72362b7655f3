//! # Price Engine
//!
//! Resolves the price a shopper actually pays for a product or combination.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale_price?  window?        now vs window            → price           │
//! │  ───────────  ───────────    ─────────────────────    ───────────────   │
//! │  none         (ignored)      (ignored)                → base            │
//! │  some         none           (ignored)                → sale            │
//! │  some         [from, to]     from <= now <= to        → sale            │
//! │  some         [from, to]     outside                  → base            │
//! │                                                                         │
//! │  A missing bound is open: [from, ∞) or (-∞, to].                        │
//! │  Both bounds are inclusive.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates are parsed eagerly: an unparseable bound is a validation error at
//! the point it enters the system, never a silently inactive sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Sale Window
// =============================================================================

/// An inclusive time interval with optionally open ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl SaleWindow {
    /// Creates a window, rejecting `from > to`.
    pub fn new(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ValidationError::InvertedWindow {
                    field: "sale window".to_string(),
                });
            }
        }
        Ok(SaleWindow { from, to })
    }

    /// Parses RFC 3339 bounds. Empty strings count as absent.
    ///
    /// ## Example
    /// ```rust
    /// use vela_core::pricing::SaleWindow;
    ///
    /// let w = SaleWindow::parse(Some("2025-01-01T00:00:00Z"), None).unwrap();
    /// assert!(w.from().is_some());
    ///
    /// assert!(SaleWindow::parse(Some("next tuesday"), None).is_err());
    /// ```
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ValidationError> {
        let from = parse_bound("sale_starts_at", from)?;
        let to = parse_bound("sale_ends_at", to)?;
        SaleWindow::new(from, to)
    }

    /// Builds a window from stored columns. Returns `None` when both are
    /// absent, meaning "no window" rather than "always open".
    ///
    /// Stored rows were validated on the way in, so ordering is not
    /// re-checked here.
    pub fn from_bounds(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Self> {
        if from.is_none() && to.is_none() {
            None
        } else {
            Some(SaleWindow { from, to })
        }
    }

    #[inline]
    pub fn from(&self) -> Option<DateTime<Utc>> {
        self.from
    }

    #[inline]
    pub fn to(&self) -> Option<DateTime<Utc>> {
        self.to
    }

    /// Whether `now` falls inside the window (both ends inclusive).
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let after_start = self.from.map_or(true, |f| now >= f);
        let before_end = self.to.map_or(true, |t| now <= t);
        after_start && before_end
    }
}

/// Parses one optional RFC 3339 timestamp.
pub fn parse_bound(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: e.to_string(),
            }),
    }
}

// =============================================================================
// Active Price
// =============================================================================

/// Returns the price in effect at `now`.
///
/// Pure and total: no input makes it fail.
pub fn active_price(
    base: Money,
    sale_price: Option<Money>,
    window: Option<&SaleWindow>,
    now: DateTime<Utc>,
) -> Money {
    match (sale_price, window) {
        (None, _) => base,
        (Some(sale), None) => sale,
        (Some(sale), Some(w)) if w.contains(now) => sale,
        (Some(_), Some(_)) => base,
    }
}

/// [`active_price`] evaluated at the current wall-clock time.
pub fn active_price_now(base: Money, sale_price: Option<Money>, window: Option<&SaleWindow>) -> Money {
    active_price(base, sale_price, window, Utc::now())
}

// =============================================================================
// Priced
// =============================================================================

/// Anything that carries base/sale price fields (products and combinations).
pub trait Priced {
    fn base_price(&self) -> Money;
    fn sale_price(&self) -> Option<Money>;
    fn sale_window(&self) -> Option<SaleWindow>;

    /// The price in effect at `now`.
    fn active_price(&self, now: DateTime<Utc>) -> Money {
        let window = self.sale_window();
        active_price(self.base_price(), self.sale_price(), window.as_ref(), now)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
