//! # vela-core: Pure Business Logic for Vela Commerce
//!
//! This crate holds the checkout rules that do not need a database: price
//! resolution, combination planning, coupon arithmetic, stock deltas and the
//! order status machine. Everything here is deterministic given its inputs
//! (callers pass "now" explicitly where time matters).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vela Commerce Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    vela-checkout                                │   │
//! │  │    checkout(), validate_coupon(), materialize_combinations()    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vela-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ pricing  │ │ variants │ │  coupon  │ │  stock   │          │   │
//! │  │   │ sale     │ │ cartesian│ │ discount │ │  deltas  │          │   │
//! │  │   │ windows  │ │ keys     │ │ rules    │ │          │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vela-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Combination, Coupon, Order, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Sale-aware active price resolution
//! - [`variants`] - Cartesian product and canonical combination keys
//! - [`coupon`] - Coupon eligibility and discount computation
//! - [`stock`] - Aggregated stock deltas for the reconciler
//! - [`order`] - Order status transitions
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use vela_core::money::Money;
//! use vela_core::pricing::{active_price, SaleWindow};
//!
//! let now = Utc::now();
//! let window = SaleWindow::new(Some(now - Duration::days(1)), None).unwrap();
//!
//! let price = active_price(
//!     Money::from_cents(10_000),
//!     Some(Money::from_cents(7_500)),
//!     Some(&window),
//!     now,
//! );
//! assert_eq!(price.cents(), 7_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod stock;
pub mod types;
pub mod validation;
pub mod variants;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{active_price, SaleWindow};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price accepted anywhere, in cents ($10,000,000.00).
///
/// Keeps `price × MAX_ITEM_QUANTITY × MAX_CART_ITEMS` far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Default upper bound on the number of combinations a product may expand to.
///
/// Materialization is O(∏ |values per dimension|); above this the caller must
/// trim its dimensions instead of inserting thousands of rows.
pub const DEFAULT_MAX_COMBINATIONS: u64 = 2_500;
