//! # Error Types
//!
//! Domain-specific error types for vela-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vela-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vela-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  vela-checkout errors                                                  │
//! │  └── CheckoutError    - NotFound / Forbidden / Conflict / Internal     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, coupon code, ...)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to exactly one checkout error kind

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. The checkout layer maps each one
/// onto the `NotFound` / `Forbidden` taxonomy.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product referenced by a cart line does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Combination is absent, or exists but belongs to another product.
    ///
    /// A mismatch is reported exactly like an absent row: the pairing the
    /// caller asked for does not exist.
    #[error("Combination {combination_id} not found for product {product_id}")]
    CombinationNotFound {
        product_id: String,
        combination_id: String,
    },

    /// Variable products are only sold through one of their combinations.
    #[error("Product {product_id} is sold by variant; a combination must be selected")]
    CombinationRequired { product_id: String },

    /// Simple products have no combinations to select.
    #[error("Product {product_id} has no variants")]
    CombinationNotAllowed { product_id: String },

    /// Coupon code is unknown.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Order is unknown.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Insufficient stock to complete checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Resolve: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Tee / Red / M", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Storefront shows: "Only 3 left of Tee / Red / M"
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Nothing left to check out (all lines unselected or unavailable).
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Coupon validity window does not contain the current time.
    #[error("Coupon {code} is not active")]
    CouponInactive { code: String },

    /// Coupon usage limit has reached zero.
    #[error("Coupon {code} has been fully redeemed")]
    CouponExhausted { code: String },

    /// Order amount is below the coupon's minimum.
    #[error("Coupon {code} requires a minimum order of {minimum_cents} cents (order is {amount_cents})")]
    CouponMinimumNotMet {
        code: String,
        minimum_cents: i64,
        amount_cents: i64,
    },

    /// Order status change is not allowed by the status machine.
    ///
    /// ## When This Occurs
    /// - Moving a delivered or cancelled order anywhere
    /// - Skipping backwards along processing → dispatched → shipped → delivered
    /// - Putting a dispatched order on hold
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: String,
        from: String,
        to: String,
    },

    /// Payment status can only be resolved once.
    #[error("Order {order_id} payment is already {current}")]
    PaymentAlreadyResolved { order_id: String, current: String },

    /// Materialization requested for a product that is not variable.
    #[error("Product {product_id} is not a variable product")]
    NotVariable { product_id: String },

    /// The cartesian product of a product's dimensions is too large to expand.
    #[error("Product {product_id} would expand to {size} combinations (limit {max})")]
    CombinationSpaceTooLarge {
        product_id: String,
        size: u64,
        max: u64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements and are raised
/// before any business logic or database work runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date range whose start is after its end.
    #[error("{field} starts after it ends")]
    InvertedWindow { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item: "Tee / Red / M".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Tee / Red / M: available 3, requested 5"
        );

        let err = CoreError::CombinationSpaceTooLarge {
            product_id: "p2".to_string(),
            size: 10_000,
            max: 2_500,
        };
        assert_eq!(
            err.to_string(),
            "Product p2 would expand to 10000 combinations (limit 2500)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::InvertedWindow {
            field: "validity window".to_string(),
        };
        assert_eq!(err.to_string(), "validity window starts after it ends");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
