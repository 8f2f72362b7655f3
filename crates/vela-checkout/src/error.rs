//! # Checkout Error Types
//!
//! The single error type surfaced by checkout, coupon validation and
//! materialization.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Error Kinds                               │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    NotFound     │  │   Forbidden     │  │      Conflict           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Product        │  │  Out of stock   │  │  Stock taken at         │ │
//! │  │  Combination    │  │  Coupon window  │  │    decrement time       │ │
//! │  │  Coupon         │  │  Coupon minimum │  │  Coupon exhausted at    │ │
//! │  │  Order          │  │  Empty cart     │  │    decrement time       │ │
//! │  │                 │  │  Gateway decline│  │  Duplicate key          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  InternalError: persistence failure, gateway transport/timeout, │   │
//! │  │  configuration. Details are logged, never shown to the shopper. │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::error;
use ts_rs::TS;

use crate::payment::GatewayError;
use vela_core::{CoreError, PaymentMethod, ValidationError};
use vela_db::DbError;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Coarse classification every [`CheckoutError`] maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InternalError,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Business Rules
    // =========================================================================
    /// A domain rule refused the request.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Request input failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The store does not accept this payment method.
    #[error("Payment method {0:?} is not accepted")]
    PaymentMethodNotAccepted(PaymentMethod),

    /// The gateway declined to create a payment intent.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    // =========================================================================
    // Persistence
    // =========================================================================
    /// A row the operation needed was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A concurrent checkout won a conditional write first.
    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    /// Persistence failed for reasons unrelated to business rules.
    #[error("Database error: {0}")]
    Database(String),

    // =========================================================================
    // Collaborators
    // =========================================================================
    /// The gateway could not be reached or answered garbage.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway did not answer within the configured timeout.
    #[error("Payment gateway timed out after {0} seconds")]
    GatewayTimeout(u64),

    /// The session provider failed.
    #[error("Session unavailable: {0}")]
    Session(String),

    // =========================================================================
    // Configuration
    // =========================================================================
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl CheckoutError {
    /// The taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Domain(core) => match core {
                CoreError::ProductNotFound(_)
                | CoreError::CombinationNotFound { .. }
                | CoreError::CouponNotFound(_)
                | CoreError::OrderNotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::Forbidden,
            },
            CheckoutError::Validation(_)
            | CheckoutError::PaymentMethodNotAccepted(_)
            | CheckoutError::PaymentDeclined(_) => ErrorKind::Forbidden,
            CheckoutError::NotFound { .. } => ErrorKind::NotFound,
            CheckoutError::Conflict { .. } => ErrorKind::Conflict,
            CheckoutError::Database(_)
            | CheckoutError::GatewayUnavailable(_)
            | CheckoutError::GatewayTimeout(_)
            | CheckoutError::Session(_)
            | CheckoutError::InvalidConfig(_)
            | CheckoutError::ConfigLoadFailed(_)
            | CheckoutError::ConfigSaveFailed(_) => ErrorKind::InternalError,
        }
    }

    /// Whether re-submitting the same request may succeed.
    ///
    /// Only lost races qualify; the shopper should re-check availability.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Short message safe to show a shopper.
    pub fn message(&self) -> String {
        match self {
            CheckoutError::Domain(core) => match core {
                CoreError::ProductNotFound(_) | CoreError::CombinationNotFound { .. } => {
                    "An item in your cart is no longer available.".to_string()
                }
                CoreError::InsufficientStock {
                    item, available, ..
                } if *available > 0 => format!("Only {} left of {}.", available, item),
                CoreError::InsufficientStock { item, .. } => format!("{} is out of stock.", item),
                CoreError::EmptyCart => "Your cart is empty.".to_string(),
                CoreError::CouponNotFound(_) => "That coupon code does not exist.".to_string(),
                CoreError::CouponInactive { .. } => "That coupon is not active.".to_string(),
                CoreError::CouponExhausted { .. } => {
                    "That coupon has been fully redeemed.".to_string()
                }
                CoreError::CouponMinimumNotMet { minimum_cents, .. } => format!(
                    "That coupon requires a minimum order of {}.",
                    vela_core::Money::from_cents(*minimum_cents)
                ),
                other => other.to_string(),
            },
            CheckoutError::Validation(e) => e.to_string(),
            CheckoutError::PaymentMethodNotAccepted(_) => {
                "That payment method is not accepted.".to_string()
            }
            CheckoutError::PaymentDeclined(_) => {
                "Your payment could not be started. Please try another method.".to_string()
            }
            CheckoutError::NotFound { entity, .. } => format!("{} not found.", entity),
            CheckoutError::Conflict { .. } => {
                "Availability changed while you were checking out. Please review your cart and try again."
                    .to_string()
            }
            _ => "Something went wrong. Your cart has not been changed.".to_string(),
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for CheckoutError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CheckoutError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => CheckoutError::Conflict {
                entity: field,
                reason: format!("'{}' already exists", value),
            },
            DbError::Conflict { entity, reason } => CheckoutError::Conflict { entity, reason },
            DbError::Busy => CheckoutError::Conflict {
                entity: "Database".into(),
                reason: "write lock not acquired within the busy timeout".into(),
            },
            DbError::Domain(core) => CheckoutError::Domain(core),
            DbError::Validation(v) => CheckoutError::Validation(v),
            other => {
                error!(error = %other, "Database failure");
                CheckoutError::Database(other.to_string())
            }
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { message, .. } => CheckoutError::PaymentDeclined(message),
            other => {
                error!(error = %other, "Payment gateway failure");
                CheckoutError::GatewayUnavailable(other.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::ConfigSaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for CheckoutError {
    fn from(err: url::ParseError) -> Self {
        CheckoutError::InvalidConfig(format!("gateway base_url: {}", err))
    }
}
