//! # Order Status Machine
//!
//! Which fulfilment and payment transitions are legal. The repository uses
//! these checks before its compare-and-set UPDATE.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  from \ to     processing  on_hold  dispatched  shipped  delivered  cxl │
//! │  processing        -          ✓         ✓          ✓         ✓       ✓  │
//! │  on_hold           ✓          -                                         │
//! │  dispatched                             -          ✓         ✓       ✓  │
//! │  shipped                                           -         ✓       ✓  │
//! │  delivered      (terminal)                                              │
//! │  cancelled      (terminal)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::{OrderStatus, PaymentStatus};

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on_hold",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Position along processing → dispatched → shipped → delivered.
    const fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Processing => Some(0),
            OrderStatus::Dispatched => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::OnHold | OrderStatus::Cancelled => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `self → to` is allowed.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;

        if self.is_terminal() || *self == to {
            return false;
        }

        match (self, to) {
            (OnHold, to) => to == Processing,
            (_, Cancelled) => true,
            (Processing, OnHold) => true,
            (_, OnHold) => false,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }

    /// Name of the timestamp column stamped when entering this status.
    pub const fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            OrderStatus::Processing => None,
            OrderStatus::OnHold => Some("on_hold_at"),
            OrderStatus::Dispatched => Some("dispatched_at"),
            OrderStatus::Shipped => Some("shipped_at"),
            OrderStatus::Delivered => Some("delivered_at"),
            OrderStatus::Cancelled => Some("cancelled_at"),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks an order status transition.
pub fn check_transition(order_id: &str, from: OrderStatus, to: OrderStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidStatusTransition {
            order_id: order_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Payment moves `pending → paid | failed` exactly once.
pub fn check_payment_transition(
    order_id: &str,
    from: PaymentStatus,
    to: PaymentStatus,
) -> CoreResult<()> {
    match (from, to) {
        (PaymentStatus::Pending, PaymentStatus::Paid | PaymentStatus::Failed) => Ok(()),
        _ => Err(CoreError::PaymentAlreadyResolved {
            order_id: order_id.to_string(),
            current: from.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
