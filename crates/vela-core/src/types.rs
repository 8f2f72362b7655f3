//! # Domain Types
//!
//! Core domain types used throughout Vela Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │──►│  Combination    │──►│ CombinationValue│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_type   │   │  canonical_key  │   │  dimension_id   │       │
//! │  │  price / sale   │   │  price / sale   │   │  value_id       │       │
//! │  │  stock?         │   │  stock          │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │     Order       │──►│   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code           │   │  tracking_id    │   │  title          │       │
//! │  │  amount_type    │   │  status         │   │  price_cents    │       │
//! │  │  usage_limit?   │   │  payment_status │   │  combinations   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (coupon `code`, order `tracking_id`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::{Priced, SaleWindow};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2000 bps = 20% (e.g., UK VAT). Prices are tax-inclusive, so the rate is
/// only used to report the tax already contained in a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// Whether a product is sold directly or only through its combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Sold as-is; stock lives on the product row.
    Simple,
    /// Sold by variant; stock and price live on each combination.
    Variable,
}

impl ProductType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, copied onto order items at purchase.
    pub name: String,

    pub product_type: ProductType,

    /// Base price in cents. For variable products this is the template
    /// copied onto newly materialized combinations.
    pub price_cents: i64,

    /// Optional sale price in cents.
    pub sale_price_cents: Option<i64>,

    /// Sale window start (open when absent).
    #[ts(as = "Option<String>")]
    pub sale_starts_at: Option<DateTime<Utc>>,

    /// Sale window end (open when absent).
    #[ts(as = "Option<String>")]
    pub sale_ends_at: Option<DateTime<Utc>>,

    /// Stock on hand. Only meaningful for simple products; NULL reads as 0.
    pub stock: Option<i64>,

    pub image_url: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the base price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        self.product_type == ProductType::Variable
    }

    /// Stock available for a simple product (NULL reads as 0).
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock.unwrap_or(0)
    }
}

impl Priced for Product {
    fn base_price(&self) -> Money {
        self.price()
    }

    fn sale_price(&self) -> Option<Money> {
        self.sale_price_cents.map(Money::from_cents)
    }

    fn sale_window(&self) -> Option<SaleWindow> {
        SaleWindow::from_bounds(self.sale_starts_at, self.sale_ends_at)
    }
}

// =============================================================================
// Variant Dimensions
// =============================================================================

/// A variant axis such as "Color" or "Size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VariantDimension {
    pub id: String,
    pub name: String,
}

/// One value of a dimension, e.g. "Red". `position` orders values for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VariantValue {
    pub id: String,
    pub dimension_id: String,
    pub value: String,
    pub position: i64,
}

// =============================================================================
// Combination
// =============================================================================

/// A concrete, stockable point in a variable product's variant space.
///
/// Rows are unique per `(product_id, canonical_key)`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Combination {
    pub id: String,
    pub product_id: String,

    /// Order-independent key built from the combination's value ids.
    pub canonical_key: String,

    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub sale_starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub sale_ends_at: Option<DateTime<Utc>>,

    /// Stock on hand (never negative).
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Priced for Combination {
    fn base_price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    fn sale_price(&self) -> Option<Money> {
        self.sale_price_cents.map(Money::from_cents)
    }

    fn sale_window(&self) -> Option<SaleWindow> {
        SaleWindow::from_bounds(self.sale_starts_at, self.sale_ends_at)
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A client-held cart line submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    pub combination_id: Option<String>,
    pub quantity: i64,
    /// Unselected items stay in the cart but are ignored at checkout.
    #[serde(default = "default_selected")]
    pub is_selected: bool,
}

fn default_selected() -> bool {
    true
}

impl CartItem {
    /// A selected line for a simple product.
    pub fn simple(product_id: impl Into<String>, quantity: i64) -> Self {
        CartItem {
            product_id: product_id.into(),
            combination_id: None,
            quantity,
            is_selected: true,
        }
    }

    /// A selected line for one combination of a variable product.
    pub fn variant(
        product_id: impl Into<String>,
        combination_id: impl Into<String>,
        quantity: i64,
    ) -> Self {
        CartItem {
            product_id: product_id.into(),
            combination_id: Some(combination_id.into()),
            quantity,
            is_selected: true,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon's `amount` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    /// Whole percent of the order amount (0..=100).
    Percentage,
    /// Fixed amount in cents.
    Fixed,
}

/// A discount code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub code: String,
    pub amount: i64,
    pub amount_type: AmountType,
    /// Minimum order amount in cents for the coupon to apply.
    pub min_order_cents: i64,
    /// Remaining redemptions. `None` means unlimited; never negative.
    pub usage_limit: Option<i64>,
    /// Number of successful redemptions.
    pub used_count: i64,
    #[ts(as = "Option<String>")]
    pub valid_from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub valid_to: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
///
/// ```text
///   processing ──► dispatched ──► shipped ──► delivered
///     │  ▲   │          │            │
///     ▼  │   └──────────┴────────────┴──► cancelled
///   on_hold   (returns only to processing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    OnHold,
    Dispatched,
    Shipped,
    Delivered,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Processing
    }
}

/// Payment state of an order. Confirmation happens outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the payment gateway.
    Card,
    /// Paid to the courier; marked paid by the caller on delivery.
    CashOnDelivery,
}

impl PaymentMethod {
    #[inline]
    pub const fn requires_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }
}

// =============================================================================
// Shipping Address
// =============================================================================

/// Where an order ships to. Stored on the order as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-facing identifier, independent of `id`.
    pub tracking_id: String,
    /// `None` for guest checkout.
    pub user_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub shipping_address: ShippingAddress,
    pub subtotal_cents: i64,
    pub shipping_fee_cents: i64,
    /// Tax contained in the subtotal (informational).
    pub taxes_cents: i64,
    pub discount_cents: i64,
    pub coupon_code: Option<String>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub on_hold_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line of an order.
/// Uses snapshot pattern to freeze product data at time of purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    /// Set to NULL if the product is later deleted.
    pub product_id: Option<String>,
    pub combination_id: Option<String>,
    /// Product name at time of purchase (frozen).
    pub title: String,
    pub image_url: Option<String>,
    /// Unit price in cents at time of purchase (frozen).
    pub price_cents: i64,
    pub quantity: i64,
    /// Flattened variant label, e.g. "Color: Red / Size: M".
    pub combinations: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
