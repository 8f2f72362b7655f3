//! # Cart Resolver
//!
//! Turns client-held cart items into priced, stock-checked lines.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartItem { product_id, combination_id?, quantity, is_selected }       │
//! │       │                                                                 │
//! │       │  skip unselected, validate quantity                             │
//! │       ▼                                                                 │
//! │  Product ──────────── absent → NotFound                                │
//! │       │                                                                 │
//! │       ├─ variable + combination → Combination (must belong to product) │
//! │       ├─ simple, no combination → the product itself                   │
//! │       └─ anything else          → Forbidden                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ResolvedLine { unit_price (active price at now), available_stock }    │
//! │       │                                                                 │
//! │       │  available <= 0 or quantity > available → unavailable          │
//! │       ▼                                                                 │
//! │  Abort: fail with InsufficientStock    Drop: set the line aside        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go through whatever connection the caller passes, so checkout
//! resolves inside its write transaction and storefront previews resolve on
//! the pool.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;
use ts_rs::TS;

use crate::error::CheckoutResult;
use vela_core::pricing::Priced;
use vela_core::stock::StockTarget;
use vela_core::validation::{validate_price_cents, validate_quantity};
use vela_core::{CartItem, CoreError, Money, ProductType, MAX_CART_ITEMS};
use vela_db::repository::catalog;
use vela_db::Database;

/// What to do with lines that cannot be fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailablePolicy {
    /// Fail the whole resolution.
    Abort,
    /// Remove them and carry on with the rest.
    Drop,
}

/// A cart line with its price and stock locked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ResolvedLine {
    pub product_id: String,
    pub combination_id: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub available_stock: i64,
    pub title: String,
    pub image_url: Option<String>,
    /// "Color: Red / Size: M" for combination lines.
    pub combination_label: Option<String>,
}

impl ResolvedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// The row this line draws stock from.
    pub fn stock_target(&self) -> StockTarget {
        StockTarget::for_line(&self.product_id, self.combination_id.as_deref())
    }

    /// Name shown to the shopper, including the variant when there is one.
    pub fn display_name(&self) -> String {
        match &self.combination_label {
            Some(label) if !label.is_empty() => format!("{} ({})", self.title, label),
            _ => self.title.clone(),
        }
    }

    fn is_available(&self) -> bool {
        self.available_stock > 0 && self.quantity <= self.available_stock
    }
}

/// A line set aside under [`UnavailablePolicy::Drop`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct UnavailableLine {
    pub product_id: String,
    pub combination_id: Option<String>,
    pub title: String,
    pub requested: i64,
    pub available: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ResolvedCart {
    pub lines: Vec<ResolvedLine>,
    pub unavailable: Vec<UnavailableLine>,
}

impl ResolvedCart {
    /// Σ unit_price × quantity over the lines.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(ResolvedLine::line_total).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves carts on the pool, for previews outside a checkout.
#[derive(Debug, Clone)]
pub struct CartResolver {
    db: Database,
}

impl CartResolver {
    pub fn new(db: Database) -> Self {
        CartResolver { db }
    }

    pub async fn resolve(
        &self,
        items: &[CartItem],
        policy: UnavailablePolicy,
    ) -> CheckoutResult<ResolvedCart> {
        let mut conn = self.db.pool().acquire().await.map_err(vela_db::DbError::from)?;
        resolve_cart(&mut conn, items, policy, Utc::now()).await
    }
}

/// Resolves `items` against the catalog as of `now`.
///
/// ## Errors
/// - `ProductNotFound` / `CombinationNotFound` for dangling references,
///   including a combination that belongs to another product
/// - `CombinationRequired` / `CombinationNotAllowed` for a line that does not
///   match the product's type
/// - `InsufficientStock` under `Abort` when any line cannot be fulfilled
/// - `EmptyCart` when nothing is left to buy
/// - `OutOfRange` for a stored price above `MAX_PRICE_CENTS`
pub async fn resolve_cart(
    conn: &mut SqliteConnection,
    items: &[CartItem],
    policy: UnavailablePolicy,
    now: DateTime<Utc>,
) -> CheckoutResult<ResolvedCart> {
    let selected: Vec<&CartItem> = items.iter().filter(|i| i.is_selected).collect();

    if selected.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        }
        .into());
    }

    let mut cart = ResolvedCart::default();
    for item in selected {
        validate_quantity(item.quantity)?;
        let line = resolve_line(conn, item, now).await?;
        validate_price_cents(line.unit_price.cents())?;

        if line.is_available() {
            cart.lines.push(line);
            continue;
        }

        if policy == UnavailablePolicy::Abort {
            return Err(CoreError::InsufficientStock {
                item: line.display_name(),
                available: line.available_stock.max(0),
                requested: line.quantity,
            }
            .into());
        }

        debug!(product_id = %line.product_id, available = line.available_stock, "Dropping unavailable line");
        cart.unavailable.push(UnavailableLine {
            product_id: line.product_id,
            combination_id: line.combination_id,
            title: line.title,
            requested: line.quantity,
            available: line.available_stock.max(0),
        });
    }

    if policy == UnavailablePolicy::Abort {
        check_combined_demand(&cart.lines)?;
    }

    if cart.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    Ok(cart)
}

/// Repeated lines for the same stock row must fit together, not just one
/// at a time.
fn check_combined_demand(lines: &[ResolvedLine]) -> CheckoutResult<()> {
    let mut demand: BTreeMap<StockTarget, (i64, &ResolvedLine)> = BTreeMap::new();
    for line in lines {
        let entry = demand.entry(line.stock_target()).or_insert((0, line));
        entry.0 += line.quantity;
    }

    for (requested, line) in demand.into_values() {
        if requested > line.available_stock {
            return Err(CoreError::InsufficientStock {
                item: line.display_name(),
                available: line.available_stock,
                requested,
            }
            .into());
        }
    }

    Ok(())
}

async fn resolve_line(
    conn: &mut SqliteConnection,
    item: &CartItem,
    now: DateTime<Utc>,
) -> CheckoutResult<ResolvedLine> {
    let product = catalog::fetch_product(conn, &item.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

    match (product.product_type, item.combination_id.as_deref()) {
        (ProductType::Variable, Some(combination_id)) => {
            let combination = catalog::fetch_combination(conn, combination_id)
                .await?
                .filter(|c| c.product_id == product.id)
                .ok_or_else(|| CoreError::CombinationNotFound {
                    product_id: product.id.clone(),
                    combination_id: combination_id.to_string(),
                })?;
            let label = catalog::fetch_combination_label(conn, &combination.id).await?;

            Ok(ResolvedLine {
                product_id: product.id.clone(),
                combination_id: Some(combination.id.clone()),
                quantity: item.quantity,
                unit_price: combination.active_price(now),
                available_stock: combination.stock,
                title: product.name,
                image_url: product.image_url,
                combination_label: label,
            })
        }
        (ProductType::Variable, None) => Err(CoreError::CombinationRequired {
            product_id: product.id,
        }
        .into()),
        (ProductType::Simple, Some(_)) => Err(CoreError::CombinationNotAllowed {
            product_id: product.id,
        }
        .into()),
        (ProductType::Simple, None) => Ok(ResolvedLine {
            product_id: product.id.clone(),
            combination_id: None,
            quantity: item.quantity,
            unit_price: product.active_price(now),
            available_stock: product.available_stock(),
            title: product.name.clone(),
            image_url: product.image_url.clone(),
            combination_label: None,
        }),
    }
}
