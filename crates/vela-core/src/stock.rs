//! # Stock Deltas
//!
//! Turns resolved cart lines into the per-row decrements the reconciler
//! applies. Duplicate lines for the same product or combination collapse into
//! one delta so the batched UPDATE touches each row exactly once.
//!
//! ```text
//!   lines                               deltas
//!   ─────────────────────────           ─────────────────────────
//!   Mug            × 2        ─┐        products:     [(mug, 3)]
//!   Mug            × 1        ─┘
//!   Tee (Red / M)  × 1        ─┐        combinations: [(tee-red-m, 2)]
//!   Tee (Red / M)  × 1        ─┘
//! ```

use std::collections::BTreeMap;

/// Which stock column a line draws from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StockTarget {
    /// `products.stock` of a simple product.
    Product(String),
    /// `combinations.stock` of a variable product's combination.
    Combination(String),
}

impl StockTarget {
    /// Variable lines draw from their combination; simple lines from the product.
    pub fn for_line(product_id: &str, combination_id: Option<&str>) -> Self {
        match combination_id {
            Some(id) => StockTarget::Combination(id.to_string()),
            None => StockTarget::Product(product_id.to_string()),
        }
    }
}

/// Aggregated decrements, sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDeltas {
    pub products: Vec<(String, i64)>,
    pub combinations: Vec<(String, i64)>,
}

impl StockDeltas {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.combinations.is_empty()
    }

    /// Total number of rows the deltas touch.
    pub fn row_count(&self) -> usize {
        self.products.len() + self.combinations.len()
    }
}

/// Sums quantities per stock row.
///
/// ## Example
/// ```rust
/// use vela_core::stock::{compute_deltas, StockTarget};
///
/// let deltas = compute_deltas(vec![
///     (StockTarget::Product("mug".into()), 2),
///     (StockTarget::Product("mug".into()), 1),
/// ]);
/// assert_eq!(deltas.products, vec![("mug".to_string(), 3)]);
/// ```
pub fn compute_deltas<I>(lines: I) -> StockDeltas
where
    I: IntoIterator<Item = (StockTarget, i64)>,
{
    let mut products: BTreeMap<String, i64> = BTreeMap::new();
    let mut combinations: BTreeMap<String, i64> = BTreeMap::new();

    for (target, qty) in lines {
        match target {
            StockTarget::Product(id) => *products.entry(id).or_default() += qty,
            StockTarget::Combination(id) => *combinations.entry(id).or_default() += qty,
        }
    }

    StockDeltas {
        products: products.into_iter().collect(),
        combinations: combinations.into_iter().collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_lines_collapse() {
        let deltas = compute_deltas(vec![
            (StockTarget::for_line("tee", Some("tee-red-m")), 1),
            (StockTarget::for_line("mug", None), 2),
            (StockTarget::for_line("tee", Some("tee-red-m")), 1),
            (StockTarget::for_line("tee", Some("tee-blue-s")), 4),
            (StockTarget::for_line("mug", None), 1),
        ]);

        assert_eq!(deltas.products, vec![("mug".to_string(), 3)]);
        assert_eq!(
            deltas.combinations,
            vec![("tee-blue-s".to_string(), 4), ("tee-red-m".to_string(), 2)]
        );
        assert_eq!(deltas.row_count(), 3);
    }

    #[test]
    fn test_empty_input() {
        let deltas = compute_deltas(Vec::new());
        assert!(deltas.is_empty());
        assert_eq!(deltas.row_count(), 0);
    }
}
