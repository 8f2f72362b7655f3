//! # Variant Combinations
//!
//! Pure planning for the combination materializer: expand a product's
//! declared dimensions into every concrete point, key each point, and work
//! out which points still need a row.
//!
//! ## Expansion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Color: [Red, Blue]      Size: [S, M]                                   │
//! │                                                                         │
//! │        cartesian_product                                                │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  (Red,S) (Red,M) (Blue,S) (Blue,M)        space = 2 × 2 = 4             │
//! │              │                                                          │
//! │              ▼  canonical_key (sorted by dimension id, then value id)   │
//! │  "d-color=v-red|d-size=v-s"   ...                                       │
//! │              │                                                          │
//! │              ▼  minus keys already stored for the product               │
//! │  CombinationPlan { candidates: [...] }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The work is O(∏ |values|), so planning refuses spaces above a cap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{VariantDimension, VariantValue};

/// One (dimension id, value id) pair of a combination.
pub type ValuePair = (String, String);

/// A declared dimension with its ordered values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionValues {
    pub dimension: VariantDimension,
    pub values: Vec<VariantValue>,
}

// =============================================================================
// Cartesian Product
// =============================================================================

/// Expands ordered dimensions into every combination of their values.
///
/// - No dimensions: the single empty combination.
/// - Any dimension with no values: no combinations.
///
/// Output order follows dimension order, then value order.
///
/// ## Example
/// ```rust
/// use vela_core::variants::cartesian_product;
///
/// assert_eq!(cartesian_product(&[]), vec![Vec::<(String, String)>::new()]);
/// ```
pub fn cartesian_product(dims: &[DimensionValues]) -> Vec<Vec<ValuePair>> {
    match dims.split_first() {
        None => vec![Vec::new()],
        Some((head, rest)) => {
            let tails = cartesian_product(rest);
            let mut out = Vec::with_capacity(head.values.len() * tails.len());
            for value in &head.values {
                for tail in &tails {
                    let mut combo = Vec::with_capacity(tail.len() + 1);
                    combo.push((head.dimension.id.clone(), value.id.clone()));
                    combo.extend(tail.iter().cloned());
                    out.push(combo);
                }
            }
            out
        }
    }
}

/// Number of combinations the dimensions expand to (saturating).
///
/// Computed without expanding, so oversized spaces can be rejected cheaply.
pub fn combination_space_size(dims: &[DimensionValues]) -> u64 {
    dims.iter()
        .fold(1u64, |acc, d| acc.saturating_mul(d.values.len() as u64))
}

// =============================================================================
// Canonical Key
// =============================================================================

/// Order-independent identity of a combination.
///
/// Pairs are sorted by dimension id, then value id, and rendered as
/// `dim=value` joined with `|`.
///
/// ## Example
/// ```rust
/// use vela_core::variants::canonical_key;
///
/// let a = canonical_key(&[("size".into(), "m".into()), ("color".into(), "red".into())]);
/// let b = canonical_key(&[("color".into(), "red".into()), ("size".into(), "m".into())]);
/// assert_eq!(a, b);
/// assert_eq!(a, "color=red|size=m");
/// ```
pub fn canonical_key(pairs: &[ValuePair]) -> String {
    let mut sorted: Vec<&ValuePair> = pairs.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .map(|(dim, value)| format!("{}={}", dim, value))
        .collect::<Vec<_>>()
        .join("|")
}

/// Renders a display label such as `"Color: Red / Size: M"`.
pub fn format_label<S: AsRef<str>>(parts: &[(S, S)]) -> String {
    parts
        .iter()
        .map(|(name, value)| format!("{}: {}", name.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join(" / ")
}

// =============================================================================
// Planning
// =============================================================================

/// A combination that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub canonical_key: String,
    pub pairs: Vec<ValuePair>,
}

/// Output of [`plan_missing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinationPlan {
    /// Full size of the variant space.
    pub space_size: u64,
    /// Points with no stored row, in expansion order.
    pub candidates: Vec<Candidate>,
    /// Points skipped because a row already exists.
    pub already_present: usize,
}

/// Works out which combinations of `dims` are missing from `existing_keys`.
///
/// A product with no declared dimensions plans nothing: the empty
/// combination is never materialized.
///
/// ## Errors
/// `CombinationSpaceTooLarge` when the space exceeds `max_combinations`.
pub fn plan_missing(
    product_id: &str,
    dims: &[DimensionValues],
    existing_keys: &HashSet<String>,
    max_combinations: u64,
) -> CoreResult<CombinationPlan> {
    if dims.is_empty() {
        return Ok(CombinationPlan::default());
    }

    let space_size = combination_space_size(dims);
    if space_size > max_combinations {
        return Err(CoreError::CombinationSpaceTooLarge {
            product_id: product_id.to_string(),
            size: space_size,
            max: max_combinations,
        });
    }

    let mut seen = HashSet::new();
    let mut plan = CombinationPlan {
        space_size,
        ..Default::default()
    };

    for pairs in cartesian_product(dims) {
        let key = canonical_key(&pairs);
        if existing_keys.contains(&key) {
            plan.already_present += 1;
            continue;
        }
        // duplicate value ids within a dimension collapse to one point
        if !seen.insert(key.clone()) {
            continue;
        }
        plan.candidates.push(Candidate {
            canonical_key: key,
            pairs,
        });
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(id: &str, values: &[&str]) -> DimensionValues {
        DimensionValues {
            dimension: VariantDimension {
                id: id.to_string(),
                name: id.to_uppercase(),
            },
            values: values
                .iter()
                .enumerate()
                .map(|(i, v)| VariantValue {
                    id: v.to_string(),
                    dimension_id: id.to_string(),
                    value: v.to_uppercase(),
                    position: i as i64,
                })
                .collect(),
        }
    }

    #[test]
    fn test_cartesian_two_by_three() {
        let dims = vec![dim("color", &["red", "blue"]), dim("size", &["s", "m", "l"])];
        let combos = cartesian_product(&dims);
        assert_eq!(combos.len(), 6);
        assert_eq!(
            combos[0],
            vec![
                ("color".to_string(), "red".to_string()),
                ("size".to_string(), "s".to_string())
            ]
        );
        assert_eq!(combos[5][0].1, "blue");
        assert_eq!(combos[5][1].1, "l");
    }

    #[test]
    fn test_cartesian_edge_cases() {
        assert_eq!(cartesian_product(&[]).len(), 1);
        assert!(cartesian_product(&[]).remove(0).is_empty());

        let dims = vec![dim("color", &["red"]), dim("size", &[])];
        assert!(cartesian_product(&dims).is_empty());
        assert_eq!(combination_space_size(&dims), 0);
    }

    #[test]
    fn test_keys_are_unique_across_space() {
        let dims = vec![
            dim("a", &["1", "2", "3"]),
            dim("b", &["1", "2"]),
            dim("c", &["x", "y"]),
        ];
        let keys: HashSet<String> = cartesian_product(&dims)
            .iter()
            .map(|p| canonical_key(p))
            .collect();
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn test_plan_skips_existing() {
        let dims = vec![dim("color", &["red", "blue"]), dim("size", &["s", "m"])];
        let existing: HashSet<String> = ["color=red|size=s".to_string()].into_iter().collect();

        let plan = plan_missing("p1", &dims, &existing, 2_500).unwrap();
        assert_eq!(plan.space_size, 4);
        assert_eq!(plan.already_present, 1);
        assert_eq!(plan.candidates.len(), 3);
        assert!(plan
            .candidates
            .iter()
            .all(|c| c.canonical_key != "color=red|size=s"));
    }

    #[test]
    fn test_plan_with_everything_present_is_empty() {
        let dims = vec![dim("color", &["red", "blue"])];
        let existing: HashSet<String> = cartesian_product(&dims)
            .iter()
            .map(|p| canonical_key(p))
            .collect();
        let plan = plan_missing("p1", &dims, &existing, 2_500).unwrap();
        assert!(plan.candidates.is_empty());
        assert_eq!(plan.already_present, 2);
    }

    #[test]
    fn test_plan_no_dimensions_plans_nothing() {
        let plan = plan_missing("p1", &[], &HashSet::new(), 2_500).unwrap();
        assert!(plan.candidates.is_empty());
        assert_eq!(plan.space_size, 0);
    }

    #[test]
    fn test_plan_rejects_oversized_space() {
        let values: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let dims = vec![dim("a", &refs), dim("b", &refs)];

        let err = plan_missing("p2", &dims, &HashSet::new(), 2_500).unwrap_err();
        assert!(matches!(
            err,
            CoreError::CombinationSpaceTooLarge { size: 10_000, max: 2_500, .. }
        ));
    }

    #[test]
    fn test_format_label() {
        let label = format_label(&[("Color", "Red"), ("Size", "M")]);
        assert_eq!(label, "Color: Red / Size: M");
    }
}
