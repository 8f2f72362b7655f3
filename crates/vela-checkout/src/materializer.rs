//! # Combination Materializer
//!
//! Expands a variable product's declared dimensions into stored combination
//! rows, inserting only the points that do not exist yet.
//!
//! ## Materialization Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product (variable)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  declared dimensions ── none → nothing to do                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_missing(dims, existing keys, cap) ── too large → Forbidden        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each candidate:                                                    │
//! │    BEGIN IMMEDIATE                                                      │
//! │      INSERT combination (template price/sale, stock 0)                  │
//! │      INSERT combination_values links                                    │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │    ok                → inserted                                         │
//! │    UNIQUE violation  → skipped_existing (raced another materializer)    │
//! │    anything else     → failed, rolled back, next candidate              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{info, instrument, warn};
use ts_rs::TS;

use crate::error::CheckoutResult;
use vela_core::variants::{plan_missing, Candidate};
use vela_core::{CoreError, Product, DEFAULT_MAX_COMBINATIONS};
use vela_db::repository::catalog;
use vela_db::{Database, DbError, DbResult};

/// A candidate that could not be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MaterializeFailure {
    pub canonical_key: String,
    pub reason: String,
}

/// Outcome of one materialization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MaterializeReport {
    pub product_id: String,
    /// Size of the full variant space.
    pub space_size: u64,
    pub inserted: usize,
    /// Points that already had a row, before or during this run.
    pub skipped_existing: usize,
    pub failed: Vec<MaterializeFailure>,
}

#[derive(Debug, Clone)]
pub struct Materializer {
    db: Database,
    max_combinations: u64,
}

impl Materializer {
    pub fn new(db: Database) -> Self {
        Materializer {
            db,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
        }
    }

    pub fn with_max_combinations(mut self, max: u64) -> Self {
        self.max_combinations = max;
        self
    }

    /// Inserts every missing combination of `product_id`.
    ///
    /// ## Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `NotVariable` for simple products
    /// - `CombinationSpaceTooLarge` if the variant space exceeds the cap
    ///
    /// Per-candidate failures do not fail the run; they are reported.
    #[instrument(skip(self))]
    pub async fn materialize_combinations(&self, product_id: &str) -> CheckoutResult<MaterializeReport> {
        let catalog_repo = self.db.catalog();

        let product = catalog_repo
            .get_product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !product.is_variable() {
            return Err(CoreError::NotVariable {
                product_id: product.id,
            }
            .into());
        }

        let dims = catalog_repo.declared_dimensions(&product.id).await?;
        if dims.is_empty() {
            info!(product_id = %product.id, "No declared dimensions, nothing to materialize");
            return Ok(MaterializeReport {
                product_id: product.id,
                ..Default::default()
            });
        }

        let existing = catalog_repo.existing_combination_keys(&product.id).await?;
        let plan = plan_missing(&product.id, &dims, &existing, self.max_combinations).map_err(|e| {
            warn!(product_id = %product.id, error = %e, "Refusing to materialize");
            e
        })?;

        let mut report = MaterializeReport {
            product_id: product.id.clone(),
            space_size: plan.space_size,
            skipped_existing: plan.already_present,
            ..Default::default()
        };

        for candidate in &plan.candidates {
            match self.insert_candidate(&product, candidate).await {
                Ok(()) => report.inserted += 1,
                Err(DbError::UniqueViolation { .. }) => report.skipped_existing += 1,
                Err(e) => {
                    warn!(
                        product_id = %product.id,
                        key = %candidate.canonical_key,
                        error = %e,
                        "Failed to insert combination"
                    );
                    report.failed.push(MaterializeFailure {
                        canonical_key: candidate.canonical_key.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            product_id = %product.id,
            space = report.space_size,
            inserted = report.inserted,
            skipped = report.skipped_existing,
            failed = report.failed.len(),
            "Combinations materialized"
        );

        Ok(report)
    }

    /// Deletes combinations by id; their value links cascade.
    ///
    /// Never called by materialization itself.
    #[instrument(skip(self))]
    pub async fn delete_combinations(&self, ids: &[String]) -> CheckoutResult<u64> {
        let deleted = self.db.catalog().delete_combinations(ids).await?;
        info!(requested = ids.len(), deleted, "Combinations deleted");
        Ok(deleted)
    }

    async fn insert_candidate(&self, product: &Product, candidate: &Candidate) -> DbResult<()> {
        let mut tx = self.db.begin_write().await?;
        catalog::insert_combination(&mut tx, product, candidate).await?;
        tx.commit().await?;
        Ok(())
    }
}
