//! # Catalog Repository
//!
//! Read access to products, variant dimensions and combinations, plus the
//! handful of writes the materializer and seeding need.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products ──< product_dimensions >── variant_dimensions ──< variant_values
//! │     │                                        │                    │     │
//! │     └──< combinations ──< combination_values ┴────────────────────┘     │
//! │                                                                         │
//! │  combinations: UNIQUE (product_id, canonical_key)                       │
//! │  combination_values: one row per (combination, dimension)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connections vs Pool
//! Each operation exists twice: a free function taking `&mut SqliteConnection`
//! (so it can run inside a caller's transaction) and a method on
//! [`CatalogRepository`] that borrows a pooled connection.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vela_core::pricing::SaleWindow;
use vela_core::validation::{validate_non_negative, validate_price_cents, validate_product_name};
use vela_core::variants::{canonical_key, format_label, Candidate, DimensionValues};
use vela_core::{Combination, Product, ProductType, VariantDimension, VariantValue};

const PRODUCT_COLUMNS: &str = "id, name, product_type, price_cents, sale_price_cents, \
     sale_starts_at, sale_ends_at, stock, image_url, created_at, updated_at";

const COMBINATION_COLUMNS: &str = "id, product_id, canonical_key, price_cents, sale_price_cents, \
     sale_starts_at, sale_ends_at, stock, created_at, updated_at";

// =============================================================================
// New Product
// =============================================================================

/// Input for [`insert_product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub product_type: ProductType,
    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub sale_window: Option<SaleWindow>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
}

impl NewProduct {
    /// A simple product with stock on the product row.
    pub fn simple(name: impl Into<String>, price_cents: i64, stock: i64) -> Self {
        NewProduct {
            name: name.into(),
            product_type: ProductType::Simple,
            price_cents,
            sale_price_cents: None,
            sale_window: None,
            stock: Some(stock),
            image_url: None,
        }
    }

    /// A variable product; its price fields are the combination template.
    pub fn variable(name: impl Into<String>, price_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            product_type: ProductType::Variable,
            price_cents,
            sale_price_cents: None,
            sale_window: None,
            stock: None,
            image_url: None,
        }
    }

    /// Sets a sale price, optionally bounded by a window.
    pub fn with_sale(mut self, sale_price_cents: i64, window: Option<SaleWindow>) -> Self {
        self.sale_price_cents = Some(sale_price_cents);
        self.sale_window = window;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
/// let product = catalog.get_product("uuid-here").await?;
/// let dims = catalog.declared_dimensions(&product.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    pub async fn get_combination(&self, id: &str) -> DbResult<Option<Combination>> {
        let mut conn = self.pool.acquire().await?;
        fetch_combination(&mut conn, id).await
    }

    pub async fn declared_dimensions(&self, product_id: &str) -> DbResult<Vec<DimensionValues>> {
        let mut conn = self.pool.acquire().await?;
        fetch_declared_dimensions(&mut conn, product_id).await
    }

    pub async fn existing_combination_keys(&self, product_id: &str) -> DbResult<HashSet<String>> {
        let mut conn = self.pool.acquire().await?;
        fetch_existing_keys(&mut conn, product_id).await
    }

    pub async fn combination_label(&self, combination_id: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        fetch_combination_label(&mut conn, combination_id).await
    }

    pub async fn list_combinations(&self, product_id: &str) -> DbResult<Vec<Combination>> {
        let mut conn = self.pool.acquire().await?;
        fetch_combinations(&mut conn, product_id).await
    }

    // -------------------------------------------------------------------------
    // Writes (seeding, tests, admin helpers)
    // -------------------------------------------------------------------------

    pub async fn insert_product(&self, product: &NewProduct) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        insert_product(&mut conn, product).await
    }

    /// Creates a dimension with its values in display order.
    pub async fn insert_dimension(
        &self,
        name: &str,
        values: &[&str],
    ) -> DbResult<DimensionValues> {
        let mut tx = self.pool.begin().await?;
        let dim = insert_dimension(&mut tx, name, values).await?;
        tx.commit().await?;
        Ok(dim)
    }

    /// Declares `dimension_id` on a product at `position`.
    pub async fn attach_dimension(
        &self,
        product_id: &str,
        dimension_id: &str,
        position: i64,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        attach_dimension(&mut conn, product_id, dimension_id, position).await
    }

    pub async fn set_combination_stock(&self, combination_id: &str, stock: i64) -> DbResult<()> {
        validate_non_negative("stock", stock)?;

        let result = sqlx::query("UPDATE combinations SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(combination_id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combination", combination_id));
        }

        Ok(())
    }

    /// Deletes combinations by id. Value links cascade.
    ///
    /// Returns the number of rows deleted. Never called automatically.
    pub async fn delete_combinations(&self, ids: &[String]) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_combinations(&mut conn, ids).await
    }
}

// =============================================================================
// Reads
// =============================================================================

pub async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub async fn fetch_combination(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Combination>> {
    let sql = format!("SELECT {} FROM combinations WHERE id = ?1", COMBINATION_COLUMNS);
    let combination = sqlx::query_as::<_, Combination>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(combination)
}

pub async fn fetch_combinations(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<Combination>> {
    let sql = format!(
        "SELECT {} FROM combinations WHERE product_id = ?1 ORDER BY canonical_key",
        COMBINATION_COLUMNS
    );
    let rows = sqlx::query_as::<_, Combination>(&sql)
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// The product's declared dimensions in position order, each with its
/// values in position order.
pub async fn fetch_declared_dimensions(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<DimensionValues>> {
    let dimensions = sqlx::query_as::<_, VariantDimension>(
        r#"
        SELECT d.id, d.name
        FROM product_dimensions pd
        INNER JOIN variant_dimensions d ON d.id = pd.dimension_id
        WHERE pd.product_id = ?1
        ORDER BY pd.position, d.name
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let values = sqlx::query_as::<_, VariantValue>(
        r#"
        SELECT v.id, v.dimension_id, v.value, v.position
        FROM variant_values v
        INNER JOIN product_dimensions pd ON pd.dimension_id = v.dimension_id
        WHERE pd.product_id = ?1
        ORDER BY v.position, v.value
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_dimension: BTreeMap<String, Vec<VariantValue>> = BTreeMap::new();
    for value in values {
        by_dimension
            .entry(value.dimension_id.clone())
            .or_default()
            .push(value);
    }

    Ok(dimensions
        .into_iter()
        .map(|dimension| {
            let values = by_dimension.remove(&dimension.id).unwrap_or_default();
            DimensionValues { dimension, values }
        })
        .collect())
}

/// Canonical keys of every stored combination of a product, rebuilt from the
/// value links rather than read from the stored key column.
pub async fn fetch_existing_keys(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<HashSet<String>> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        r#"
        SELECT c.id, cv.dimension_id, cv.value_id
        FROM combinations c
        INNER JOIN combination_values cv ON cv.combination_id = c.id
        WHERE c.product_id = ?1
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut pairs_by_combination: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for (combination_id, dimension_id, value_id) in rows {
        pairs_by_combination
            .entry(combination_id)
            .or_default()
            .push((dimension_id, value_id));
    }

    let mut keys: HashSet<String> = pairs_by_combination
        .values()
        .map(|pairs| canonical_key(pairs))
        .collect();

    // rows whose links are missing still occupy their stored key
    let stored: Vec<String> =
        sqlx::query_scalar("SELECT canonical_key FROM combinations WHERE product_id = ?1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;
    keys.extend(stored);

    debug!(product_id = %product_id, count = keys.len(), "Loaded existing combination keys");
    Ok(keys)
}

/// Display label such as "Color: Red / Size: M", in the product's dimension
/// order. `None` if the combination does not exist.
pub async fn fetch_combination_label(
    conn: &mut SqliteConnection,
    combination_id: &str,
) -> DbResult<Option<String>> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM combinations WHERE id = ?1")
        .bind(combination_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }

    let parts: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT d.name, v.value
        FROM combination_values cv
        INNER JOIN combinations c ON c.id = cv.combination_id
        INNER JOIN variant_dimensions d ON d.id = cv.dimension_id
        INNER JOIN variant_values v ON v.id = cv.value_id
        LEFT JOIN product_dimensions pd
            ON pd.product_id = c.product_id AND pd.dimension_id = cv.dimension_id
        WHERE cv.combination_id = ?1
        ORDER BY COALESCE(pd.position, 0), d.name
        "#,
    )
    .bind(combination_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(format_label(&parts)))
}

// =============================================================================
// Writes
// =============================================================================

pub async fn insert_product(conn: &mut SqliteConnection, new: &NewProduct) -> DbResult<Product> {
    validate_product_name(&new.name)?;
    validate_price_cents(new.price_cents)?;
    if let Some(sale) = new.sale_price_cents {
        validate_price_cents(sale)?;
    }
    if let Some(stock) = new.stock {
        validate_non_negative("stock", stock)?;
    }

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: new.name.trim().to_string(),
        product_type: new.product_type,
        price_cents: new.price_cents,
        sale_price_cents: new.sale_price_cents,
        sale_starts_at: new.sale_window.and_then(|w| w.from()),
        sale_ends_at: new.sale_window.and_then(|w| w.to()),
        stock: new.stock,
        image_url: new.image_url.clone(),
        created_at: now,
        updated_at: now,
    };

    debug!(id = %product.id, name = %product.name, product_type = product.product_type.as_str(), "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, product_type, price_cents, sale_price_cents,
            sale_starts_at, sale_ends_at, stock, image_url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.product_type)
    .bind(product.price_cents)
    .bind(product.sale_price_cents)
    .bind(product.sale_starts_at)
    .bind(product.sale_ends_at)
    .bind(product.stock)
    .bind(&product.image_url)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(product)
}

pub async fn insert_dimension(
    conn: &mut SqliteConnection,
    name: &str,
    values: &[&str],
) -> DbResult<DimensionValues> {
    let dimension = VariantDimension {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
    };

    sqlx::query("INSERT INTO variant_dimensions (id, name) VALUES (?1, ?2)")
        .bind(&dimension.id)
        .bind(&dimension.name)
        .execute(&mut *conn)
        .await?;

    let mut inserted = Vec::with_capacity(values.len());
    for (position, value) in values.iter().enumerate() {
        let value = VariantValue {
            id: Uuid::new_v4().to_string(),
            dimension_id: dimension.id.clone(),
            value: value.trim().to_string(),
            position: position as i64,
        };
        sqlx::query(
            "INSERT INTO variant_values (id, dimension_id, value, position) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&value.id)
        .bind(&value.dimension_id)
        .bind(&value.value)
        .bind(value.position)
        .execute(&mut *conn)
        .await?;
        inserted.push(value);
    }

    debug!(dimension = %dimension.name, values = inserted.len(), "Inserted variant dimension");

    Ok(DimensionValues {
        dimension,
        values: inserted,
    })
}

pub async fn attach_dimension(
    conn: &mut SqliteConnection,
    product_id: &str,
    dimension_id: &str,
    position: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO product_dimensions (product_id, dimension_id, position)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (product_id, dimension_id) DO UPDATE SET position = excluded.position
        "#,
    )
    .bind(product_id)
    .bind(dimension_id)
    .bind(position)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Inserts one combination and its value links, seeded from the product's
/// price and sale fields with zero stock.
///
/// Callers run this inside a transaction so the row never exists without
/// its links.
pub async fn insert_combination(
    conn: &mut SqliteConnection,
    product: &Product,
    candidate: &Candidate,
) -> DbResult<Combination> {
    let now = Utc::now();
    let combination = Combination {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        canonical_key: candidate.canonical_key.clone(),
        price_cents: product.price_cents,
        sale_price_cents: product.sale_price_cents,
        sale_starts_at: product.sale_starts_at,
        sale_ends_at: product.sale_ends_at,
        stock: 0,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO combinations (
            id, product_id, canonical_key, price_cents, sale_price_cents,
            sale_starts_at, sale_ends_at, stock, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&combination.id)
    .bind(&combination.product_id)
    .bind(&combination.canonical_key)
    .bind(combination.price_cents)
    .bind(combination.sale_price_cents)
    .bind(combination.sale_starts_at)
    .bind(combination.sale_ends_at)
    .bind(combination.stock)
    .bind(combination.created_at)
    .bind(combination.updated_at)
    .execute(&mut *conn)
    .await?;

    if !candidate.pairs.is_empty() {
        let mut links: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO combination_values (combination_id, dimension_id, value_id) ",
        );
        links.push_values(&candidate.pairs, |mut row, (dimension_id, value_id)| {
            row.push_bind(combination.id.clone())
                .push_bind(dimension_id.clone())
                .push_bind(value_id.clone());
        });
        links.build().execute(&mut *conn).await?;
    }

    Ok(combination)
}

pub async fn delete_combinations(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM combinations WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");

    let result = query.build().execute(&mut *conn).await?;
    debug!(requested = ids.len(), deleted = result.rows_affected(), "Deleted combinations");
    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================
