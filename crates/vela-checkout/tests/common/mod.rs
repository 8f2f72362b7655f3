//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use vela_checkout::{CheckoutConfig, CheckoutRequest, CheckoutService, PaymentGateway};
use vela_checkout::GuestSession;
use vela_core::variants::plan_missing;
use vela_core::{CartItem, Combination, PaymentMethod, Product, ShippingAddress};
use vela_db::repository::catalog;
use vela_db::{Database, DbConfig, NewProduct};

/// A file-backed database with room for concurrent writers.
///
/// Keep the `TempDir` alive for as long as the database is used.
pub async fn file_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("vela.db"))
        .max_connections(8)
        .busy_timeout(Duration::from_secs(30));
    let db = Database::new(config).await.unwrap();
    (dir, db)
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Grace Hopper".into(),
        line1: "1 Compiler Way".into(),
        line2: Some("Floor 2".into()),
        city: "Arlington".into(),
        postal_code: "22201".into(),
        country: "US".into(),
        phone: Some("+1 555 0100".into()),
    }
}

pub fn request(items: Vec<CartItem>, method: PaymentMethod, coupon: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        items,
        shipping_address: address(),
        payment_method: method,
        coupon_code: coupon.map(String::from),
    }
}

pub fn config_without_shipping() -> CheckoutConfig {
    let mut config = CheckoutConfig::default();
    config.store.shipping_fee_cents = 0;
    config
}

pub fn service(db: &Database, config: &CheckoutConfig, gateway: Arc<dyn PaymentGateway>) -> Arc<CheckoutService> {
    Arc::new(CheckoutService::new(db.clone(), config, Arc::new(GuestSession), gateway))
}

/// A variable product with the given dimensions, fully materialized, every
/// combination stocked at `stock`.
pub async fn variable_product(
    db: &Database,
    name: &str,
    dims: &[(&str, &[&str])],
    stock: i64,
) -> (Product, Vec<Combination>) {
    let catalog_repo = db.catalog();
    let product = catalog_repo
        .insert_product(&NewProduct::variable(name, 2_000))
        .await
        .unwrap();
    for (position, (dim_name, values)) in dims.iter().enumerate() {
        let dim = catalog_repo
            .insert_dimension(&format!("{} {}", name, dim_name), values)
            .await
            .unwrap();
        catalog_repo
            .attach_dimension(&product.id, &dim.dimension.id, position as i64)
            .await
            .unwrap();
    }

    let declared = catalog_repo.declared_dimensions(&product.id).await.unwrap();
    let plan = plan_missing(&product.id, &declared, &HashSet::new(), 1_000).unwrap();
    let mut tx = db.begin_write().await.unwrap();
    for candidate in &plan.candidates {
        catalog::insert_combination(&mut tx, &product, candidate).await.unwrap();
    }
    tx.commit().await.unwrap();

    let combos = catalog_repo.list_combinations(&product.id).await.unwrap();
    for c in &combos {
        catalog_repo.set_combination_stock(&c.id, stock).await.unwrap();
    }
    let combos = catalog_repo.list_combinations(&product.id).await.unwrap();
    (product, combos)
}
