//! # Seed Data Generator
//!
//! Populates the database with a small storefront catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./vela_dev.db
//! cargo run -p vela-db --bin seed
//!
//! # Specify database path and stock per item
//! cargo run -p vela-db --bin seed -- --db ./data/vela.db --stock 25
//! ```
//!
//! ## Generated Data
//! - Simple products (mugs, posters, stickers) with stock
//! - Variable apparel products declaring Color × Size, with every
//!   combination materialized and stocked
//! - A handful of coupons (percentage, fixed, limited, expired)

use std::collections::HashSet;
use std::env;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vela_core::coupon::NewCoupon;
use vela_core::pricing::SaleWindow;
use vela_core::variants::plan_missing;
use vela_core::{AmountType, DEFAULT_MAX_COMBINATIONS};
use vela_db::repository::catalog::{self, NewProduct};
use vela_db::{Database, DbConfig};

/// Simple products: (name, price in cents)
const SIMPLE_PRODUCTS: &[(&str, i64)] = &[
    ("Enamel Mug", 1_400),
    ("Stoneware Mug", 1_800),
    ("Travel Tumbler", 2_900),
    ("Poster A3", 1_200),
    ("Poster A2", 1_900),
    ("Sticker Pack", 500),
    ("Tote Bag", 1_600),
    ("Notebook", 900),
];

/// Variable products: (name, template price in cents)
const VARIABLE_PRODUCTS: &[(&str, i64)] = &[
    ("Classic Tee", 2_500),
    ("Heavyweight Hoodie", 5_500),
    ("Crew Socks", 1_100),
];

const COLORS: &[&str] = &["Black", "White", "Navy", "Forest"];
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vela=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut stock: i64 = 20;
    let mut db_path = String::from("./vela_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vela Commerce Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stock <N>    Stock per product/combination (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./vela_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, stock, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        warn!(existing, "Database already has products; delete the file to regenerate");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let catalog_repo = db.catalog();

    // Simple products, every third one on an open-ended sale
    for (idx, (name, price)) in SIMPLE_PRODUCTS.iter().enumerate() {
        let mut new = NewProduct::simple(*name, *price, stock);
        if idx % 3 == 0 {
            let window = SaleWindow::new(Some(Utc::now() - Duration::days(1)), None)?;
            new = new.with_sale(price * 80 / 100, Some(window));
        }
        catalog_repo.insert_product(&new).await?;
    }

    let color = catalog_repo.insert_dimension("Color", COLORS).await?;
    let size = catalog_repo.insert_dimension("Size", SIZES).await?;

    let mut combinations = 0usize;
    for (name, price) in VARIABLE_PRODUCTS {
        let product = catalog_repo
            .insert_product(&NewProduct::variable(*name, *price))
            .await?;
        catalog_repo
            .attach_dimension(&product.id, &color.dimension.id, 0)
            .await?;
        catalog_repo
            .attach_dimension(&product.id, &size.dimension.id, 1)
            .await?;

        let dims = catalog_repo.declared_dimensions(&product.id).await?;
        let plan = plan_missing(&product.id, &dims, &HashSet::new(), DEFAULT_MAX_COMBINATIONS)?;

        let mut tx = db.begin_write().await?;
        for candidate in &plan.candidates {
            let combo = catalog::insert_combination(&mut tx, &product, candidate).await?;
            sqlx::query("UPDATE combinations SET stock = ?2 WHERE id = ?1")
                .bind(&combo.id)
                .bind(stock)
                .execute(&mut *tx)
                .await?;
            combinations += 1;
        }
        tx.commit().await?;
    }

    let coupons = [
        NewCoupon::with_window_strings("WELCOME10", 10, AmountType::Percentage, None, None)?,
        NewCoupon {
            min_order_cents: 5_000,
            ..NewCoupon::with_window_strings("FIVEOFF", 500, AmountType::Fixed, None, None)?
        },
        NewCoupon {
            usage_limit: Some(1),
            ..NewCoupon::with_window_strings("FIRSTONLY", 50, AmountType::Percentage, None, None)?
        },
        NewCoupon {
            valid_to: Some(Utc::now() - Duration::days(30)),
            valid_from: Some(Utc::now() - Duration::days(60)),
            ..NewCoupon::with_window_strings("EXPIRED", 20, AmountType::Percentage, None, None)?
        },
    ];
    for coupon in &coupons {
        db.coupons().insert(coupon).await?;
    }

    info!(
        simple = SIMPLE_PRODUCTS.len(),
        variable = VARIABLE_PRODUCTS.len(),
        combinations,
        coupons = coupons.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    Ok(())
}
