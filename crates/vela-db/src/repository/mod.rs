//! # Repository Module
//!
//! Database repository implementations for Vela Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Checkout service                                                      │
//! │       │                                                                 │
//! │       │  db.catalog().get_product(id)          (pool, one-off reads)   │
//! │       │  catalog::fetch_product(&mut tx, id)   (inside a transaction)  │
//! │       ▼                                                                 │
//! │  CatalogRepository / CouponRepository / OrderRepository / Stock        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every function that must take part in a unit of work accepts          │
//! │  `&mut SqliteConnection`, which a `Transaction` derefs to.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products, dimensions, combinations
//! - [`coupon::CouponRepository`] - Coupons and conditional redemption
//! - [`order::OrderRepository`] - Orders, items, status transitions
//! - [`stock::StockRepository`] - Batched conditional stock decrements

pub mod catalog;
pub mod coupon;
pub mod order;
pub mod stock;
