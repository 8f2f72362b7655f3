//! # vela-checkout: Checkout Pipeline for Vela Commerce
//!
//! This crate places orders and materializes product combinations on top of
//! `vela-core` rules and `vela-db` repositories.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Architecture                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  CheckoutService (Orchestrator)                  │  │
//! │  │                                                                  │  │
//! │  │  One BEGIN IMMEDIATE transaction per checkout, passed by        │  │
//! │  │  reference to every step below                                   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  CartResolver  │  │  CouponLedger  │  │  StockReconciler       │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Active prices, │  │ Quote, then    │  │ Aggregated, batched    │    │
//! │  │ stock per line │  │ conditional    │  │ conditional decrement  │    │
//! │  │                │  │ redemption     │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ PaymentGateway │  │ SessionProvider│  │  Materializer          │    │
//! │  │                │  │                │  │                        │    │
//! │  │ HTTP (reqwest) │  │ Guest / static │  │ Dimensions → stored    │    │
//! │  │ with timeout   │  │                │  │ combinations           │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `CheckoutService` and its request/receipt DTOs
//! - [`cart`] - Cart resolution and the unavailable-line policy
//! - [`coupon`] - Coupon quoting and redemption
//! - [`reconciler`] - Stock delta aggregation and application
//! - [`materializer`] - Combination materialization and deletion
//! - [`payment`] - Payment gateway trait, HTTP and disabled gateways
//! - [`session`] - Session provider trait and simple providers
//! - [`config`] - Checkout configuration (TOML + environment)
//! - [`error`] - Checkout error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vela_checkout::{CheckoutConfig, CheckoutService, GuestSession, HttpPaymentGateway};
//! use vela_db::Database;
//!
//! let config = CheckoutConfig::load_or_default(None);
//! let db = Database::new(config.database.db_config()).await?;
//! let gateway = HttpPaymentGateway::from_settings(&config.gateway)?;
//!
//! let service = CheckoutService::new(db, &config, Arc::new(GuestSession), Arc::new(gateway));
//! let receipt = service.checkout(request).await?;
//! println!("Order {} placed", receipt.tracking_id);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod coupon;
pub mod error;
pub mod materializer;
pub mod payment;
pub mod reconciler;
pub mod service;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{CartResolver, ResolvedCart, ResolvedLine, UnavailableLine, UnavailablePolicy};
pub use config::CheckoutConfig;
pub use coupon::CouponLedger;
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use materializer::{MaterializeFailure, MaterializeReport, Materializer};
pub use payment::{DisabledGateway, GatewayError, HttpPaymentGateway, PaymentGateway, PaymentIntent};
pub use service::{CheckoutReceipt, CheckoutRequest, CheckoutService, OrderTotals};
pub use session::{GuestSession, Session, SessionProvider, SessionUser, StaticSession};
