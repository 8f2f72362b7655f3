//! # Checkout Service
//!
//! Converts a cart into a durable, correctly priced order in one write
//! transaction, racing other checkouts for finite stock and coupon uses.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(request)                               │
//! │                                                                         │
//! │  0. session, shipping address, payment method                          │
//! │  1. BEGIN IMMEDIATE ─────────────────────────────────────────────┐     │
//! │  2. resolve cart (Abort)          → Forbidden / NotFound          │     │
//! │  3. subtotal, shipping, taxes                                    │     │
//! │  4. quote coupon on subtotal + shipping → Forbidden / NotFound   │     │
//! │  5. INSERT order + items (unit prices locked in)                 │  tx │
//! │  6. conditional stock decrement   → Conflict                     │     │
//! │  7. conditional coupon redemption → Conflict                     │     │
//! │  8. card: create payment intent (timeout) → Forbidden / Internal │     │
//! │  9. COMMIT ──────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Any error before 9 drops the transaction: nothing is written.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use ts_rs::TS;

use crate::cart::{resolve_cart, ResolvedCart, UnavailablePolicy};
use crate::config::{CheckoutConfig, StoreSettings};
use crate::coupon::{self, CouponLedger};
use crate::error::{CheckoutError, CheckoutResult};
use crate::payment::PaymentGateway;
use crate::reconciler;
use crate::session::SessionProvider;
use vela_core::coupon::{normalize_code, CouponQuote};
use vela_core::validation::validate_shipping_address;
use vela_core::{
    CartItem, Money, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingAddress,
};
use vela_db::repository::order::{
    generate_order_id, generate_order_item_id, generate_tracking_id, insert_order,
    set_payment_intent,
};
use vela_db::Database;

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub tracking_id: String,
    pub total: Money,
    /// Present for card orders; the storefront confirms payment with it.
    pub client_secret: Option<String>,
}

/// The money side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping_fee: Money,
    /// Tax already contained in the subtotal.
    pub taxes: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Totals before any coupon.
    pub fn compute(subtotal: Money, store: &StoreSettings) -> Self {
        let shipping_fee = store.shipping_fee_for(subtotal);
        OrderTotals {
            subtotal,
            shipping_fee,
            taxes: subtotal.included_tax(store.tax_rate()),
            discount: Money::zero(),
            total: subtotal + shipping_fee,
        }
    }

    /// Amount a coupon is evaluated against.
    #[inline]
    pub fn coupon_base(&self) -> Money {
        self.subtotal + self.shipping_fee
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self.total = (self.subtotal + self.shipping_fee - discount).clamp_non_negative();
        self
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct CheckoutService {
    db: Database,
    store: StoreSettings,
    gateway_timeout: Duration,
    sessions: Arc<dyn SessionProvider>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        db: Database,
        config: &CheckoutConfig,
        sessions: Arc<dyn SessionProvider>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        CheckoutService {
            db,
            store: config.store.clone(),
            gateway_timeout: config.gateway.timeout(),
            sessions,
            gateway,
        }
    }

    /// Places an order for `request`.
    ///
    /// Either the order, its items, the stock decrements, the coupon
    /// redemption and the payment intent id are all committed, or nothing is.
    #[instrument(skip(self, request), fields(lines = request.items.len(), method = ?request.payment_method))]
    pub async fn checkout(&self, request: CheckoutRequest) -> CheckoutResult<CheckoutReceipt> {
        // 0. who, where, how
        let session = self.sessions.get_session().await?;
        validate_shipping_address(&request.shipping_address)?;
        if !self.store.accepts(request.payment_method) {
            return Err(CheckoutError::PaymentMethodNotAccepted(request.payment_method));
        }
        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());

        // 1. one write transaction for the whole checkout
        let mut tx = self.db.begin_write().await?;
        let now = Utc::now();

        // 2. prices and stock, read under the write lock
        let cart: ResolvedCart =
            resolve_cart(&mut tx, &request.items, UnavailablePolicy::Abort, now).await?;

        // 3. totals
        let mut totals = OrderTotals::compute(cart.subtotal(), &self.store);

        // 4. coupon
        let quote: Option<CouponQuote> = match coupon_code {
            Some(code) => {
                Some(coupon::quote_coupon(&mut tx, code, totals.coupon_base(), now).await?)
            }
            None => None,
        };
        if let Some(q) = &quote {
            totals = totals.with_discount(q.discount);
        }

        // 5. order + items
        let order = Order {
            id: generate_order_id(),
            tracking_id: generate_tracking_id(),
            user_id: session.user_id().map(String::from),
            shipping_address: request.shipping_address,
            subtotal_cents: totals.subtotal.cents(),
            shipping_fee_cents: totals.shipping_fee.cents(),
            taxes_cents: totals.taxes.cents(),
            discount_cents: totals.discount.cents(),
            coupon_code: quote.as_ref().map(|q| q.code.clone()),
            total_cents: totals.total.cents(),
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
            dispatched_at: None,
            shipped_at: None,
            delivered_at: None,
            on_hold_at: None,
            cancelled_at: None,
        };
        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                id: generate_order_item_id(),
                order_id: order.id.clone(),
                product_id: Some(line.product_id.clone()),
                combination_id: line.combination_id.clone(),
                title: line.title.clone(),
                image_url: line.image_url.clone(),
                price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                combinations: line.combination_label.clone(),
                created_at: now,
            })
            .collect();
        insert_order(&mut tx, &order, &items).await?;

        // 6. stock
        reconciler::reconcile(&mut tx, &cart.lines).await?;

        // 7. coupon use
        if let Some(q) = &quote {
            coupon::redeem(&mut tx, &q.code).await?;
        }

        // 8. payment
        let client_secret = if order.payment_method.requires_gateway() {
            let intent = self.create_intent(&order).await?;
            set_payment_intent(&mut tx, &order.id, &intent.id).await?;
            Some(intent.client_secret)
        } else {
            None
        };

        // 9. commit
        tx.commit().await.map_err(vela_db::DbError::from)?;

        info!(
            order_id = %order.id,
            tracking_id = %order.tracking_id,
            total = %totals.total,
            coupon = ?order.coupon_code,
            "Order placed"
        );

        Ok(CheckoutReceipt {
            order_id: order.id,
            tracking_id: order.tracking_id,
            total: totals.total,
            client_secret,
        })
    }

    /// Quotes a coupon for an order amount without redeeming it.
    #[instrument(skip(self))]
    pub async fn validate_coupon(&self, code: &str, order_amount: Money) -> CheckoutResult<CouponQuote> {
        CouponLedger::new(self.db.clone()).validate(code, order_amount).await
    }

    async fn create_intent(&self, order: &Order) -> CheckoutResult<crate::payment::PaymentIntent> {
        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order.id.clone());
        metadata.insert("tracking_id".to_string(), order.tracking_id.clone());

        debug!(order_id = %order.id, amount = order.total_cents, "Requesting payment intent");

        let call = self
            .gateway
            .create_intent(order.total_cents, &self.store.currency, &metadata);

        match tokio::time::timeout(self.gateway_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    order_id = %order.id,
                    timeout_secs = self.gateway_timeout.as_secs(),
                    "Payment gateway timed out, rolling back"
                );
                Err(CheckoutError::GatewayTimeout(self.gateway_timeout.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::payment::{DisabledGateway, GatewayError, PaymentIntent};
    use crate::session::{GuestSession, Session, StaticSession};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use vela_core::coupon::NewCoupon;
    use vela_core::stock::StockTarget;
    use vela_core::variants::plan_missing;
    use vela_core::AmountType;
    use vela_db::repository::catalog;
    use vela_db::{DbConfig, NewProduct};

    /// Gateway that answers from a script and records amounts.
    struct ScriptedGateway {
        outcome: fn() -> Result<PaymentIntent, GatewayError>,
        delay: Duration,
        calls: Mutex<Vec<(i64, BTreeMap<String, String>)>>,
    }

    impl ScriptedGateway {
        fn ok() -> Self {
            ScriptedGateway {
                outcome: || {
                    Ok(PaymentIntent {
                        id: "pi_1".into(),
                        client_secret: "pi_1_secret".into(),
                    })
                },
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(outcome: fn() -> Result<PaymentIntent, GatewayError>) -> Self {
            ScriptedGateway {
                outcome,
                ..Self::ok()
            }
        }

        fn slow(delay: Duration) -> Self {
            ScriptedGateway { delay, ..Self::ok() }
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn create_intent(
            &self,
            amount_minor: i64,
            _currency: &str,
            metadata: &BTreeMap<String, String>,
        ) -> Result<PaymentIntent, GatewayError> {
            self.calls.lock().unwrap().push((amount_minor, metadata.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.outcome)()
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".into(),
            line1: "12 Analytical Row".into(),
            line2: None,
            city: "London".into(),
            postal_code: "N1 9GU".into(),
            country: "GB".into(),
            phone: None,
        }
    }

    fn request(items: Vec<CartItem>, method: PaymentMethod, coupon: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            items,
            shipping_address: address(),
            payment_method: method,
            coupon_code: coupon.map(String::from),
        }
    }

    fn free_shipping() -> CheckoutConfig {
        let mut config = CheckoutConfig::default();
        config.store.shipping_fee_cents = 0;
        config
    }

    fn service_with(db: &Database, config: &CheckoutConfig, gateway: Arc<dyn PaymentGateway>) -> CheckoutService {
        CheckoutService::new(db.clone(), config, Arc::new(GuestSession), gateway)
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cash_checkout_decrements_stock() {
        let db = db().await;
        let p1 = db.catalog().insert_product(&NewProduct::simple("p1", 100, 5)).await.unwrap();
        let service = service_with(&db, &free_shipping(), Arc::new(DisabledGateway));

        let receipt = service
            .checkout(request(vec![CartItem::simple(&p1.id, 2)], PaymentMethod::CashOnDelivery, None))
            .await
            .unwrap();

        assert_eq!(receipt.total.cents(), 200);
        assert!(receipt.client_secret.is_none());
        assert_eq!(receipt.tracking_id.len(), 12);

        let stock = db.stock().available(&StockTarget::Product(p1.id.clone())).await.unwrap();
        assert_eq!(stock, Some(3));

        let order = db.orders().get_by_id(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.subtotal_cents, 200);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.user_id.is_none());

        let items = db.orders().get_items(&receipt.order_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price_cents, 100);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_card_checkout_with_coupon_and_shipping() {
        let db = db().await;
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 1_000, 5)).await.unwrap();
        let mut coupon =
            NewCoupon::with_window_strings("TEN", 10, AmountType::Percentage, None, None).unwrap();
        coupon.usage_limit = Some(3);
        db.coupons().insert(&coupon).await.unwrap();

        let mut config = CheckoutConfig::default();
        config.store.shipping_fee_cents = 500;
        config.store.tax_rate_bps = 2_000;
        let gateway = Arc::new(ScriptedGateway::ok());
        let service = CheckoutService::new(
            db.clone(),
            &config,
            Arc::new(StaticSession::new(Session::for_user("u-1", None))),
            gateway.clone(),
        );

        let receipt = service
            .checkout(request(vec![CartItem::simple(&mug.id, 2)], PaymentMethod::Card, Some(" TEN ")))
            .await
            .unwrap();

        // subtotal 2000 + shipping 500 = 2500, 10% off = 250
        assert_eq!(receipt.total.cents(), 2_250);
        assert_eq!(receipt.client_secret.as_deref(), Some("pi_1_secret"));

        let order = db.orders().get_by_id(&receipt.order_id).await.unwrap().unwrap();
        assert_eq!(order.discount_cents, 250);
        assert_eq!(order.shipping_fee_cents, 500);
        // 2000 × 2000 / 12000
        assert_eq!(order.taxes_cents, 333);
        assert_eq!(order.coupon_code.as_deref(), Some("TEN"));
        assert_eq!(order.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(order.user_id.as_deref(), Some("u-1"));

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 2_250);
        assert_eq!(calls[0].1.get("order_id"), Some(&receipt.order_id));
        assert_eq!(calls[0].1.get("tracking_id"), Some(&receipt.tracking_id));

        let c = db.coupons().get("TEN").await.unwrap().unwrap();
        assert_eq!(c.usage_limit, Some(2));
        assert_eq!(c.used_count, 1);
    }

    #[tokio::test]
    async fn test_variant_checkout_records_label() {
        let db = db().await;
        let catalog_repo = db.catalog();
        let tee = catalog_repo.insert_product(&NewProduct::variable("Tee", 2_500)).await.unwrap();
        let color = catalog_repo.insert_dimension("Color", &["Red"]).await.unwrap();
        let size = catalog_repo.insert_dimension("Size", &["M"]).await.unwrap();
        catalog_repo.attach_dimension(&tee.id, &color.dimension.id, 0).await.unwrap();
        catalog_repo.attach_dimension(&tee.id, &size.dimension.id, 1).await.unwrap();
        let dims = catalog_repo.declared_dimensions(&tee.id).await.unwrap();
        let plan = plan_missing(&tee.id, &dims, &HashSet::new(), 10).unwrap();
        let mut tx = db.begin_write().await.unwrap();
        let combo = catalog::insert_combination(&mut tx, &tee, &plan.candidates[0]).await.unwrap();
        tx.commit().await.unwrap();
        catalog_repo.set_combination_stock(&combo.id, 2).await.unwrap();

        let service = service_with(&db, &free_shipping(), Arc::new(DisabledGateway));
        let receipt = service
            .checkout(request(
                vec![CartItem::variant(&tee.id, &combo.id, 2)],
                PaymentMethod::CashOnDelivery,
                None,
            ))
            .await
            .unwrap();

        let items = db.orders().get_items(&receipt.order_id).await.unwrap();
        assert_eq!(items[0].combination_id.as_deref(), Some(combo.id.as_str()));
        assert_eq!(items[0].combinations.as_deref(), Some("Color: Red / Size: M"));

        let left = db.stock().available(&StockTarget::Combination(combo.id)).await.unwrap();
        assert_eq!(left, Some(0));
    }

    #[tokio::test]
    async fn test_failing_gateway_rolls_everything_back() {
        let db = db().await;
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 1_000, 5)).await.unwrap();
        let mut coupon =
            NewCoupon::with_window_strings("ONCE", 10, AmountType::Percentage, None, None).unwrap();
        coupon.usage_limit = Some(1);
        db.coupons().insert(&coupon).await.unwrap();

        let declined = service_with(
            &db,
            &free_shipping(),
            Arc::new(ScriptedGateway::failing(|| {
                Err(GatewayError::Rejected {
                    status: 402,
                    message: "declined".into(),
                })
            })),
        );
        let err = declined
            .checkout(request(vec![CartItem::simple(&mug.id, 2)], PaymentMethod::Card, Some("ONCE")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let down = service_with(
            &db,
            &free_shipping(),
            Arc::new(ScriptedGateway::failing(|| {
                Err(GatewayError::Transport("connection reset".into()))
            })),
        );
        let err = down
            .checkout(request(vec![CartItem::simple(&mug.id, 2)], PaymentMethod::Card, Some("ONCE")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalError);

        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_items").await, 0);
        let stock = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
        assert_eq!(stock, Some(5));
        let c = db.coupons().get("ONCE").await.unwrap().unwrap();
        assert_eq!(c.usage_limit, Some(1));
        assert_eq!(c.used_count, 0);
    }

    #[tokio::test]
    async fn test_gateway_timeout_rolls_back() {
        let db = db().await;
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 1_000, 5)).await.unwrap();
        let mut config = free_shipping();
        config.gateway.timeout_secs = 1;
        let service = service_with(&db, &config, Arc::new(ScriptedGateway::slow(Duration::from_secs(5))));

        let err = service
            .checkout(request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::Card, None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::GatewayTimeout(1)));
        assert_eq!(err.kind(), ErrorKind::InternalError);

        assert_eq!(count(&db, "orders").await, 0);
        let stock = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
        assert_eq!(stock, Some(5));
    }

    #[tokio::test]
    async fn test_business_rule_failures() {
        let db = db().await;
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 100, 1)).await.unwrap();
        let mut min = NewCoupon::with_window_strings("BIGSPENDER", 10, AmountType::Percentage, None, None)
            .unwrap();
        min.min_order_cents = 10_000;
        db.coupons().insert(&min).await.unwrap();
        let service = service_with(&db, &free_shipping(), Arc::new(DisabledGateway));

        // out of stock
        let err = service
            .checkout(request(vec![CartItem::simple(&mug.id, 2)], PaymentMethod::CashOnDelivery, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // coupon minimum not met
        let err = service
            .checkout(request(
                vec![CartItem::simple(&mug.id, 1)],
                PaymentMethod::CashOnDelivery,
                Some("BIGSPENDER"),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // unknown coupon
        let err = service
            .checkout(request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::CashOnDelivery, Some("NOPE")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // empty cart
        let err = service
            .checkout(request(vec![], PaymentMethod::CashOnDelivery, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        // bad address
        let mut bad = request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::CashOnDelivery, None);
        bad.shipping_address.city = String::new();
        assert_eq!(service.checkout(bad).await.unwrap_err().kind(), ErrorKind::Forbidden);

        assert_eq!(count(&db, "orders").await, 0);
        let stock = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
        assert_eq!(stock, Some(1));
    }

    #[tokio::test]
    async fn test_payment_method_not_accepted() {
        let db = db().await;
        let mug = db.catalog().insert_product(&NewProduct::simple("Mug", 100, 1)).await.unwrap();
        let mut config = free_shipping();
        config.store.accepted_payment_methods = vec![PaymentMethod::CashOnDelivery];
        let service = service_with(&db, &config, Arc::new(ScriptedGateway::ok()));

        let err = service
            .checkout(request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::Card, None))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentMethodNotAccepted(PaymentMethod::Card)));
    }

    #[tokio::test]
    async fn test_validate_coupon() {
        let db = db().await;
        let mut coupon =
            NewCoupon::with_window_strings("TEN", 10, AmountType::Percentage, None, None).unwrap();
        coupon.min_order_cents = 50;
        db.coupons().insert(&coupon).await.unwrap();
        let service = service_with(&db, &free_shipping(), Arc::new(DisabledGateway));

        let quote = service.validate_coupon("TEN", Money::from_cents(200)).await.unwrap();
        assert_eq!(quote.discount.cents(), 20);
        let err = service.validate_coupon("TEN", Money::from_cents(40)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_totals() {
        let mut store = StoreSettings::default();
        store.shipping_fee_cents = 500;
        store.free_shipping_threshold_cents = Some(5_000);

        let totals = OrderTotals::compute(Money::from_cents(1_000), &store);
        assert_eq!(totals.total.cents(), 1_500);
        assert_eq!(totals.coupon_base().cents(), 1_500);
        assert_eq!(totals.with_discount(Money::from_cents(2_000)).total.cents(), 0);

        let free = OrderTotals::compute(Money::from_cents(6_000), &store);
        assert!(free.shipping_fee.is_zero());
        assert_eq!(free.total.cents(), 6_000);
    }
}
