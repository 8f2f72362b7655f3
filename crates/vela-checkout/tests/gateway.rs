//! End-to-end card checkout against a mock HTTP gateway.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config_without_shipping, file_db, request, service};
use vela_checkout::{CheckoutConfig, ErrorKind, HttpPaymentGateway};
use vela_core::stock::StockTarget;
use vela_core::{CartItem, PaymentMethod, PaymentStatus};
use vela_db::NewProduct;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer, config: &mut CheckoutConfig) -> Arc<HttpPaymentGateway> {
    config.gateway.base_url = server.uri();
    config.gateway.secret_key = Some("sk_test_vela".into());
    Arc::new(HttpPaymentGateway::from_settings(&config.gateway).unwrap())
}

#[tokio::test]
async fn test_card_checkout_stores_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("amount=3000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_abc",
            "client_secret": "pi_abc_secret_xyz"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, db) = file_db().await;
    let mug = db
        .catalog()
        .insert_product(&NewProduct::simple("Mug", 1_500, 4))
        .await
        .unwrap();
    let mut config = config_without_shipping();
    let gateway = gateway_for(&server, &mut config);
    let checkout = service(&db, &config, gateway);

    let receipt = checkout
        .checkout(request(vec![CartItem::simple(&mug.id, 2)], PaymentMethod::Card, None))
        .await
        .unwrap();
    assert_eq!(receipt.client_secret.as_deref(), Some("pi_abc_secret_xyz"));

    let order = db.orders().get_by_id(&receipt.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_intent_id.as_deref(), Some("pi_abc"));
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    // payment confirmed out of band
    db.orders()
        .set_payment_status(&order.id, PaymentStatus::Paid)
        .await
        .unwrap();
    let order = db.orders().get_by_tracking_id(&receipt.tracking_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_declined_intent_leaves_nothing_behind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "Invalid currency" }
        })))
        .mount(&server)
        .await;

    let (_dir, db) = file_db().await;
    let mug = db
        .catalog()
        .insert_product(&NewProduct::simple("Mug", 1_500, 4))
        .await
        .unwrap();
    let mut config = config_without_shipping();
    let gateway = gateway_for(&server, &mut config);
    let checkout = service(&db, &config, gateway);

    let err = checkout
        .checkout(request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::Card, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(!err.is_retryable());

    let left = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
    assert_eq!(left, Some(4));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "pi_late", "client_secret": "s" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (_dir, db) = file_db().await;
    let mug = db
        .catalog()
        .insert_product(&NewProduct::simple("Mug", 1_500, 4))
        .await
        .unwrap();
    let mut config = config_without_shipping();
    config.gateway.timeout_secs = 1;
    let gateway = gateway_for(&server, &mut config);
    let checkout = service(&db, &config, gateway);

    let err = checkout
        .checkout(request(vec![CartItem::simple(&mug.id, 1)], PaymentMethod::Card, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalError);

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orders, 0);
    let left = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
    assert_eq!(left, Some(4));
}
