//! Concurrent checkouts and materializations against a file-backed database.

mod common;

use std::sync::Arc;

use common::{config_without_shipping, file_db, request, service, variable_product};
use vela_checkout::{DisabledGateway, ErrorKind, Materializer};
use vela_core::coupon::NewCoupon;
use vela_core::stock::StockTarget;
use vela_core::{AmountType, CartItem, PaymentMethod};
use vela_db::NewProduct;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell_a_product() {
    let (_dir, db) = file_db().await;
    let mug = db
        .catalog()
        .insert_product(&NewProduct::simple("Mug", 100, 5))
        .await
        .unwrap();
    let checkout = service(&db, &config_without_shipping(), Arc::new(DisabledGateway));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let checkout = checkout.clone();
        let id = mug.id.clone();
        handles.push(tokio::spawn(async move {
            checkout
                .checkout(request(vec![CartItem::simple(id, 2)], PaymentMethod::CashOnDelivery, None))
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(
                matches!(e.kind(), ErrorKind::Conflict | ErrorKind::Forbidden),
                "unexpected error: {}",
                e
            ),
        }
    }

    // floor(5 / 2)
    assert_eq!(succeeded, 2);
    let left = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
    assert_eq!(left, Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell_a_combination() {
    let (_dir, db) = file_db().await;
    let (tee, combos) = variable_product(&db, "Tee", &[("Color", &["Red"]), ("Size", &["M"])], 7).await;
    let combo = combos[0].clone();
    let checkout = service(&db, &config_without_shipping(), Arc::new(DisabledGateway));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let checkout = checkout.clone();
        let item = CartItem::variant(&tee.id, &combo.id, 3);
        handles.push(tokio::spawn(async move {
            checkout
                .checkout(request(vec![item], PaymentMethod::CashOnDelivery, None))
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 2);
    let left = db.stock().available(&StockTarget::Combination(combo.id)).await.unwrap();
    assert_eq!(left, Some(1));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orders, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_use_coupon_is_redeemed_once() {
    let (_dir, db) = file_db().await;
    let mug = db
        .catalog()
        .insert_product(&NewProduct::simple("Mug", 1_000, 100))
        .await
        .unwrap();
    let mut coupon =
        NewCoupon::with_window_strings("ONCE", 25, AmountType::Percentage, None, None).unwrap();
    coupon.usage_limit = Some(1);
    db.coupons().insert(&coupon).await.unwrap();
    let checkout = service(&db, &config_without_shipping(), Arc::new(DisabledGateway));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let checkout = checkout.clone();
        let id = mug.id.clone();
        handles.push(tokio::spawn(async move {
            checkout
                .checkout(request(
                    vec![CartItem::simple(id, 1)],
                    PaymentMethod::CashOnDelivery,
                    Some("ONCE"),
                ))
                .await
        }));
    }

    let mut receipts = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => receipts.push(receipt),
            Err(e) => assert!(matches!(e.kind(), ErrorKind::Conflict | ErrorKind::Forbidden)),
        }
    }

    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].total.cents(), 750);

    let c = db.coupons().get("ONCE").await.unwrap().unwrap();
    assert_eq!(c.usage_limit, Some(0));
    assert_eq!(c.used_count, 1);
    let left = db.stock().available(&StockTarget::Product(mug.id)).await.unwrap();
    assert_eq!(left, Some(99));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_materializers_insert_each_point_once() {
    let (_dir, db) = file_db().await;
    let catalog_repo = db.catalog();
    let product = catalog_repo
        .insert_product(&NewProduct::variable("Hoodie", 5_000))
        .await
        .unwrap();
    let color = catalog_repo.insert_dimension("Color", &["Black", "Grey", "Navy"]).await.unwrap();
    let size = catalog_repo.insert_dimension("Size", &["S", "M", "L"]).await.unwrap();
    catalog_repo.attach_dimension(&product.id, &color.dimension.id, 0).await.unwrap();
    catalog_repo.attach_dimension(&product.id, &size.dimension.id, 1).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let materializer = Materializer::new(db.clone());
        let id = product.id.clone();
        handles.push(tokio::spawn(async move {
            materializer.materialize_combinations(&id).await
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.inserted + report.skipped_existing, 9);
        inserted += report.inserted;
    }

    assert_eq!(inserted, 9);
    let combos = catalog_repo.list_combinations(&product.id).await.unwrap();
    assert_eq!(combos.len(), 9);
}
