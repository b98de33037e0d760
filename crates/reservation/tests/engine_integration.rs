//! Integration tests for the reservation engine.
//!
//! Exercises the engine against both ledger backends: the documented
//! reserve/validate/release scenario, concurrent deductions, and the
//! restart-recovery property.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::{Money, OrderId, OrderItem, ProductId};
use futures_util::future::join_all;
use reservation::{ReservationEngine, ReservationError};
use stock_ledger::{InMemoryStockLedger, Product, SqliteStockLedger, StockLedger, StockLedgerExt};

fn product(id: i64, qty: i64) -> Product {
    Product {
        product_id: ProductId::new(id),
        title: format!("Product {id}"),
        price: Money::from_cents(1200),
        category: "liquids".to_string(),
        qty_available: qty,
        active: true,
    }
}

async fn memory_engine(
    products: &[(i64, i64)],
) -> ReservationEngine<InMemoryStockLedger> {
    let ledger = InMemoryStockLedger::new();
    for &(id, qty) in products {
        ledger.upsert_product(product(id, qty)).await.unwrap();
    }
    let engine = ReservationEngine::new(ledger);
    engine.restore_reservations().await.unwrap();
    engine
}

#[tokio::test]
async fn reserve_then_release_restores_availability() {
    // product X has qty_available = 10, no reservations
    let engine = memory_engine(&[(1, 10)]).await;
    let order = Some(OrderId::new(500));

    engine
        .reserve_items(&[OrderItem::new(1, 7)], order)
        .await
        .unwrap();
    // 10 - 7 = 3 < 4
    assert!(!engine.validate_stock(ProductId::new(1), 4).await.unwrap());

    engine
        .release_reservation(&[OrderItem::new(1, 7)], order)
        .await
        .unwrap();
    assert!(engine.validate_stock(ProductId::new(1), 4).await.unwrap());
}

#[tokio::test]
async fn snapshot_matches_ledger_aggregate() {
    let engine = memory_engine(&[(1, 20), (2, 20)]).await;

    engine
        .reserve_items(
            &[OrderItem::new(1, 5), OrderItem::new(2, 3)],
            Some(OrderId::new(1)),
        )
        .await
        .unwrap();
    engine
        .reserve_items(&[OrderItem::new(1, 2)], Some(OrderId::new(2)))
        .await
        .unwrap();
    engine
        .release_reservation(&[OrderItem::new(2, 3)], Some(OrderId::new(1)))
        .await
        .unwrap();

    let snapshot = engine.qty_reserved_snapshot().await;
    let totals = engine
        .ledger()
        .live_reserved_totals(Utc::now())
        .await
        .unwrap();

    for id in [ProductId::new(1), ProductId::new(2)] {
        assert_eq!(
            snapshot.get(&id).copied().unwrap_or(0),
            totals.get(&id).copied().unwrap_or(0),
            "aggregate mismatch for {id}"
        );
    }
}

#[tokio::test]
async fn failed_batch_reserves_nothing() {
    let engine = memory_engine(&[(1, 10), (2, 1)]).await;

    let result = engine
        .reserve_items(
            &[OrderItem::new(1, 3), OrderItem::new(2, 2)],
            Some(OrderId::new(9)),
        )
        .await;
    assert!(matches!(
        result,
        Err(ReservationError::InsufficientStock { .. })
    ));

    assert_eq!(engine.ledger().reservation_count().await, 0);
    assert!(engine.validate_stock(ProductId::new(1), 10).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deductions_are_serialized_per_product() {
    let engine = Arc::new(memory_engine(&[(1, 10)]).await);

    let tasks: Vec<_> = [3i64, 4]
        .into_iter()
        .map(|qty| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.final_deduction(&[OrderItem::new(1, qty)]).await
            })
        })
        .collect();

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // both deductions applied, neither lost
    let p = engine
        .ledger()
        .get_product(ProductId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p.qty_available, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deductions_never_go_negative() {
    let engine = Arc::new(memory_engine(&[(1, 5)]).await);

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.final_deduction(&[OrderItem::new(1, 3)]).await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let failures = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(failures, 1, "exactly one of the two deductions must fail");

    let p = engine
        .ledger()
        .get_product(ProductId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p.qty_available, 2);
}

#[tokio::test]
async fn deductions_on_different_products_are_independent() {
    let engine = Arc::new(memory_engine(&[(1, 10), (2, 10)]).await);

    let tasks: Vec<_> = [(1i64, 4i64), (2, 6)]
        .into_iter()
        .map(|(id, qty)| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.final_deduction(&[OrderItem::new(id, qty)]).await
            })
        })
        .collect();

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let products = engine.ledger().get_products().await.unwrap();
    let by_id: HashMap<_, _> = products
        .into_iter()
        .map(|p| (p.product_id, p.qty_available))
        .collect();
    assert_eq!(by_id[&ProductId::new(1)], 6);
    assert_eq!(by_id[&ProductId::new(2)], 4);
}

#[tokio::test]
async fn restart_rebuilds_the_same_aggregate() {
    let ledger = SqliteStockLedger::connect_in_memory().await.unwrap();
    ledger.upsert_product(product(1, 50)).await.unwrap();
    ledger.upsert_product(product(2, 50)).await.unwrap();

    let engine = ReservationEngine::new(ledger.clone());
    engine.restore_reservations().await.unwrap();
    engine
        .reserve_items(
            &[OrderItem::new(1, 7), OrderItem::new(2, 4)],
            Some(OrderId::new(31)),
        )
        .await
        .unwrap();
    engine
        .reserve_items(&[OrderItem::new(1, 2)], None)
        .await
        .unwrap();
    let before = engine.qty_reserved_snapshot().await;

    // a fresh engine over the same store stands in for a process restart
    let restarted = ReservationEngine::new(ledger);
    restarted.restore_reservations().await.unwrap();
    let after = restarted.qty_reserved_snapshot().await;

    assert_eq!(before.get(&ProductId::new(1)), after.get(&ProductId::new(1)));
    assert_eq!(before.get(&ProductId::new(2)), after.get(&ProductId::new(2)));
    assert_eq!(after.get(&ProductId::new(1)), Some(&9));
}

#[tokio::test]
async fn restart_excludes_released_and_expired_holds() {
    let ledger = SqliteStockLedger::connect_in_memory().await.unwrap();
    ledger.upsert_product(product(1, 50)).await.unwrap();

    // expired immediately: TTL of zero minutes
    let expiring = ReservationEngine::with_ttl_minutes(ledger.clone(), 0);
    expiring.restore_reservations().await.unwrap();
    expiring
        .reserve_items(&[OrderItem::new(1, 5)], Some(OrderId::new(1)))
        .await
        .unwrap();

    let engine = ReservationEngine::new(ledger.clone());
    engine.restore_reservations().await.unwrap();
    engine
        .reserve_items(&[OrderItem::new(1, 3)], Some(OrderId::new(2)))
        .await
        .unwrap();
    engine
        .release_reservation(&[OrderItem::new(1, 3)], Some(OrderId::new(2)))
        .await
        .unwrap();
    engine
        .reserve_items(&[OrderItem::new(1, 2)], Some(OrderId::new(3)))
        .await
        .unwrap();

    let restarted = ReservationEngine::new(ledger);
    restarted.restore_reservations().await.unwrap();

    // only order 3's live hold survives the rebuild
    let snapshot = restarted.qty_reserved_snapshot().await;
    assert_eq!(snapshot.get(&ProductId::new(1)), Some(&2));
}

#[tokio::test]
async fn sqlite_backend_full_cycle() {
    let ledger = SqliteStockLedger::connect_in_memory().await.unwrap();
    ledger.upsert_product(product(1, 10)).await.unwrap();

    let engine = ReservationEngine::new(ledger);
    engine.restore_reservations().await.unwrap();

    engine
        .reserve_items(&[OrderItem::new(1, 7)], Some(OrderId::new(77)))
        .await
        .unwrap();
    assert!(!engine.validate_stock(ProductId::new(1), 4).await.unwrap());

    engine
        .release_reservation(&[OrderItem::new(1, 7)], Some(OrderId::new(77)))
        .await
        .unwrap();
    assert!(engine.validate_stock(ProductId::new(1), 4).await.unwrap());

    engine
        .final_deduction(&[OrderItem::new(1, 10)])
        .await
        .unwrap();
    let p = engine
        .ledger()
        .get_product(ProductId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p.qty_available, 0);
}
