use common::{Money, OrderId, OrderItem, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use reservation::ReservationEngine;
use stock_ledger::{InMemoryStockLedger, Product, StockLedger};

async fn seeded_engine(qty: i64) -> ReservationEngine<InMemoryStockLedger> {
    let ledger = InMemoryStockLedger::new();
    ledger
        .upsert_product(Product {
            product_id: ProductId::new(1),
            title: "Widget".to_string(),
            price: Money::from_cents(1000),
            category: "liquids".to_string(),
            qty_available: qty,
            active: true,
        })
        .await
        .unwrap();
    let engine = ReservationEngine::new(ledger);
    engine.restore_reservations().await.unwrap();
    engine
}

fn bench_reserve_release_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("engine/reserve_release_cycle", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = seeded_engine(1_000_000).await;
                let order = Some(OrderId::new(1));
                engine
                    .reserve_items(&[OrderItem::new(1, 2)], order)
                    .await
                    .unwrap();
                engine
                    .release_reservation(&[OrderItem::new(1, 2)], order)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_validate_stock(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = rt.block_on(seeded_engine(1_000_000));

    c.bench_function("engine/validate_stock", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.validate_stock(ProductId::new(1), 5).await.unwrap();
            });
        });
    });
}

fn bench_final_deduction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("engine/final_deduction", |b| {
        b.iter(|| {
            rt.block_on(async {
                let engine = seeded_engine(1_000_000).await;
                engine
                    .final_deduction(&[OrderItem::new(1, 1)])
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_reserve_release_cycle,
    bench_validate_stock,
    bench_final_deduction
);
criterion_main!(benches);
