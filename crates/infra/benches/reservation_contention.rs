use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use forgecart_auth::UserAccount;
use forgecart_core::{Money, TenantId, UserId};
use forgecart_infra::checkout::{CheckoutRequest, OrderOrchestrator};
use forgecart_infra::side_effects::{
    BusNotificationChannel, CacheInvalidator, InMemoryCache, Notification, NotificationDispatcher,
};
use forgecart_infra::store::{CommerceStore, InMemoryCommerceStore, StoreTx};
use forgecart_events::InMemoryEventBus;
use forgecart_inventory::InventoryLedger;
use forgecart_parties::{CustomerForm, ShippingAddressForm};
use forgecart_products::{Product, ProductId};
use forgecart_sales::{CardAuthorizer, LineRequest, PaymentInstrument};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn seeded_store(stock: i64) -> (Arc<InMemoryCommerceStore>, TenantId, ProductId) {
    let store = Arc::new(InMemoryCommerceStore::new());
    let tenant = TenantId::new();
    let product = Product::new(tenant, "BENCH", "Bench widget", Money::from_minor(100), stock).unwrap();
    let product_id = product.id;
    store.seed_product(product);
    (store, tenant, product_id)
}

/// Raw ledger: reserve one unit and commit, from `tasks` concurrent tasks.
fn bench_ledger_reserve(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("ledger_reserve");

    for tasks in [1usize, 8, 32] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| async move {
                let (store, tenant, product_id) = seeded_store(tasks as i64 / 2);
                let mut handles = Vec::with_capacity(tasks);
                for _ in 0..tasks {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        let mut tx = store.begin().await.unwrap();
                        let reservation = tx.reserve(tenant, product_id, 1).await.unwrap();
                        tx.commit().await.unwrap();
                        reservation.is_reserved()
                    }));
                }
                let mut reserved = 0;
                for handle in handles {
                    if handle.await.unwrap() {
                        reserved += 1;
                    }
                }
                black_box(reserved)
            });
        });
    }

    group.finish();
}

/// Full checkout path under contention for the same product.
fn bench_checkout_contention(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("checkout_contention");
    group.sample_size(20);

    for tasks in [8usize, 32] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            b.to_async(&rt).iter(|| async move {
                let (store, tenant, product_id) = seeded_store(tasks as i64 / 2);
                let bus: Arc<InMemoryEventBus<Notification>> = Arc::new(InMemoryEventBus::new());
                let orchestrator = OrderOrchestrator::new(
                    store.clone(),
                    Arc::new(CardAuthorizer::new()),
                    NotificationDispatcher::new(Arc::new(BusNotificationChannel::new(bus))),
                    CacheInvalidator::new(Arc::new(InMemoryCache::new())),
                );

                let mut handles = Vec::with_capacity(tasks);
                for i in 0..tasks {
                    let user = UserAccount {
                        id: UserId::new(),
                        tenant_id: Some(tenant),
                        full_name: format!("Buyer {i}"),
                        email: format!("buyer{i}@example.com"),
                        phone: None,
                    };
                    let principal_id = user.id;
                    store.seed_user(user);

                    let request = CheckoutRequest {
                        principal_id,
                        customer: CustomerForm::default(),
                        address_id: None,
                        shipping_address: Some(ShippingAddressForm {
                            line1: "1 Bench Rd".to_string(),
                            line2: None,
                            city: "Loadville".to_string(),
                            region: None,
                            postal_code: "00001".to_string(),
                            country: "US".to_string(),
                        }),
                        payment: Some(PaymentInstrument::new("4111111111111111", "12/99", "123")),
                        items: vec![LineRequest { product_id, quantity: 1 }],
                    };
                    let orchestrator = orchestrator.clone();
                    handles.push(tokio::spawn(async move { orchestrator.place_order(tenant, request).await.is_ok() }));
                }

                let mut placed = 0;
                for handle in handles {
                    if handle.await.unwrap() {
                        placed += 1;
                    }
                }
                black_box(placed)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ledger_reserve, bench_checkout_contention);
criterion_main!(benches);
