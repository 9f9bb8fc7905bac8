//! End-to-end engine run: load, drive a multi-worker mix for a short
//! window, then audit the store against the business invariants the
//! transactions are supposed to maintain.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tpcc_bench::adapters::memory::MemoryStore;
use tpcc_bench::keyspace::unskew;
use tpcc_bench::model::OrderKey;
use tpcc_bench::store::{Store, StoreTxn};
use tpcc_bench::transactions::TxnType;
use tpcc_bench::{driver, loader, BenchConfig};

fn config() -> BenchConfig {
    BenchConfig {
        warehouses: 2,
        districts_per_warehouse: 4,
        customers_per_district: 50,
        items: 200,
        orders_per_district: 30,
        new_order_backlog: 10,
        workers: 4,
        duration: Duration::from_millis(300),
        seed: 7,
        weights: TxnType::STANDARD_WEIGHTS,
    }
}

#[test]
fn mixed_run_preserves_business_invariants() {
    let cfg = config();
    cfg.validate().unwrap();
    let store = MemoryStore::new();
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    loader::load(&store, &cfg, &mut rng).unwrap();

    let summary = driver::run(&store, &cfg).unwrap();

    // The run actually did work, and nothing hit a collaborator error.
    assert!(summary.total_samples() > 0);
    assert_eq!(summary.total_failed(), 0);

    // Every committed New-Order advanced exactly one district counter by
    // one; rolled-back ones advanced nothing.
    let new_order = &summary.per_type[TxnType::NewOrder.index()];
    let counter_advance: u64 = store
        .districts()
        .iter()
        .map(|d| d.next_order_id - cfg.orders_per_district)
        .sum();
    assert_eq!(counter_advance, new_order.committed);

    // Stock never goes to zero or below: the replenishment rule keeps
    // every debit from exhausting a row.
    for stock in store.stocks() {
        assert!(stock.quantity > 0, "stock exhausted: {:?}", stock.key());
    }

    // Orders written during the run carry 5..=15 lines, all persisted.
    let mut txn = store.begin(true).unwrap();
    for district in store.districts() {
        for order_id in cfg.orders_per_district..district.next_order_id {
            let key = OrderKey {
                warehouse_id: district.warehouse_id,
                district_id: district.id,
                order_id,
            };
            let order = txn.order(key).unwrap().unwrap();
            assert!(
                (5..=15).contains(&order.line_count),
                "order {key:?} has {} lines",
                order.line_count
            );
            let lines = txn.order_lines(key).unwrap();
            assert_eq!(lines.len() as u64, order.line_count);
            for line in &lines {
                assert!((1..=9).contains(&line.quantity));
            }
        }
    }
    txn.commit().unwrap();

    // Population ids stay in their skewed keyspaces.
    for district in store.districts() {
        assert!(unskew(district.warehouse_id) < cfg.warehouses);
        assert!(unskew(district.id) < cfg.districts_per_warehouse);
    }

    // Payments leave an audit trail: History only ever grows past the
    // one-per-customer seed rows.
    let seeded_histories =
        (cfg.warehouses * cfg.districts_per_warehouse * cfg.customers_per_district) as usize;
    let payment = &summary.per_type[TxnType::Payment.index()];
    assert_eq!(
        store.history_len(),
        seeded_histories + payment.committed as usize
    );
}

#[test]
fn delivery_only_run_drains_the_backlog() {
    let cfg = BenchConfig {
        weights: [0, 0, 0, 100, 0],
        duration: Duration::from_millis(200),
        workers: 2,
        ..config()
    };
    let store = MemoryStore::new();
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    loader::load(&store, &cfg, &mut rng).unwrap();

    let backlog_before = store.new_order_count();
    let summary = driver::run(&store, &cfg).unwrap();

    assert_eq!(summary.total_failed(), 0);
    assert!(summary.per_type[TxnType::Delivery.index()].committed > 0);
    // With no New-Orders feeding it, Delivery can only shrink the backlog.
    assert!(store.new_order_count() < backlog_before);
}
