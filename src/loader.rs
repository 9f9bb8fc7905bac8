//! Initial population.
//!
//! Loads the item catalog, then one transaction per warehouse carrying its
//! districts, customers (with one seed History row each), stock rows and
//! seed orders. Every entity id is a bit-reversed ordinal; order ids alone
//! stay plain, since the district counter hands them out sequentially.

use crate::keyspace::{last_name, skew};
use crate::model::{
    Customer, District, History, Item, NewOrder, Order, OrderLine, Stock, Warehouse, CREDIT_BAD,
    CREDIT_GOOD, STOCK_DISTRICTS,
};
use crate::now_millis;
use crate::store::{Store, StoreResult, StoreTxn};
use crate::BenchConfig;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

fn rand_string<R: Rng>(rng: &mut R, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn rand_tax<R: Rng>(rng: &mut R) -> f64 {
    rng.gen_range(0..=2000) as f64 / 10_000.0
}

/// Populates `store` per `cfg`. Deterministic for a given RNG state.
pub fn load<R: Rng>(store: &dyn Store, cfg: &BenchConfig, rng: &mut R) -> StoreResult<()> {
    info!(
        warehouses = cfg.warehouses,
        districts = cfg.districts_per_warehouse,
        customers = cfg.customers_per_district,
        items = cfg.items,
        "loading initial population"
    );

    let mut txn = store.begin(false)?;
    for ordinal in 0..cfg.items {
        txn.insert_item(&Item {
            id: skew(ordinal),
            name: rand_string(rng, 14, 24),
            price: rng.gen_range(100..=10_000) as f64 / 100.0,
            data: rand_string(rng, 26, 50),
        })?;
    }
    txn.commit()?;

    for w_ordinal in 0..cfg.warehouses {
        load_warehouse(store, cfg, rng, w_ordinal)?;
    }

    info!("initial population loaded");
    Ok(())
}

fn load_warehouse<R: Rng>(
    store: &dyn Store,
    cfg: &BenchConfig,
    rng: &mut R,
    w_ordinal: u64,
) -> StoreResult<()> {
    let warehouse_id = skew(w_ordinal);
    let ts = now_millis();
    let mut txn = store.begin(false)?;

    txn.update_warehouse(&Warehouse {
        id: warehouse_id,
        name: rand_string(rng, 6, 10),
        tax: rand_tax(rng),
        ytd: 300_000.0,
    })?;

    for ordinal in 0..cfg.items {
        let mut dist: [String; STOCK_DISTRICTS] = Default::default();
        for slot in dist.iter_mut() {
            *slot = rand_string(rng, 24, 24);
        }
        txn.update_stock(&Stock {
            warehouse_id,
            item_id: skew(ordinal),
            quantity: rng.gen_range(10..=100),
            dist,
        })?;
    }

    for d_ordinal in 0..cfg.districts_per_warehouse {
        let district_id = skew(d_ordinal);
        txn.update_district(&District {
            warehouse_id,
            id: district_id,
            name: rand_string(rng, 6, 10),
            tax: rand_tax(rng),
            ytd: 30_000.0,
            next_order_id: cfg.orders_per_district,
        })?;

        for c_ordinal in 0..cfg.customers_per_district {
            let customer_id = skew(c_ordinal);
            txn.update_customer(&Customer {
                warehouse_id,
                district_id,
                id: customer_id,
                first: rand_string(rng, 8, 16),
                last: last_name(c_ordinal % 1000),
                balance: -10.0,
                ytd_payment: 10.0,
                discount: rng.gen_range(0..=5000) as f64 / 10_000.0,
                credit: if rng.gen_range(0..10) == 0 {
                    CREDIT_BAD.to_string()
                } else {
                    CREDIT_GOOD.to_string()
                },
                delivery_cnt: 0,
                data: rand_string(rng, 300, 500),
            })?;
            txn.insert_history(&History {
                customer_id,
                customer_district_id: district_id,
                customer_warehouse_id: warehouse_id,
                district_id,
                warehouse_id,
                ts,
                amount: 10.0,
                data: rand_string(rng, 12, 24),
            })?;
        }

        // Seed orders take the low order ids; the trailing backlog starts
        // undelivered so Delivery has work on the first iteration.
        let delivered_below = cfg.orders_per_district - cfg.new_order_backlog;
        for order_id in 0..cfg.orders_per_district {
            let customer_id = skew(rng.gen_range(0..cfg.customers_per_district));
            let line_count = rng.gen_range(5..=15u64);
            let delivered = order_id < delivered_below;
            txn.insert_order(&Order {
                warehouse_id,
                district_id,
                id: order_id,
                customer_id,
                entry_ts: ts,
                carrier_id: delivered.then(|| rng.gen_range(0..10)),
                line_count,
                all_local: true,
            })?;
            if !delivered {
                txn.insert_new_order(&NewOrder {
                    warehouse_id,
                    district_id,
                    order_id,
                    customer_id,
                })?;
            }
            for number in 0..line_count {
                txn.insert_order_line(&OrderLine {
                    warehouse_id,
                    district_id,
                    order_id,
                    number,
                    item_id: skew(rng.gen_range(0..cfg.items)),
                    supply_warehouse_id: warehouse_id,
                    quantity: 5,
                    amount: rng.gen_range(1..1_000_000) as f64 / 100.0,
                    dist_info: rand_string(rng, 24, 24),
                    delivery_ts: delivered.then_some(ts),
                })?;
            }
        }
    }

    txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> BenchConfig {
        BenchConfig {
            warehouses: 2,
            districts_per_warehouse: 3,
            customers_per_district: 20,
            items: 50,
            orders_per_district: 10,
            new_order_backlog: 4,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn population_matches_config_counts() {
        let store = MemoryStore::new();
        let cfg = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        load(&store, &cfg, &mut rng).unwrap();

        assert_eq!(store.districts().len(), 6);
        assert_eq!(store.stocks().len(), 100);
        assert_eq!(store.new_order_count(), 6 * 4);
        assert_eq!(store.history_len(), 6 * 20);
    }

    #[test]
    fn district_counters_start_past_seed_orders() {
        let store = MemoryStore::new();
        let cfg = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        load(&store, &cfg, &mut rng).unwrap();
        for district in store.districts() {
            assert_eq!(district.next_order_id, cfg.orders_per_district);
        }
    }

    #[test]
    fn stock_quantities_start_in_band() {
        let store = MemoryStore::new();
        let cfg = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        load(&store, &cfg, &mut rng).unwrap();
        for stock in store.stocks() {
            assert!((10..=100).contains(&stock.quantity));
        }
    }

    #[test]
    fn seeded_ids_are_bit_reversed_ordinals() {
        let store = MemoryStore::new();
        let cfg = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        load(&store, &cfg, &mut rng).unwrap();

        let mut txn = store.begin(true).unwrap();
        assert!(txn.warehouse(skew(1)).unwrap().is_some());
        assert!(txn.warehouse(1).unwrap().is_none());
        txn.commit().unwrap();
    }
}
