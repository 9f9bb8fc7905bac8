//! Worker loop and run orchestration.
//!
//! Fixed worker threads run independent transaction loops against the
//! shared store until a stop flag settles. Workers never share mutable
//! state during the run; each owns its RNG (seeded from the base seed
//! plus its index, so runs replay deterministically given a deterministic
//! store) and its metrics recorder, merged after the joins.

use crate::metrics::{MetricsSummary, TxnMetrics};
use crate::store::Store;
use crate::transactions::{self, TxnContext, TxnOutcome, TxnType};
use crate::{BenchConfig, BenchResult};
use crate::keyspace::{Keyspace, WarehouseTopology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs the configured mix against `store` for `cfg.duration` and returns
/// the merged metrics. `cfg` must already be validated.
pub fn run(store: &dyn Store, cfg: &BenchConfig) -> BenchResult<MetricsSummary> {
    let ctx = TxnContext {
        keyspace: Keyspace::new(
            cfg.warehouses,
            cfg.districts_per_warehouse,
            cfg.customers_per_district,
            cfg.items,
        ),
        topology: WarehouseTopology::new(cfg.warehouses),
    };
    let stop = AtomicBool::new(false);
    let started = Instant::now();

    info!(
        workers = cfg.workers,
        duration_secs = cfg.duration.as_secs_f64(),
        "starting benchmark run"
    );

    let mut merged = TxnMetrics::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..cfg.workers)
            .map(|worker| {
                let ctx = &ctx;
                let stop = &stop;
                let seed = cfg.seed + worker as u64;
                scope.spawn(move || worker_loop(store, ctx, stop, seed, cfg.weights))
            })
            .collect();

        std::thread::sleep(cfg.duration);
        stop.store(true, Ordering::Relaxed);

        for handle in handles {
            // A worker panic is a bug in the engine itself; surface it.
            let metrics = handle.join().expect("worker thread panicked");
            merged.merge(&metrics);
        }
    });

    let summary = merged.summarize(started.elapsed());
    info!(
        samples = summary.total_samples(),
        failed = summary.total_failed(),
        "benchmark run complete"
    );
    Ok(summary)
}

/// One worker's whole run: pick, execute, record, until the stop flag.
fn worker_loop(
    store: &dyn Store,
    ctx: &TxnContext,
    stop: &AtomicBool,
    seed: u64,
    weights: [u32; TxnType::COUNT],
) -> TxnMetrics {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut metrics = TxnMetrics::new();

    while !stop.load(Ordering::Relaxed) {
        let kind = TxnType::pick(&mut rng, &weights);
        let start = metrics.start();
        match transactions::execute(store, kind, &mut rng, ctx) {
            Ok(TxnOutcome::Committed) => metrics.record_commit(kind, start.elapsed()),
            Ok(TxnOutcome::RolledBack) => {
                debug!(txn = kind.name(), "designed rollback");
                metrics.record_rollback(kind, start.elapsed());
            }
            Err(err) => {
                // One failed iteration must not take the run down.
                warn!(txn = kind.name(), error = %err, "transaction failed");
                metrics.record_failure(kind);
            }
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::loader;

    fn quick_config() -> BenchConfig {
        BenchConfig {
            warehouses: 2,
            districts_per_warehouse: 2,
            customers_per_district: 30,
            items: 100,
            orders_per_district: 20,
            new_order_backlog: 5,
            workers: 2,
            duration: Duration::from_millis(100),
            ..BenchConfig::default()
        }
    }

    #[test]
    fn short_run_commits_without_failures() {
        let cfg = quick_config();
        cfg.validate().unwrap();
        let store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        loader::load(&store, &cfg, &mut rng).unwrap();

        let summary = run(&store, &cfg).unwrap();
        assert!(summary.total_samples() > 0);
        assert_eq!(summary.total_failed(), 0);
        assert!(store.commit_count() > 0);
    }

    #[test]
    fn heavier_weights_draw_more_often() {
        let cfg = BenchConfig {
            weights: [100, 0, 0, 0, 0],
            ..quick_config()
        };
        let store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        loader::load(&store, &cfg, &mut rng).unwrap();

        let summary = run(&store, &cfg).unwrap();
        for kind in TxnType::ALL {
            let entry = &summary.per_type[kind.index()];
            if kind == TxnType::NewOrder {
                assert!(entry.samples() > 0);
            } else {
                assert_eq!(entry.samples(), 0);
                assert_eq!(entry.failed, 0);
            }
        }
        assert_eq!(
            summary.aggregate.samples(),
            summary.per_type[TxnType::NewOrder.index()].samples()
        );
    }
}
