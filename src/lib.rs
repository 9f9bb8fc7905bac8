//! TPC-C-style OLTP workload driver.
//!
//! Repeatedly executes the five standard TPC-C business transactions
//! (New-Order, Payment, Order-Status, Delivery, Stock-Level) against a
//! transactional store and records per-transaction-type round-trip
//! latencies. The store is reached through the [`store::Store`] trait; an
//! in-memory transactional adapter lives in [`adapters`].

pub mod adapters;
pub mod driver;
pub mod keyspace;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod report;
pub mod store;
pub mod transactions;

use crate::store::StoreError;
use crate::transactions::TxnType;
use std::time::Duration;

// ────────────────────────────────────────────────────────────────────────────────
// Error type
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

// ────────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────────

/// Pre-validated benchmark settings.
///
/// Population sizes follow the TPC-C scaling rules but are knobs here so
/// tests and small runs stay cheap.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of warehouses (the base unit of scaling).
    pub warehouses: u64,
    /// Districts per warehouse.
    pub districts_per_warehouse: u64,
    /// Customers per district.
    pub customers_per_district: u64,
    /// Item catalog size.
    pub items: u64,
    /// Seed orders created per district at load time.
    pub orders_per_district: u64,
    /// Trailing seed orders per district that start undelivered.
    pub new_order_backlog: u64,
    /// Concurrent worker loops.
    pub workers: usize,
    /// How long the driver runs before raising the stop flag.
    pub duration: Duration,
    /// Base RNG seed; worker `i` uses `seed + i`.
    pub seed: u64,
    /// Transaction mix weights, indexed by [`TxnType`] discriminant.
    pub weights: [u32; TxnType::COUNT],
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            warehouses: 1,
            districts_per_warehouse: 10,
            customers_per_district: 300,
            items: 1000,
            orders_per_district: 100,
            new_order_backlog: 30,
            workers: 1,
            duration: Duration::from_secs(10),
            seed: 42,
            weights: TxnType::STANDARD_WEIGHTS,
        }
    }
}

impl BenchConfig {
    /// Startup-time validation; a failure here is fatal before any worker
    /// starts.
    pub fn validate(&self) -> BenchResult<()> {
        if self.warehouses == 0 {
            return Err(BenchError::Config("warehouses must be > 0".into()));
        }
        if self.districts_per_warehouse == 0 || self.customers_per_district == 0 {
            return Err(BenchError::Config(
                "districts and customers per district must be > 0".into(),
            ));
        }
        if self.items == 0 {
            return Err(BenchError::Config("item count must be > 0".into()));
        }
        if self.new_order_backlog > self.orders_per_district {
            return Err(BenchError::Config(
                "new-order backlog cannot exceed seed orders per district".into(),
            ));
        }
        if self.workers == 0 {
            return Err(BenchError::Config("workers must be > 0".into()));
        }
        if self.weights.iter().sum::<u32>() == 0 {
            return Err(BenchError::Config("transaction weights sum to zero".into()));
        }
        Ok(())
    }
}

/// Milliseconds since the Unix epoch; the engine's wall-clock timestamp.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BenchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_warehouses() {
        let cfg = BenchConfig {
            warehouses: 0,
            ..BenchConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(BenchError::Config(_))));
    }

    #[test]
    fn rejects_backlog_larger_than_seed_orders() {
        let cfg = BenchConfig {
            orders_per_district: 10,
            new_order_backlog: 11,
            ..BenchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
