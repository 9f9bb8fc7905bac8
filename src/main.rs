//! TPC-C workload driver CLI.
//!
//! Usage:
//!   tpcc-bench                                  # 1 warehouse, 1 worker, 10s
//!   tpcc-bench --warehouses 4 --workers 8       # scale up
//!   tpcc-bench --mix 100,0,0,0,0                # New-Order only
//!   tpcc-bench --export results/ --buckets      # CSV + JSON + breakdown

use clap::Parser;
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::time::Duration;
use tpcc_bench::adapters::memory::MemoryStore;
use tpcc_bench::transactions::TxnType;
use tpcc_bench::{driver, loader, report, BenchConfig, BenchError, BenchResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tpcc-bench", about = "TPC-C-style OLTP workload driver")]
struct Cli {
    /// Number of warehouses.
    #[arg(long, default_value = "1")]
    warehouses: u64,

    /// Districts per warehouse.
    #[arg(long, default_value = "10")]
    districts: u64,

    /// Customers per district.
    #[arg(long, default_value = "300")]
    customers: u64,

    /// Item catalog size.
    #[arg(long, default_value = "1000")]
    items: u64,

    /// Seed orders per district.
    #[arg(long, default_value = "100")]
    orders_per_district: u64,

    /// Trailing seed orders per district left undelivered.
    #[arg(long, default_value = "30")]
    backlog: u64,

    /// Concurrent worker loops.
    #[arg(long, default_value = "1")]
    workers: usize,

    /// Run duration in seconds.
    #[arg(long, default_value = "10")]
    duration_secs: u64,

    /// Base RNG seed.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Transaction mix weights: new-order,payment,order-status,delivery,stock-level.
    #[arg(long, value_delimiter = ',')]
    mix: Option<Vec<u32>>,

    /// Export directory for CSV + JSON results.
    #[arg(long)]
    export: Option<String>,

    /// Print the per-type latency bucket breakdown.
    #[arg(long)]
    buckets: bool,
}

fn main() -> BenchResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let weights = match cli.mix {
        Some(mix) => {
            let arr: [u32; TxnType::COUNT] = mix.try_into().map_err(|_| {
                BenchError::Config(format!("--mix needs exactly {} weights", TxnType::COUNT))
            })?;
            arr
        }
        None => TxnType::STANDARD_WEIGHTS,
    };

    let cfg = BenchConfig {
        warehouses: cli.warehouses,
        districts_per_warehouse: cli.districts,
        customers_per_district: cli.customers,
        items: cli.items,
        orders_per_district: cli.orders_per_district,
        new_order_backlog: cli.backlog,
        workers: cli.workers,
        duration: Duration::from_secs(cli.duration_secs),
        seed: cli.seed,
        weights,
    };
    cfg.validate()?;

    println!(
        "\n{}",
        format!(
            "tpcc-bench: {} warehouse(s), {} worker(s), {}s",
            cfg.warehouses,
            cfg.workers,
            cli.duration_secs
        )
        .bold()
        .blue()
    );

    let store = MemoryStore::new();
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    loader::load(&store, &cfg, &mut rng)?;

    let summary = driver::run(&store, &cfg)?;

    report::print_summary(&summary);
    if cli.buckets {
        report::print_buckets(&summary);
    }

    if let Some(dir) = cli.export {
        let dir = Path::new(&dir);
        std::fs::create_dir_all(dir)?;
        report::export_csv(&summary, &dir.join("tpcc.csv"))?;
        report::export_json(&summary, &dir.join("tpcc.json"))?;
    }

    Ok(())
}
