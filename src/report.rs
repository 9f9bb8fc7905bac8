//! Pretty-print run results, with CSV and JSON export.

use crate::metrics::{ChannelSummary, MetricsSummary, LATENCY_BUCKET_BOUNDS_MS};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

// ────────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────────

/// Print the per-transaction-type result table.
pub fn print_summary(summary: &MetricsSummary) {
    println!(
        "\n{}",
        format!("━━━ TPC-C results ({:.1}s) ━━━", summary.elapsed_secs)
            .bold()
            .cyan()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        "Transaction",
        "Committed",
        "Rolled back",
        "Failed",
        "Throughput",
        "p50 (ms)",
        "p95 (ms)",
        "p99 (ms)",
        "Max (ms)",
        "Mean (ms)",
    ]);

    for entry in summary.per_type.iter().chain([&summary.aggregate]) {
        let failed_cell = if entry.failed > 0 {
            Cell::new(format_count(entry.failed)).fg(Color::Red)
        } else {
            Cell::new("0")
        };
        table.add_row(vec![
            Cell::new(entry.name),
            Cell::new(format_count(entry.committed)),
            Cell::new(format_count(entry.rolled_back)),
            failed_cell,
            Cell::new(format!("{:.1}/s", entry.throughput)),
            Cell::new(entry.p50_ms),
            Cell::new(entry.p95_ms),
            Cell::new(entry.p99_ms),
            Cell::new(entry.max_ms),
            Cell::new(format!("{:.2}", entry.mean_ms)),
        ]);
    }

    println!("{table}");
    println!(
        "  {} samples total, {} failed",
        format_count(summary.total_samples()).bold(),
        format_count(summary.total_failed())
    );
}

/// Print the fixed-bucket latency breakdown for channels that saw traffic.
pub fn print_buckets(summary: &MetricsSummary) {
    for entry in summary.per_type.iter().chain([&summary.aggregate]) {
        if entry.samples() == 0 {
            continue;
        }
        println!("\n{}", format!("── {} latency ──", entry.name).bold());
        print_channel_buckets(entry);
    }
}

fn print_channel_buckets(entry: &ChannelSummary) {
    let total = entry.samples().max(1);
    let mut lo = 0u64;
    for (&bound, &count) in LATENCY_BUCKET_BOUNDS_MS.iter().zip(&entry.buckets) {
        if count > 0 {
            let share = count as f64 * 100.0 / total as f64;
            println!(
                "  {:>7}-{:<7} {:>8}  {}",
                lo,
                format!("{bound}ms"),
                format_count(count),
                format!("{share:.1}%").dimmed()
            );
        }
        lo = bound;
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// CSV export
// ────────────────────────────────────────────────────────────────────────────────

pub fn export_csv(summary: &MetricsSummary, path: &Path) -> std::io::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "transaction",
        "committed",
        "rolled_back",
        "failed",
        "throughput_per_sec",
        "p50_ms",
        "p95_ms",
        "p99_ms",
        "max_ms",
        "mean_ms",
    ])?;

    for entry in summary.per_type.iter().chain([&summary.aggregate]) {
        wtr.write_record([
            entry.name,
            &entry.committed.to_string(),
            &entry.rolled_back.to_string(),
            &entry.failed.to_string(),
            &format!("{:.2}", entry.throughput),
            &entry.p50_ms.to_string(),
            &entry.p95_ms.to_string(),
            &entry.p99_ms.to_string(),
            &entry.max_ms.to_string(),
            &format!("{:.3}", entry.mean_ms),
        ])?;
    }

    wtr.flush()?;
    println!("  CSV exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// JSON export
// ────────────────────────────────────────────────────────────────────────────────

pub fn export_json(summary: &MetricsSummary, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(path, json)?;
    println!("  JSON exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────────

fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
