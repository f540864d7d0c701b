//! Example: Split a dataset by date and by random sampling
//!
//! Run with: cargo run --package splitters --example split_log
//!
//! This example shows how to:
//! 1. Load a dataset directory
//! 2. Split it by date at the median timestamp
//! 3. Split it randomly with a fixed seed
//! 4. Compare the resulting train/test sizes

use data_loader::Dataset;
use splitters::{LogSplitter, SplitMethod, build_split_data};
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Log Splitting Example ===\n");

    let dataset = Dataset::load_from_dir(Path::new("data/sample"))?;
    let mut timestamps: Vec<i64> = dataset.log.iter().map(|i| i.timestamp).collect();
    timestamps.sort_unstable();
    let median = timestamps[timestamps.len() / 2];

    let splitter = LogSplitter::new();
    for method in [
        SplitMethod::ByDate { test_start: median },
        SplitMethod::Randomly { test_size: 0.2, seed: 1234 },
    ] {
        let start = Instant::now();
        let split = build_split_data(&splitter, &dataset.log, method, None, None, None, None)?;
        println!(
            "{:<9} train={:>7} test={:>7} users={:>6} items={:>6} ({:?})",
            method.kind().to_string(),
            split.train().len(),
            split.test().len(),
            split.users().len(),
            split.items().len(),
            start.elapsed()
        );
    }

    Ok(())
}
