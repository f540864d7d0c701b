use data_loader::Dataset;
use std::path::Path;
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let data_dir = Path::new("data/sample");

    println!("Loading dataset from {}...\n", data_dir.display());

    let start = Instant::now();
    let dataset = Dataset::load_from_dir(data_dir).expect("Failed to load dataset");
    let elapsed = start.elapsed();

    let (interactions, users, items) = dataset.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Items: {}", items);
    println!("Interactions: {}", interactions);
    println!(
        "\nPerformance: {:.0} interactions/second",
        interactions as f64 / elapsed.as_secs_f64()
    );
}
