//! Example: Tune the popularity baseline on a six-row log
//!
//! Run with: cargo run --package scenario --example tune_popular
//!
//! This example shows how to:
//! 1. Search alpha/beta with a by-date split on four workers
//! 2. Refit the best parameters on the full log
//! 3. Repeat with a random split on one worker

use data_loader::{Interaction, InteractionLog, RecommendationTable, Timestamp};
use models::{format_params, PopularRecommender, Recommender};
use scenario::{Scenario, ScenarioConfig, SearchSpace, SplitConfig};
use splitters::SplitKind;
use tracing_subscriber::EnvFilter;

/// 2019-10-08T00:00:00Z
const OCT_8: Timestamp = 1_570_492_800;
const DAY: Timestamp = 86_400;

fn print_recs(recs: &RecommendationTable) {
    for row in recs.iter() {
        println!("  user {:>2} item {:>2} relevance {:.4}", row.user_id, row.item_id, row.relevance);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Popular Scenario Example ===\n");

    let log = InteractionLog::from_interactions(vec![
        Interaction::new(1, 1, 1.0, OCT_8),
        Interaction::new(2, 2, 2.0, OCT_8 + DAY),
        Interaction::new(1, 3, 1.0, OCT_8 + 2 * DAY),
        Interaction::new(1, 1, 1.0, OCT_8 + 3 * DAY),
        Interaction::new(1, 2, 1.0, OCT_8 + 4 * DAY),
        Interaction::new(3, 3, 2.0, OCT_8 + 5 * DAY),
    ]);

    let mut model = PopularRecommender::new();
    let space = SearchSpace::from_specs(&model.search_space(), 5);

    let by_date = ScenarioConfig {
        k: 3,
        n_trials: 4,
        n_jobs: 4,
        split: SplitConfig {
            how_to_split: SplitKind::ByDate,
            test_start: Some(OCT_8 + 3 * DAY),
            ..SplitConfig::default()
        },
        ..ScenarioConfig::default()
    };
    let randomly = ScenarioConfig {
        k: 3,
        n_trials: 4,
        n_jobs: 1,
        split: SplitConfig {
            how_to_split: SplitKind::Randomly,
            test_size: 0.4,
            ..SplitConfig::default()
        },
        ..ScenarioConfig::default()
    };

    for config in [by_date, randomly] {
        println!("--- {} split, {} job(s) ---", config.split.how_to_split, config.n_jobs);
        let scenario = Scenario::new(config);

        // a random split of six rows may leave nothing to score
        let result = match scenario.research(&mut model, &space, &log, None, None, None, None) {
            Ok(result) => result,
            Err(err) => {
                println!("research failed: {}\n", err);
                continue;
            }
        };
        println!(
            "best parameters: {} ({} = {:.4})",
            format_params(&result.best_parameters),
            scenario.config().criterion,
            result.best_value
        );

        let recs = scenario.production(&model, &result.best_parameters, &log, None, None, None, None)?;
        print_recs(&recs);
        println!();
    }

    Ok(())
}
