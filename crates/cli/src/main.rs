use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Dataset, RecommendationTable, UserId};
use models::{format_params, recommender_by_name, ParamMap, Recommender, RECOMMENDER_NAMES};
use scenario::{
    Checkpoint, Scenario, ScenarioConfig, ScenarioError, SearchResult, SearchSpace, StudySnapshot,
    TrialState,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// replay-tune - hyperparameter search for recommenders
#[derive(Parser)]
#[command(name = "replay-tune")]
#[command(about = "Tune recommender hyperparameters against a held-out split", long_about = None)]
struct Cli {
    /// Dataset directory holding log.dat and optional users.dat/items.dat
    #[arg(short, long, default_value = "data/sample")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the best parameters of a model
    Research {
        /// Model to tune (popular, als, linear)
        #[arg(long, default_value = "popular")]
        model: String,

        /// JSON search space `{"name": [candidates...]}`; defaults to the
        /// model's own domains
        #[arg(long)]
        space: Option<PathBuf>,

        /// Candidates per parameter when the model's domains are used
        #[arg(long, default_value = "5")]
        n_points: usize,

        /// JSON scenario configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Model whose recommendations fill gaps left by the tuned one
        #[arg(long)]
        fallback: Option<String>,

        /// Write a study snapshot to this file before every trial
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Write the best parameters to this file as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fit a model with fixed parameters on the full log and recommend
    Produce {
        /// Model to fit (popular, als, linear)
        #[arg(long, default_value = "popular")]
        model: String,

        /// JSON parameter map, e.g. the output of `research`
        #[arg(long)]
        params: Option<PathBuf>,

        /// JSON scenario configuration (k, filter_seen_items)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Recommend only for these users
        #[arg(long, value_delimiter = ',')]
        users: Vec<UserId>,
    },
}

/// Checkpoint sink that overwrites one JSON file per snapshot
struct JsonFileCheckpoint {
    path: PathBuf,
}

impl Checkpoint for JsonFileCheckpoint {
    fn save(&self, snapshot: &StudySnapshot) -> scenario::Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ScenarioError::Checkpoint(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            ScenarioError::Checkpoint(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let dataset = Dataset::load_from_dir(&cli.data_dir).context("Failed to load dataset")?;
    let (interactions, users, items) = dataset.counts();
    println!(
        "{} Loaded {} interactions ({} users, {} items) in {:?}",
        "✓".green(),
        interactions,
        users,
        items,
        start.elapsed()
    );

    match cli.command {
        Commands::Research {
            model,
            space,
            n_points,
            config,
            fallback,
            checkpoint,
            output,
        } => {
            let options = ResearchOptions {
                space,
                n_points,
                fallback,
                checkpoint,
                output,
            };
            handle_research(&dataset, &model, config.as_deref(), options)?
        }
        Commands::Produce {
            model,
            params,
            config,
            users,
        } => handle_produce(&dataset, &model, params.as_deref(), config.as_deref(), users)?,
    }

    Ok(())
}

struct ResearchOptions {
    space: Option<PathBuf>,
    n_points: usize,
    fallback: Option<String>,
    checkpoint: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn load_model(name: &str) -> Result<Box<dyn Recommender>> {
    recommender_by_name(name).ok_or_else(|| {
        anyhow!(
            "Unknown model '{}', expected one of: {}",
            name,
            RECOMMENDER_NAMES.join(", ")
        )
    })
}

fn load_config(path: Option<&Path>) -> Result<ScenarioConfig> {
    match path {
        Some(path) => ScenarioConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ScenarioConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Handle the 'research' command
fn handle_research(
    dataset: &Dataset,
    model_name: &str,
    config: Option<&Path>,
    options: ResearchOptions,
) -> Result<()> {
    let mut model = load_model(model_name)?;
    let config = load_config(config)?;

    let space = match &options.space {
        Some(path) => read_json::<SearchSpace>(path)?,
        None => SearchSpace::from_specs(&model.search_space(), options.n_points),
    };
    println!(
        "{}",
        format!(
            "Tuning {} over {} combination(s), {} trial(s), {} job(s)",
            model.name(),
            space.grid_size(),
            config.n_trials,
            config.n_jobs
        )
        .bold()
        .blue()
    );

    let mut scenario = Scenario::new(config);
    if let Some(name) = &options.fallback {
        scenario = scenario.with_fallback_recommender(load_model(name)?);
    }
    if let Some(path) = &options.checkpoint {
        scenario = scenario.with_checkpoint(Arc::new(JsonFileCheckpoint { path: path.clone() }));
    }

    let start = Instant::now();
    let result = scenario
        .research(
            model.as_mut(),
            &space,
            &dataset.log,
            None,
            None,
            dataset.user_features.clone(),
            dataset.item_features.clone(),
        )
        .context("Search failed")?;

    print_search_result(&result, &scenario.config().criterion);
    println!("{} Search finished in {:?}", "✓".green(), start.elapsed());

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&result.best_parameters)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Best parameters written to {}", "✓".green(), path.display());
    }
    Ok(())
}

/// Handle the 'produce' command
fn handle_produce(
    dataset: &Dataset,
    model_name: &str,
    params: Option<&Path>,
    config: Option<&Path>,
    users: Vec<UserId>,
) -> Result<()> {
    let model = load_model(model_name)?;
    let config = load_config(config)?;
    let params: ParamMap = match params {
        Some(path) => read_json(path)?,
        None => ParamMap::new(),
    };
    let users: Option<BTreeSet<UserId>> = if users.is_empty() {
        None
    } else {
        Some(users.into_iter().collect())
    };

    println!(
        "{}",
        format!("Fitting {}{} on the full log", model, format_params(&params))
            .bold()
            .blue()
    );
    let recs = Scenario::new(config)
        .production(
            model.as_ref(),
            &params,
            &dataset.log,
            users.as_ref(),
            None,
            dataset.user_features.as_ref(),
            dataset.item_features.as_ref(),
        )
        .context("Production fit failed")?;

    print_recommendations(&recs);
    Ok(())
}

fn print_search_result(result: &SearchResult, criterion: &str) {
    println!("\n{}", "Trials:".bold());
    for trial in &result.trials {
        match trial.state {
            TrialState::Complete => println!(
                "  {} #{:<3} {} = {:.6}",
                "•".green(),
                trial.number,
                criterion,
                trial.value.unwrap_or(f64::NAN)
            ),
            TrialState::Failed => println!(
                "  {} #{:<3} failed: {}",
                "•".red(),
                trial.number,
                trial.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    println!("\n{}", "Best:".bold());
    println!("  parameters: {}", format_params(&result.best_parameters).cyan());
    println!("  {}: {:.6}", criterion, result.best_value);
}

fn print_recommendations(recs: &RecommendationTable) {
    println!("\n{}", format!("{} recommendation(s):", recs.len()).bold());
    for (user_id, rows) in recs.by_user() {
        let items: Vec<String> = rows
            .iter()
            .map(|r| format!("{} ({:.4})", r.item_id, r.relevance))
            .collect();
        println!("  {} user {}: {}", "•".cyan(), user_id, items.join(", "));
    }
}
