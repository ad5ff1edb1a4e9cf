use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simulation_service::config::LogFormat;
use simulation_service::{
    build_recommender, datasets, RatingStore, RecommendationEngine, SimulationConfig,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Load config
    let config = SimulationConfig::from_env().context("Failed to load config")?;

    // Initialize tracing; stdout is reserved for the report
    match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init(),
    }

    config.validate()?;

    info!(
        seed = config.seed,
        strategy = %config.strategy,
        policy = %config.policy,
        n_users = config.n_users,
        n_items = config.n_items,
        "Starting simulation-service"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);

    let ratings = datasets::synthetic_ratings(config.n_users, config.n_items, &mut rng);
    let store = RatingStore::builder(config.store_config())
        .items(datasets::synthetic_items(config.n_items))
        .build_sampled(&ratings, config.test_proportion, &mut rng)
        .context("Failed to build rating store")?;

    let strategy = build_recommender(config.strategy, &store, &config.bandit_settings(), &mut rng)
        .context("Failed to build strategy")?;

    let mut engine = RecommendationEngine::new(store, strategy, StdRng::seed_from_u64(rng.gen()))
        .with_repetition(config.allow_repetition)
        .with_metrics(config.enable_metrics);

    engine.train()?;
    let report = engine.recommendation_round_loop(config.max_rounds)?;

    let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", output);

    Ok(())
}
