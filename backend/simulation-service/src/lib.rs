pub mod config;
pub mod datasets;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use services::{
    build_recommender, BanditSettings, Evaluator, RatingStore, RecommendationEngine, Recommender,
    StoreConfig, StrategyKind, UserSession,
};
