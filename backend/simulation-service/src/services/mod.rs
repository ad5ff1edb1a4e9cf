pub mod evaluator;
pub mod rating_store;
pub mod recommenders;
pub mod simulation;
pub mod user_session;

pub use evaluator::Evaluator;
pub use rating_store::{RatingStore, RatingStoreBuilder, StoreConfig};
pub use recommenders::{build_recommender, BanditSettings, Recommender, StrategyKind};
pub use simulation::RecommendationEngine;
pub use user_session::UserSession;
