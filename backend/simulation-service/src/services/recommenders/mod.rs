// ============================================
// Recommendation Strategies
// ============================================
//
// Every strategy implements the same four capabilities:
// 1. train          - one-shot warm start from the training partition
// 2. select_item    - pick one eligible item for a user session
// 3. rating_update  - learn from a single revealed outcome
// 4. epoch_update   - learn once per round (most strategies ignore it)
//
// The engine holds one `Box<dyn Recommender>` and never inspects its kind.

mod item_bandit;
mod most_popular;
mod most_valuable;
mod random;
mod user_bandit;

pub use item_bandit::ItemBanditRecommender;
pub use most_popular::MostPopularRecommender;
pub use most_valuable::MostValuableRecommender;
pub use random::RandomRecommender;
pub use user_bandit::UserBanditRecommender;

use crate::models::RatingRecord;
use crate::services::rating_store::{RatingStore, StoreError};
use crate::services::user_session::UserSession;
use mab::{BanditConfig, MabError, MabPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    /// No eligible item (or bandit arm) is left for this user
    #[error("User {0} has no eligible item left")]
    UserExhausted(usize),

    #[error("Bandit error: {0}")]
    Bandit(#[from] MabError),

    #[error("Rating store error: {0}")]
    Store(#[from] StoreError),
}

impl SelectionError {
    /// Converts a bandit failure raised while serving `user`; an empty arm
    /// set means the user is exhausted
    pub fn from_bandit(user: usize, err: MabError) -> Self {
        match err {
            MabError::UnavailableArms => SelectionError::UserExhausted(user),
            other => SelectionError::Bandit(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SelectionError>;

/// Item-selection strategy driven by the recommendation engine
#[cfg_attr(test, mockall::automock)]
pub trait Recommender: Send {
    fn name(&self) -> &'static str;

    /// Warm start from the training partition, called once before any round
    fn train(&mut self, store: &RatingStore) -> Result<()>;

    fn select_item(
        &mut self,
        store: &RatingStore,
        session: &UserSession,
        allow_repetition: bool,
    ) -> Result<usize>;

    fn rating_update(
        &mut self,
        store: &RatingStore,
        user: usize,
        item: usize,
        outcome: &RatingRecord,
    ) -> Result<()>;

    fn epoch_update(&mut self, store: &RatingStore) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MostPopular,
    MostValuable,
    Random,
    ItemBandit,
    UserBandit,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::MostPopular => "most_popular",
            StrategyKind::MostValuable => "most_valuable",
            StrategyKind::Random => "random",
            StrategyKind::ItemBandit => "item_bandit",
            StrategyKind::UserBandit => "user_bandit",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "most_popular" => Ok(StrategyKind::MostPopular),
            "most_valuable" => Ok(StrategyKind::MostValuable),
            "random" => Ok(StrategyKind::Random),
            "item_bandit" => Ok(StrategyKind::ItemBandit),
            "user_bandit" => Ok(StrategyKind::UserBandit),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Bandit hyperparameters shared by the bandit strategies.
///
/// Unset priors fall back to each strategy's own default (0/0 for the item
/// bandit, 1/1 for the user bandit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BanditSettings {
    pub policy: MabPolicy,
    pub epsilon: f64,
    pub delta: f64,
    pub alpha0: Option<f64>,
    pub beta0: Option<f64>,
}

impl Default for BanditSettings {
    fn default() -> Self {
        Self {
            policy: MabPolicy::EpsilonGreedy,
            epsilon: 0.2,
            delta: 2.0,
            alpha0: None,
            beta0: None,
        }
    }
}

impl BanditSettings {
    pub fn new(policy: MabPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn with_priors(mut self, alpha0: f64, beta0: f64) -> Self {
        self.alpha0 = Some(alpha0);
        self.beta0 = Some(beta0);
        self
    }

    pub(crate) fn bandit_config(&self, n_arms: usize, default_prior: f64) -> BanditConfig {
        BanditConfig::new(self.policy, n_arms)
            .with_epsilon(self.epsilon)
            .with_delta(self.delta)
            .with_priors(
                self.alpha0.unwrap_or(default_prior),
                self.beta0.unwrap_or(default_prior),
            )
    }
}

/// Creates the configured strategy; each strategy gets its own generator
/// seeded from `rng`
pub fn build_recommender(
    kind: StrategyKind,
    store: &RatingStore,
    settings: &BanditSettings,
    rng: &mut StdRng,
) -> Result<Box<dyn Recommender>> {
    let child = StdRng::seed_from_u64(rng.gen());

    let recommender: Box<dyn Recommender> = match kind {
        StrategyKind::MostPopular => Box::new(MostPopularRecommender::new(store, child)),
        StrategyKind::MostValuable => Box::new(MostValuableRecommender::new(store, child)),
        StrategyKind::Random => Box::new(RandomRecommender::new(child)),
        StrategyKind::ItemBandit => Box::new(ItemBanditRecommender::new(store, settings, child)?),
        StrategyKind::UserBandit => Box::new(UserBanditRecommender::new(store, settings, child)?),
    };

    Ok(recommender)
}

/// Candidate list for a session, or `UserExhausted` when it is empty
pub(crate) fn candidates<'a>(
    session: &'a UserSession,
    allow_repetition: bool,
) -> Result<std::borrow::Cow<'a, [usize]>> {
    let items = session.eligible_items(allow_repetition);
    if items.is_empty() {
        return Err(SelectionError::UserExhausted(session.user()));
    }
    Ok(items)
}
