use crate::datasets::{BINARY_ANTIRELEVANCE_THRESHOLD, BINARY_RELEVANCE_THRESHOLD};
use crate::services::rating_store::{RewardPolicy, StoreConfig};
use crate::services::recommenders::{BanditSettings, StrategyKind};
use anyhow::{anyhow, Result};
use mab::MabPolicy;
use serde::Deserialize;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

/// Simulation settings, read from `RECSIM_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    // Reproducibility
    pub seed: u64,

    // Strategy
    pub strategy: StrategyKind,
    pub policy: MabPolicy,
    pub epsilon: f64,
    pub delta: f64,
    /// Bandit priors; unset means the strategy default
    pub alpha0: Option<f64>,
    pub beta0: Option<f64>,

    // Loop
    pub max_rounds: u64,
    pub allow_repetition: bool,
    pub enable_metrics: bool,

    // Dataset
    pub relevance_threshold: f64,
    pub antirelevance_threshold: f64,
    pub test_proportion: f64,
    pub reward_policy: RewardPolicy,
    pub n_users: usize,
    pub n_items: usize,

    // Observability
    pub log_format: LogFormat,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            strategy: StrategyKind::ItemBandit,
            policy: MabPolicy::EpsilonGreedy,
            epsilon: 0.2,
            delta: 2.0,
            alpha0: None,
            beta0: None,
            max_rounds: 20,
            allow_repetition: false,
            enable_metrics: true,
            relevance_threshold: BINARY_RELEVANCE_THRESHOLD,
            antirelevance_threshold: BINARY_ANTIRELEVANCE_THRESHOLD,
            test_proportion: 0.8,
            reward_policy: RewardPolicy::Rating,
            n_users: 50,
            n_items: 50,
            log_format: LogFormat::Text,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("seed", 42)?
            .set_default("strategy", "item_bandit")?
            .set_default("policy", "e_greedy")?
            .set_default("epsilon", 0.2)?
            .set_default("delta", 2.0)?
            .set_default("max_rounds", 20)?
            .set_default("allow_repetition", false)?
            .set_default("enable_metrics", true)?
            .set_default("relevance_threshold", BINARY_RELEVANCE_THRESHOLD)?
            .set_default("antirelevance_threshold", BINARY_ANTIRELEVANCE_THRESHOLD)?
            .set_default("test_proportion", 0.8)?
            .set_default("reward_policy", "rating")?
            .set_default("n_users", 50)?
            .set_default("n_items", 50)?
            .set_default("log_format", "text")?
            .add_source(config::Environment::with_prefix("RECSIM").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(anyhow!("Epsilon must be between 0 and 1"));
        }

        if !self.delta.is_finite() {
            return Err(anyhow!("Delta must be finite"));
        }

        for (name, prior) in [("alpha0", self.alpha0), ("beta0", self.beta0)] {
            if let Some(value) = prior {
                if !value.is_finite() || value < 0.0 {
                    return Err(anyhow!("{} must be a finite, non-negative number", name));
                }
            }
        }

        if !self.relevance_threshold.is_finite() || !self.antirelevance_threshold.is_finite() {
            return Err(anyhow!("Relevance thresholds must be finite"));
        }

        if !(0.0..=1.0).contains(&self.test_proportion) {
            return Err(anyhow!("Test proportion must be between 0 and 1"));
        }

        if self.n_users == 0 || self.n_items == 0 {
            return Err(anyhow!("Dataset must have at least one user and one item"));
        }

        if self.max_rounds == 0 {
            return Err(anyhow!("Max rounds must be greater than 0"));
        }

        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.relevance_threshold, self.antirelevance_threshold)
            .with_reward_policy(self.reward_policy)
    }

    pub fn bandit_settings(&self) -> BanditSettings {
        BanditSettings {
            policy: self.policy,
            epsilon: self.epsilon,
            delta: self.delta,
            alpha0: self.alpha0,
            beta0: self.beta0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "RECSIM_STRATEGY",
        "RECSIM_POLICY",
        "RECSIM_EPSILON",
        "RECSIM_MAX_ROUNDS",
        "RECSIM_ALPHA0",
        "RECSIM_ALLOW_REPETITION",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = SimulationConfig {
            epsilon: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.epsilon = 0.1;
        config.alpha0 = Some(-1.0);
        assert!(config.validate().is_err());

        config.alpha0 = Some(1.0);
        config.test_proportion = f64::NAN;
        assert!(config.validate().is_err());

        config.test_proportion = 0.5;
        config.n_items = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = SimulationConfig::from_env().unwrap();
        assert_eq!(config.strategy, StrategyKind::ItemBandit);
        assert_eq!(config.policy, MabPolicy::EpsilonGreedy);
        assert_eq!(config.max_rounds, 20);
        assert_eq!(config.alpha0, None);
        assert!(!config.allow_repetition);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("RECSIM_STRATEGY", "user_bandit");
        std::env::set_var("RECSIM_POLICY", "ucb");
        std::env::set_var("RECSIM_EPSILON", "0.35");
        std::env::set_var("RECSIM_MAX_ROUNDS", "7");
        std::env::set_var("RECSIM_ALPHA0", "2.5");
        std::env::set_var("RECSIM_ALLOW_REPETITION", "true");

        let config = SimulationConfig::from_env().unwrap();
        assert_eq!(config.strategy, StrategyKind::UserBandit);
        assert_eq!(config.policy, MabPolicy::Ucb);
        assert_eq!(config.epsilon, 0.35);
        assert_eq!(config.max_rounds, 7);
        assert_eq!(config.alpha0, Some(2.5));
        assert!(config.allow_repetition);

        let settings = config.bandit_settings();
        assert_eq!(settings.alpha0, Some(2.5));
        assert_eq!(settings.beta0, None);

        clear_env();
    }
}
