use crate::policy::{ArmView, MabPolicy, PolicyParams};
use crate::{MabError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bandit construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditConfig {
    pub policy: MabPolicy,
    /// Fixed arm cardinality
    pub n_arms: usize,
    /// ε-greedy exploration probability, in [0, 1]
    pub epsilon: f64,
    /// UCB1 confidence weight (negative = growing with the epoch)
    pub delta: f64,
    /// Initial success counter of every arm
    pub alpha0: f64,
    /// Initial failure counter of every arm
    pub beta0: f64,
}

impl BanditConfig {
    pub fn new(policy: MabPolicy, n_arms: usize) -> Self {
        let params = PolicyParams::default();
        Self {
            policy,
            n_arms,
            epsilon: params.epsilon,
            delta: params.delta,
            alpha0: 0.0,
            beta0: 0.0,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_priors(mut self, alpha0: f64, beta0: f64) -> Self {
        self.alpha0 = alpha0;
        self.beta0 = beta0;
        self
    }

    pub fn params(&self) -> PolicyParams {
        PolicyParams {
            epsilon: self.epsilon,
            delta: self.delta,
        }
    }

    /// Reward estimate of an arm that was never updated
    pub fn initial_estimate(&self) -> f64 {
        if self.alpha0 == 0.0 {
            0.0
        } else {
            self.alpha0 / (self.alpha0 + self.beta0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alpha0.is_finite() || !self.beta0.is_finite() {
            return Err(MabError::Validation(
                "alphas and betas must be finite".to_string(),
            ));
        }
        if self.alpha0 < 0.0 || self.beta0 < 0.0 {
            return Err(MabError::Validation(format!(
                "alphas and betas must be both >= 0 (got alpha={}, beta={})",
                self.alpha0, self.beta0
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(MabError::Validation(format!(
                "epsilon must be within [0, 1] (got {})",
                self.epsilon
            )));
        }
        if !self.delta.is_finite() {
            return Err(MabError::Validation("delta must be finite".to_string()));
        }
        Ok(())
    }
}

/// What an `update_rewards` call did to the arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardOutcome {
    Success,
    Failure,
    Ignored,
}

/// Index-aligned per-arm statistics plus the global counters.
///
/// Invariant: `num_pulls.iter().sum() == epoch - 1`.
#[derive(Debug, Clone)]
pub struct ArmState {
    num_pulls: Vec<u64>,
    alphas: Vec<f64>,
    betas: Vec<f64>,
    reward_estimates: Vec<f64>,
    alpha0: f64,
    beta0: f64,
    init_estimate: f64,
    total_reward: f64,
    epoch: u64,
}

impl ArmState {
    pub fn new(config: &BanditConfig) -> Self {
        let init_estimate = config.initial_estimate();
        Self {
            num_pulls: vec![0; config.n_arms],
            alphas: vec![config.alpha0; config.n_arms],
            betas: vec![config.beta0; config.n_arms],
            reward_estimates: vec![init_estimate; config.n_arms],
            alpha0: config.alpha0,
            beta0: config.beta0,
            init_estimate,
            total_reward: 0.0,
            epoch: 1,
        }
    }

    pub fn n_arms(&self) -> usize {
        self.num_pulls.len()
    }

    pub fn num_pulls(&self) -> &[u64] {
        &self.num_pulls
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    pub fn reward_estimates(&self) -> &[f64] {
        &self.reward_estimates
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn view(&self) -> ArmView<'_> {
        ArmView {
            rewards: &self.reward_estimates,
            pulls: &self.num_pulls,
            alphas: &self.alphas,
            betas: &self.betas,
        }
    }

    /// Copies the statistics of `arms` (in the given order) so a policy can
    /// run over the subset.
    pub fn gather(&self, arms: &[usize]) -> Result<ArmSubset> {
        let mut subset = ArmSubset::with_capacity(arms.len());
        for &arm in arms {
            self.check_arm(arm)?;
            subset.rewards.push(self.reward_estimates[arm]);
            subset.pulls.push(self.num_pulls[arm]);
            subset.alphas.push(self.alphas[arm]);
            subset.betas.push(self.betas[arm]);
        }
        Ok(subset)
    }

    pub fn record_pull(&mut self, arm: usize) -> Result<()> {
        self.check_arm(arm)?;
        self.num_pulls[arm] += 1;
        self.epoch += 1;
        Ok(())
    }

    /// Applies a reward: `Some(1.0)` is a success, `Some(0.0)` a failure and
    /// `None` an unknown outcome (a failure only when `nan_as_failure`).
    pub fn update(
        &mut self,
        arm: usize,
        reward: Option<f64>,
        nan_as_failure: bool,
    ) -> Result<RewardOutcome> {
        self.check_arm(arm)?;

        let outcome = match reward {
            Some(r) if r == 1.0 => RewardOutcome::Success,
            Some(r) if r == 0.0 => RewardOutcome::Failure,
            Some(r) => return Err(MabError::InvalidReward(r)),
            None if nan_as_failure => RewardOutcome::Failure,
            None => RewardOutcome::Ignored,
        };

        match outcome {
            RewardOutcome::Success => {
                self.alphas[arm] += 1.0;
                self.total_reward += 1.0;
            }
            RewardOutcome::Failure => self.betas[arm] += 1.0,
            RewardOutcome::Ignored => return Ok(outcome),
        }
        self.reward_estimates[arm] = self.alphas[arm] / (self.alphas[arm] + self.betas[arm]);

        debug!(
            arm = arm,
            outcome = ?outcome,
            estimate = self.reward_estimates[arm],
            "Bandit reward applied"
        );

        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.total_reward = 0.0;
        self.epoch = 1;
        self.num_pulls.fill(0);
        self.alphas.fill(self.alpha0);
        self.betas.fill(self.beta0);
        self.reward_estimates.fill(self.init_estimate);
    }

    fn check_arm(&self, arm: usize) -> Result<()> {
        if arm >= self.n_arms() {
            return Err(MabError::ArmOutOfRange {
                arm,
                n_arms: self.n_arms(),
            });
        }
        Ok(())
    }
}

/// Owned statistics of a subset of arms
#[derive(Debug, Clone, Default)]
pub struct ArmSubset {
    rewards: Vec<f64>,
    pulls: Vec<u64>,
    alphas: Vec<f64>,
    betas: Vec<f64>,
}

impl ArmSubset {
    fn with_capacity(n: usize) -> Self {
        Self {
            rewards: Vec::with_capacity(n),
            pulls: Vec::with_capacity(n),
            alphas: Vec::with_capacity(n),
            betas: Vec::with_capacity(n),
        }
    }

    pub fn view(&self) -> ArmView<'_> {
        ArmView {
            rewards: &self.rewards,
            pulls: &self.pulls,
            alphas: &self.alphas,
            betas: &self.betas,
        }
    }
}

/// State contract shared by the unrestricted and the restricted bandit.
///
/// Only the pull itself differs between the two; recording historical pulls,
/// reward updates and resets go through the shared arm state.
pub trait MultiArmedBandit {
    fn state(&self) -> &ArmState;
    fn state_mut(&mut self) -> &mut ArmState;

    /// Records a pull without running the selection policy (training replay)
    fn pull_fixed_arm(&mut self, arm: usize) -> Result<()> {
        self.state_mut().record_pull(arm)
    }

    fn update_rewards(
        &mut self,
        arm: usize,
        reward: Option<f64>,
        nan_as_failure: bool,
    ) -> Result<RewardOutcome> {
        self.state_mut().update(arm, reward, nan_as_failure)
    }

    /// Returns every arm to its prior and the epoch to 1
    fn reset_bandit(&mut self) {
        self.state_mut().reset();
    }

    fn n_arms(&self) -> usize {
        self.state().n_arms()
    }

    fn epoch(&self) -> u64 {
        self.state().epoch()
    }

    fn total_reward(&self) -> f64 {
        self.state().total_reward()
    }

    fn reward_estimates(&self) -> &[f64] {
        self.state().reward_estimates()
    }

    fn num_pulls(&self) -> &[u64] {
        self.state().num_pulls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(alpha0: f64, beta0: f64) -> ArmState {
        ArmState::new(&BanditConfig::new(MabPolicy::Greedy, 3).with_priors(alpha0, beta0))
    }

    #[test]
    fn test_initial_estimate_from_priors() {
        assert_eq!(state(0.0, 0.0).reward_estimates(), &[0.0, 0.0, 0.0]);
        assert_eq!(state(0.0, 4.0).reward_estimates(), &[0.0, 0.0, 0.0]);
        assert_eq!(state(1.0, 1.0).reward_estimates(), &[0.5, 0.5, 0.5]);
        assert_eq!(state(3.0, 1.0).reward_estimates(), &[0.75, 0.75, 0.75]);
    }

    #[test]
    fn test_success_then_failure_gives_half() {
        let mut arms = state(0.0, 0.0);

        assert_eq!(arms.update(1, Some(1.0), false).unwrap(), RewardOutcome::Success);
        assert_eq!(arms.reward_estimates()[1], 1.0);

        assert_eq!(arms.update(1, Some(0.0), false).unwrap(), RewardOutcome::Failure);
        assert_eq!(arms.reward_estimates()[1], 0.5);
        assert_eq!(arms.total_reward(), 1.0);
    }

    #[test]
    fn test_unknown_reward_handling() {
        let mut arms = state(0.0, 0.0);

        assert_eq!(arms.update(0, None, false).unwrap(), RewardOutcome::Ignored);
        assert_eq!(arms.betas()[0], 0.0);

        assert_eq!(arms.update(0, None, true).unwrap(), RewardOutcome::Failure);
        assert_eq!(arms.betas()[0], 1.0);
        assert_eq!(arms.reward_estimates()[0], 0.0);
    }

    #[test]
    fn test_invalid_reward_rejected() {
        let mut arms = state(0.0, 0.0);

        assert_eq!(arms.update(0, Some(0.5), false), Err(MabError::InvalidReward(0.5)));
        assert!(matches!(
            arms.update(0, Some(f64::NAN), true),
            Err(MabError::InvalidReward(_))
        ));
        assert_eq!(arms.alphas()[0], 0.0);
        assert_eq!(arms.betas()[0], 0.0);
    }

    #[test]
    fn test_out_of_range_arm() {
        let mut arms = state(0.0, 0.0);

        assert_eq!(
            arms.record_pull(3),
            Err(MabError::ArmOutOfRange { arm: 3, n_arms: 3 })
        );
        assert_eq!(arms.epoch(), 1);
        assert!(arms.gather(&[0, 7]).is_err());
    }

    #[test]
    fn test_pull_counter_matches_epoch() {
        let mut arms = state(0.0, 0.0);
        for arm in [0, 2, 2, 1, 2] {
            arms.record_pull(arm).unwrap();
        }

        assert_eq!(arms.num_pulls(), &[1, 1, 3]);
        assert_eq!(arms.num_pulls().iter().sum::<u64>(), arms.epoch() - 1);
    }

    #[test]
    fn test_reset_restores_priors() {
        let mut arms = state(2.0, 2.0);
        arms.record_pull(0).unwrap();
        arms.update(0, Some(1.0), false).unwrap();
        arms.update(2, Some(0.0), false).unwrap();

        arms.reset();

        assert_eq!(arms.epoch(), 1);
        assert_eq!(arms.total_reward(), 0.0);
        assert_eq!(arms.num_pulls(), &[0, 0, 0]);
        assert_eq!(arms.alphas(), &[2.0, 2.0, 2.0]);
        assert_eq!(arms.betas(), &[2.0, 2.0, 2.0]);
        assert_eq!(arms.reward_estimates(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_config_validation() {
        let base = BanditConfig::new(MabPolicy::Ucb, 2);

        assert!(base.validate().is_ok());
        assert!(base.clone().with_priors(-1.0, 0.0).validate().is_err());
        assert!(base.clone().with_priors(0.0, f64::INFINITY).validate().is_err());
        assert!(base.clone().with_epsilon(1.5).validate().is_err());
        assert!(base.clone().with_delta(f64::NAN).validate().is_err());
        // Negative delta is the growing-confidence mode, not an error
        assert!(base.with_delta(-1.0).validate().is_ok());
    }
}
