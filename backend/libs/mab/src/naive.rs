use crate::bandit::{ArmState, BanditConfig, MultiArmedBandit};
use crate::policy::MabPolicy;
use crate::Result;
use rand::rngs::StdRng;
use tracing::debug;

/// Bandit whose pull always considers the full, fixed arm set.
///
/// The bandit only chooses; the caller applies the outcome with
/// `update_rewards` after every pull.
#[derive(Debug, Clone)]
pub struct NaiveBandit {
    config: BanditConfig,
    state: ArmState,
    rng: StdRng,
}

impl NaiveBandit {
    pub fn new(config: BanditConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let state = ArmState::new(&config);
        Ok(Self { config, state, rng })
    }

    pub fn policy(&self) -> MabPolicy {
        self.config.policy
    }

    pub fn config(&self) -> &BanditConfig {
        &self.config
    }

    /// Chooses an arm with the configured policy and records the pull.
    ///
    /// # Returns
    /// Global arm index, or `MabError::UnavailableArms` for a bandit with no arms
    pub fn pull(&mut self) -> Result<usize> {
        let arm = self.config.policy.select(
            self.state.view(),
            self.state.epoch(),
            &self.config.params(),
            &mut self.rng,
        )?;
        self.state.record_pull(arm)?;

        debug!(
            policy = %self.config.policy,
            arm = arm,
            epoch = self.state.epoch(),
            "Bandit arm pulled"
        );

        Ok(arm)
    }
}

impl MultiArmedBandit for NaiveBandit {
    fn state(&self) -> &ArmState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArmState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MabError;
    use rand::SeedableRng;

    fn bandit(policy: MabPolicy, n_arms: usize) -> NaiveBandit {
        NaiveBandit::new(BanditConfig::new(policy, n_arms), StdRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn test_rejects_negative_priors() {
        let config = BanditConfig::new(MabPolicy::ThompsonSampling, 2).with_priors(-0.5, 1.0);
        let result = NaiveBandit::new(config, StdRng::seed_from_u64(0));

        assert!(matches!(result, Err(MabError::Validation(_))));
    }

    #[test]
    fn test_pull_without_arms() {
        let mut mab = bandit(MabPolicy::Random, 0);
        assert_eq!(mab.pull(), Err(MabError::UnavailableArms));
        assert_eq!(mab.epoch(), 1);
    }

    #[test]
    fn test_greedy_follows_training_replay() {
        let mut mab = bandit(MabPolicy::Greedy, 2);
        mab.pull_fixed_arm(0).unwrap();
        mab.update_rewards(0, Some(1.0), false).unwrap();
        mab.pull_fixed_arm(1).unwrap();
        mab.update_rewards(1, Some(0.0), false).unwrap();

        assert_eq!(mab.reward_estimates(), &[1.0, 0.0]);
        for _ in 0..10 {
            assert_eq!(mab.pull().unwrap(), 0);
        }
    }

    #[test]
    fn test_ucb_visits_every_arm_first() {
        let mut mab = bandit(MabPolicy::Ucb, 5);

        let mut first_pulls: Vec<usize> = (0..5).map(|_| mab.pull().unwrap()).collect();
        first_pulls.sort_unstable();

        assert_eq!(first_pulls, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = bandit(MabPolicy::ThompsonSampling, 6);
        let mut b = bandit(MabPolicy::ThompsonSampling, 6);

        let seq_a: Vec<usize> = (0..30).map(|_| a.pull().unwrap()).collect();
        let seq_b: Vec<usize> = (0..30).map(|_| b.pull().unwrap()).collect();

        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_reset_bandit() {
        let mut mab = bandit(MabPolicy::EpsilonGreedy, 3);
        for _ in 0..4 {
            let arm = mab.pull().unwrap();
            mab.update_rewards(arm, Some(1.0), false).unwrap();
        }
        assert_eq!(mab.total_reward(), 4.0);

        mab.reset_bandit();

        assert_eq!(mab.epoch(), 1);
        assert_eq!(mab.total_reward(), 0.0);
        assert_eq!(mab.num_pulls(), &[0, 0, 0]);
    }
}
