use crate::bandit::{ArmState, BanditConfig, MultiArmedBandit};
use crate::policy::MabPolicy;
use crate::Result;
use rand::rngs::StdRng;
use tracing::debug;

/// Result of a restricted pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestrictedPull {
    /// Position of the chosen arm inside the supplied candidate list
    pub position: usize,
    /// Global arm index; use this one for every later state lookup
    pub arm: usize,
}

/// Bandit that selects only among a caller-supplied subset of arms.
///
/// Used when some arms are forbidden at a given moment, e.g. items that were
/// already recommended to the target user.
#[derive(Debug, Clone)]
pub struct RestrictedBandit {
    config: BanditConfig,
    state: ArmState,
    rng: StdRng,
}

impl RestrictedBandit {
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

    /// Chooses one of `available_arms` and records the pull on the global arm.
    ///
    /// # Returns
    /// `MabError::UnavailableArms` when `available_arms` is empty,
    /// `MabError::ArmOutOfRange` when it names an unknown arm.
    pub fn pull(&mut self, available_arms: &[usize]) -> Result<RestrictedPull> {
        let subset = self.state.gather(available_arms)?;
        let position = self.config.policy.select(
            subset.view(),
            self.state.epoch(),
            &self.config.params(),
            &mut self.rng,
        )?;

        // Pull back to the global arm index
        let arm = available_arms[position];
        self.state.record_pull(arm)?;

        debug!(
            policy = %self.config.policy,
            candidates = available_arms.len(),
            position = position,
            arm = arm,
            "Restricted bandit arm pulled"
        );

        Ok(RestrictedPull { position, arm })
    }
}

impl MultiArmedBandit for RestrictedBandit {
    fn state(&self) -> &ArmState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ArmState {
        &mut self.state
    }
}
