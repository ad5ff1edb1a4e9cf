//! Multi-armed bandit primitives for offline recommendation simulation
//!
//! This library provides the arm-selection machinery used by the bandit-based
//! recommenders:
//! - **Policies**: random, greedy, ε-greedy, Thompson sampling and UCB1, all
//!   pure functions of the arm statistics plus an injected random source
//! - **Arm state**: index-aligned pull counts, α/β counters and reward estimates
//! - **NaiveBandit**: selects over the full, fixed arm set on every pull
//! - **RestrictedBandit**: selects only among a caller-supplied subset of arms
//!
//! # Example: Greedy bandit over three arms
//!
//! ```rust
//! use mab::{BanditConfig, MabPolicy, MultiArmedBandit, NaiveBandit};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = BanditConfig::new(MabPolicy::Greedy, 3);
//! let mut bandit = NaiveBandit::new(config, StdRng::seed_from_u64(7)).unwrap();
//!
//! bandit.pull_fixed_arm(1).unwrap();
//! bandit.update_rewards(1, Some(1.0), false).unwrap();
//!
//! assert_eq!(bandit.pull().unwrap(), 1);
//! ```
//!
//! # Example: Restricting the candidate arms
//!
//! ```rust
//! use mab::{BanditConfig, MabPolicy, RestrictedBandit};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = BanditConfig::new(MabPolicy::Random, 10);
//! let mut bandit = RestrictedBandit::new(config, StdRng::seed_from_u64(7)).unwrap();
//!
//! let pulled = bandit.pull(&[4, 8]).unwrap();
//! assert!(pulled.arm == 4 || pulled.arm == 8);
//! ```

pub mod bandit;
pub mod naive;
pub mod policy;
pub mod restricted;

pub use bandit::{ArmState, BanditConfig, MultiArmedBandit, RewardOutcome};
pub use naive::NaiveBandit;
pub use policy::{uniform_argmax, ArmView, MabPolicy, PolicyParams};
pub use restricted::{RestrictedBandit, RestrictedPull};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MabError {
    /// No candidate arm can be pulled (e.g. a user was recommended every item)
    #[error("The bandit does not have any pullable arm")]
    UnavailableArms,

    #[error("Invalid reward {0}: rewards must be 0, 1 or unknown")]
    InvalidReward(f64),

    #[error("Arm {arm} is out of range for a bandit with {n_arms} arms")]
    ArmOutOfRange { arm: usize, n_arms: usize },

    #[error("Invalid bandit configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, MabError>;
