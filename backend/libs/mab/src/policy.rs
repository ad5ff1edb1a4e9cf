// ============================================
// Arm Selection Policies
// ============================================
//
// Every policy receives the same inputs so they can be swapped freely:
//   - rewards: current reward estimate per candidate arm
//   - pulls:   pull count per candidate arm
//   - alphas:  success counters (Thompson sampling)
//   - betas:   failure counters (Thompson sampling)
//   - epoch:   bandit pull counter, starts at 1
//   - params:  ε (e-greedy) and δ (UCB1)
//
// Slices are index-aligned. The returned index is a position inside the
// passed slices, which is only a global arm index when the caller passed the
// full arm set.
//
// UCB1 Formula:
//   UCB(i) = estimate(i) + sqrt(δ * ln(epoch) / n(i))
//
// A negative δ switches to a growing confidence term:
//   δ = 1 + epoch * ln(epoch)^2

use crate::{MabError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MabPolicy {
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "greedy")]
    Greedy,
    #[serde(rename = "e_greedy", alias = "epsilon_greedy")]
    EpsilonGreedy,
    #[serde(rename = "ts", alias = "thompson_sampling")]
    ThompsonSampling,
    #[serde(rename = "ucb", alias = "ucb1")]
    Ucb,
}

impl MabPolicy {
    pub const ALL: [MabPolicy; 5] = [
        MabPolicy::Random,
        MabPolicy::Greedy,
        MabPolicy::EpsilonGreedy,
        MabPolicy::ThompsonSampling,
        MabPolicy::Ucb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MabPolicy::Random => "random",
            MabPolicy::Greedy => "greedy",
            MabPolicy::EpsilonGreedy => "e_greedy",
            MabPolicy::ThompsonSampling => "ts",
            MabPolicy::Ucb => "ucb",
        }
    }

    /// Select one candidate arm.
    ///
    /// # Returns
    /// Position of the chosen arm inside `arms`, or `MabError::UnavailableArms`
    /// when `arms` is empty.
    pub fn select<R: Rng + ?Sized>(
        &self,
        arms: ArmView<'_>,
        epoch: u64,
        params: &PolicyParams,
        rng: &mut R,
    ) -> Result<usize> {
        match self {
            MabPolicy::Random => random(arms, rng),
            MabPolicy::Greedy => greedy(arms, rng),
            MabPolicy::EpsilonGreedy => epsilon_greedy(arms, params.epsilon, rng),
            MabPolicy::ThompsonSampling => thompson_sampling(arms, rng),
            MabPolicy::Ucb => ucb1(arms, epoch, params.delta, rng),
        }
    }
}

impl fmt::Display for MabPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MabPolicy {
    type Err = MabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(MabPolicy::Random),
            "greedy" => Ok(MabPolicy::Greedy),
            "e_greedy" | "epsilon_greedy" => Ok(MabPolicy::EpsilonGreedy),
            "ts" | "thompson_sampling" => Ok(MabPolicy::ThompsonSampling),
            "ucb" | "ucb1" => Ok(MabPolicy::Ucb),
            other => Err(MabError::Validation(format!(
                "{} MAB policy does not exist. Try with any of [random, greedy, e_greedy, ts, ucb]",
                other
            ))),
        }
    }
}

/// Policy hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyParams {
    /// Exploration probability for ε-greedy, in [0, 1]
    pub epsilon: f64,
    /// UCB1 confidence weight; negative means "grow with the epoch"
    pub delta: f64,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            delta: 2.0,
        }
    }
}

/// Borrowed, index-aligned statistics of the candidate arms
#[derive(Debug, Clone, Copy)]
pub struct ArmView<'a> {
    pub rewards: &'a [f64],
    pub pulls: &'a [u64],
    pub alphas: &'a [f64],
    pub betas: &'a [f64],
}

impl<'a> ArmView<'a> {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Index of a maximal value, ties broken uniformly at random.
///
/// Returns `None` for an empty slice.
pub fn uniform_argmax<R: Rng + ?Sized>(values: &[f64], rng: &mut R) -> Option<usize> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == max)
        .map(|(i, _)| i)
        .collect();

    ties.choose(rng).copied()
}

pub fn random<R: Rng + ?Sized>(arms: ArmView<'_>, rng: &mut R) -> Result<usize> {
    if arms.is_empty() {
        return Err(MabError::UnavailableArms);
    }
    Ok(rng.gen_range(0..arms.len()))
}

pub fn greedy<R: Rng + ?Sized>(arms: ArmView<'_>, rng: &mut R) -> Result<usize> {
    uniform_argmax(arms.rewards, rng).ok_or(MabError::UnavailableArms)
}

pub fn epsilon_greedy<R: Rng + ?Sized>(
    arms: ArmView<'_>,
    epsilon: f64,
    rng: &mut R,
) -> Result<usize> {
    if arms.is_empty() {
        return Err(MabError::UnavailableArms);
    }

    let draw: f64 = rng.gen();
    if draw < epsilon {
        // Explore
        Ok(rng.gen_range(0..arms.len()))
    } else {
        // Exploit
        greedy(arms, rng)
    }
}

/// Draws Beta(α + 1, β + 1) for every arm and keeps the largest draw.
pub fn thompson_sampling<R: Rng + ?Sized>(arms: ArmView<'_>, rng: &mut R) -> Result<usize> {
    if arms.is_empty() {
        return Err(MabError::UnavailableArms);
    }

    let mut draws = Vec::with_capacity(arms.len());
    for (&alpha, &beta) in arms.alphas.iter().zip(arms.betas) {
        let distribution = Beta::new(alpha + 1.0, beta + 1.0)
            .map_err(|e| MabError::Validation(format!("beta({}, {}): {}", alpha, beta, e)))?;
        draws.push(distribution.sample(rng));
    }

    uniform_argmax(&draws, rng).ok_or(MabError::UnavailableArms)
}

pub fn ucb1<R: Rng + ?Sized>(
    arms: ArmView<'_>,
    epoch: u64,
    delta: f64,
    rng: &mut R,
) -> Result<usize> {
    if arms.is_empty() {
        return Err(MabError::UnavailableArms);
    }

    // Every candidate is pulled once before the confidence term is used
    let unpulled: Vec<usize> = arms
        .pulls
        .iter()
        .enumerate()
        .filter(|(_, &n)| n == 0)
        .map(|(i, _)| i)
        .collect();
    if let Some(&position) = unpulled.choose(rng) {
        return Ok(position);
    }

    let ln_epoch = (epoch.max(1) as f64).ln();
    let delta = if delta < 0.0 {
        1.0 + epoch as f64 * ln_epoch.powi(2)
    } else {
        delta
    };

    let scores: Vec<f64> = arms
        .rewards
        .iter()
        .zip(arms.pulls)
        .map(|(&estimate, &n)| estimate + (delta * ln_epoch / n as f64).sqrt())
        .collect();

    uniform_argmax(&scores, rng).ok_or(MabError::UnavailableArms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn view<'a>(
        rewards: &'a [f64],
        pulls: &'a [u64],
        alphas: &'a [f64],
        betas: &'a [f64],
    ) -> ArmView<'a> {
        ArmView {
            rewards,
            pulls,
            alphas,
            betas,
        }
    }

    #[test]
    fn test_every_policy_rejects_empty_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        let empty = view(&[], &[], &[], &[]);

        for policy in MabPolicy::ALL {
            let result = policy.select(empty, 1, &PolicyParams::default(), &mut rng);
            assert_eq!(result, Err(MabError::UnavailableArms), "policy {}", policy);
        }
    }

    #[test]
    fn test_greedy_picks_best_estimate() {
        let mut rng = StdRng::seed_from_u64(2);
        let arms = view(&[0.1, 0.9, 0.3], &[1, 1, 1], &[0.0; 3], &[0.0; 3]);

        for _ in 0..20 {
            assert_eq!(greedy(arms, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn test_greedy_breaks_ties_uniformly() {
        let mut rng = StdRng::seed_from_u64(3);
        let arms = view(&[0.5, 0.2, 0.5], &[1, 1, 1], &[0.0; 3], &[0.0; 3]);

        let chosen: HashSet<usize> = (0..200).map(|_| greedy(arms, &mut rng).unwrap()).collect();
        assert_eq!(chosen, HashSet::from([0, 2]));
    }

    #[test]
    fn test_epsilon_zero_is_greedy() {
        let mut rng = StdRng::seed_from_u64(4);
        let arms = view(&[0.0, 0.0, 1.0], &[1, 1, 1], &[0.0; 3], &[0.0; 3]);

        for _ in 0..50 {
            assert_eq!(epsilon_greedy(arms, 0.0, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_epsilon_one_explores() {
        let mut rng = StdRng::seed_from_u64(5);
        let arms = view(&[0.0, 0.0, 1.0], &[1, 1, 1], &[0.0; 3], &[0.0; 3]);

        let chosen: HashSet<usize> = (0..300)
            .map(|_| epsilon_greedy(arms, 1.0, &mut rng).unwrap())
            .collect();
        assert_eq!(chosen.len(), 3);
    }

    #[test]
    fn test_ucb_prefers_unpulled_arms() {
        let mut rng = StdRng::seed_from_u64(6);
        let arms = view(&[0.9, 0.0, 0.8, 0.0], &[5, 0, 3, 0], &[0.0; 4], &[0.0; 4]);

        for _ in 0..50 {
            let position = ucb1(arms, 9, 2.0, &mut rng).unwrap();
            assert!(position == 1 || position == 3);
        }
    }

    #[test]
    fn test_ucb_exploration_bonus() {
        let mut rng = StdRng::seed_from_u64(7);
        // Same estimate, arm 1 pulled far less often
        let arms = view(&[0.5, 0.5], &[100, 2], &[0.0; 2], &[0.0; 2]);

        assert_eq!(ucb1(arms, 103, 2.0, &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_ucb_negative_delta_grows_confidence() {
        let mut rng = StdRng::seed_from_u64(8);
        // With δ = 2 the higher estimate wins; with the growing δ the
        // exploration term dominates and the rarely pulled arm wins.
        let arms = view(&[0.9, 0.1], &[50, 10], &[0.0; 2], &[0.0; 2]);

        assert_eq!(ucb1(arms, 61, 2.0, &mut rng).unwrap(), 0);
        assert_eq!(ucb1(arms, 61, -1.0, &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_thompson_favours_successful_arm() {
        let mut rng = StdRng::seed_from_u64(9);
        let arms = view(&[0.0, 0.0], &[100, 100], &[95.0, 5.0], &[5.0, 95.0]);

        let wins = (0..100)
            .filter(|_| thompson_sampling(arms, &mut rng).unwrap() == 0)
            .count();
        assert!(wins > 90);
    }

    #[test]
    fn test_random_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(10);
        let arms = view(&[0.0; 4], &[0; 4], &[0.0; 4], &[0.0; 4]);

        for _ in 0..100 {
            assert!(random(arms, &mut rng).unwrap() < 4);
        }
    }

    #[test]
    fn test_policy_names_round_trip() {
        for policy in MabPolicy::ALL {
            assert_eq!(policy.as_str().parse::<MabPolicy>().unwrap(), policy);
        }
        assert_eq!("UCB1".parse::<MabPolicy>().unwrap(), MabPolicy::Ucb);
        assert!("softmax".parse::<MabPolicy>().is_err());
    }

    #[test]
    fn test_uniform_argmax_empty() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(uniform_argmax(&[], &mut rng), None);
    }
}
