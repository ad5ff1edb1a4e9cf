// Utility functions for simulation-service

use rand::seq::SliceRandom;
use rand::Rng;

/// Ratio that stays at 0 while the denominator is 0
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Uniform pick from a candidate list
pub fn pick_uniform<R: Rng + ?Sized>(candidates: &[usize], rng: &mut R) -> Option<usize> {
    candidates.choose(rng).copied()
}

/// Candidate with the highest `scores[candidate]`, ties broken uniformly
pub fn pick_highest<R: Rng + ?Sized>(
    candidates: &[usize],
    scores: &[f64],
    rng: &mut R,
) -> Option<usize> {
    let gathered: Vec<f64> = candidates.iter().map(|&c| scores[c]).collect();
    mab::uniform_argmax(&gathered, rng).map(|pos| candidates[pos])
}
