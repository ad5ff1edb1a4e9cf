use mab::{BanditConfig, MabError, MabPolicy, MultiArmedBandit, NaiveBandit, RestrictedBandit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_pull_count_invariant_for_every_policy() {
    for policy in MabPolicy::ALL {
        let config = BanditConfig::new(policy, 8)
            .with_epsilon(0.3)
            .with_delta(-1.0)
            .with_priors(1.0, 1.0);
        let mut naive = NaiveBandit::new(config.clone(), StdRng::seed_from_u64(11)).unwrap();
        let mut restricted = RestrictedBandit::new(config, StdRng::seed_from_u64(11)).unwrap();
        let mut rewards = StdRng::seed_from_u64(99);

        for step in 0..200usize {
            let arm = if step % 7 == 0 {
                naive.pull_fixed_arm(step % 8).unwrap();
                step % 8
            } else {
                naive.pull().unwrap()
            };
            let reward = match rewards.gen_range(0..3) {
                0 => Some(0.0),
                1 => Some(1.0),
                _ => None,
            };
            naive.update_rewards(arm, reward, step % 2 == 0).unwrap();

            let candidates: Vec<usize> = (0..8).filter(|a| (a + step) % 3 != 0).collect();
            let pulled = restricted.pull(&candidates).unwrap();
            restricted.update_rewards(pulled.arm, reward, false).unwrap();

            assert_eq!(
                naive.num_pulls().iter().sum::<u64>(),
                naive.epoch() - 1,
                "naive {} step {}",
                policy,
                step
            );
            assert_eq!(
                restricted.num_pulls().iter().sum::<u64>(),
                restricted.epoch() - 1,
                "restricted {} step {}",
                policy,
                step
            );
        }
    }
}

#[test]
fn test_ucb_drains_zero_pull_arms_first() {
    for delta in [2.0, 0.0, -1.0] {
        let config = BanditConfig::new(MabPolicy::Ucb, 6).with_delta(delta);
        let mut mab = NaiveBandit::new(config, StdRng::seed_from_u64(3)).unwrap();

        for pulled_so_far in 0..6 {
            let zero_before: Vec<usize> = (0..6).filter(|&a| mab.num_pulls()[a] == 0).collect();
            assert_eq!(zero_before.len(), 6 - pulled_so_far);

            let arm = mab.pull().unwrap();
            assert!(zero_before.contains(&arm), "delta {} picked pulled arm {}", delta, arm);
            mab.update_rewards(arm, Some(1.0), false).unwrap();
        }
    }
}

#[test]
fn test_estimates_are_success_ratios() {
    let config = BanditConfig::new(MabPolicy::Greedy, 2).with_priors(1.0, 1.0);
    let mut mab = RestrictedBandit::new(config, StdRng::seed_from_u64(5)).unwrap();

    for reward in [1.0, 1.0, 0.0, 1.0] {
        mab.pull_fixed_arm(0).unwrap();
        mab.update_rewards(0, Some(reward), false).unwrap();
    }

    // (1 + 3) / (1 + 3 + 1 + 1)
    assert!((mab.reward_estimates()[0] - 4.0 / 6.0).abs() < 1e-12);
    assert_eq!(mab.reward_estimates()[1], 0.5);
    assert_eq!(mab.total_reward(), 3.0);
}

#[test]
fn test_restricted_exhaustion_after_all_arms_forbidden() {
    let config = BanditConfig::new(MabPolicy::EpsilonGreedy, 3);
    let mut mab = RestrictedBandit::new(config, StdRng::seed_from_u64(8)).unwrap();
    let mut available = vec![0, 1, 2];

    while !available.is_empty() {
        let pulled = mab.pull(&available).unwrap();
        available.remove(pulled.position);
    }

    assert_eq!(mab.pull(&available), Err(MabError::UnavailableArms));
    assert_eq!(mab.num_pulls(), &[1, 1, 1]);
}
