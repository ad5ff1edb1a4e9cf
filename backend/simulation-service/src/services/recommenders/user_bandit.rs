use super::{candidates, BanditSettings, Recommender, Result, SelectionError};
use crate::models::RatingRecord;
use crate::services::rating_store::RatingStore;
use crate::services::user_session::UserSession;
use crate::utils::pick_uniform;
use mab::{MultiArmedBandit, NaiveBandit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// User-level bandit: every user is an arm.
///
/// A pull picks a neighbor; the target user receives the neighbor's
/// highest-rated candidate item, or a random candidate when the neighbor
/// has no known rating among them.
pub struct UserBanditRecommender {
    bandit: NaiveBandit,
    last_arm: Option<usize>,
    rng: StdRng,
}

impl UserBanditRecommender {
    pub fn new(store: &RatingStore, settings: &BanditSettings, mut rng: StdRng) -> Result<Self> {
        let config = settings.bandit_config(store.n_users(), 1.0);
        let bandit_rng = StdRng::seed_from_u64(rng.gen());
        Ok(Self {
            bandit: NaiveBandit::new(config, bandit_rng)?,
            last_arm: None,
            rng,
        })
    }

    pub fn bandit(&self) -> &NaiveBandit {
        &self.bandit
    }

    /// Neighbor's best known rating among `items`; ties go to the lowest item
    fn best_overlap(store: &RatingStore, neighbor: usize, items: &[usize]) -> Result<Option<usize>> {
        let row = store.row(neighbor)?;
        let mut best: Option<(usize, f64)> = None;

        for &item in items {
            if let Some(rating) = row[item] {
                if best.map_or(true, |(_, r)| rating > r) {
                    best = Some((item, rating));
                }
            }
        }
        Ok(best.map(|(item, _)| item))
    }
}

impl Recommender for UserBanditRecommender {
    fn name(&self) -> &'static str {
        "user_bandit"
    }

    /// Replays every training rating as a pull of the rating's user
    fn train(&mut self, store: &RatingStore) -> Result<()> {
        for rating in store.initial_training_ratings() {
            self.bandit.pull_fixed_arm(rating.user)?;
            self.bandit
                .update_rewards(rating.user, Some(rating.rating), true)?;
        }

        info!(
            replayed = store.initial_training_ratings().len(),
            total_reward = self.bandit.total_reward(),
            "User bandit trained"
        );
        Ok(())
    }

    fn select_item(
        &mut self,
        store: &RatingStore,
        session: &UserSession,
        allow_repetition: bool,
    ) -> Result<usize> {
        let items = candidates(session, allow_repetition)?;

        let neighbor = self
            .bandit
            .pull()
            .map_err(|e| SelectionError::from_bandit(session.user(), e))?;
        self.last_arm = Some(neighbor);

        let item = match Self::best_overlap(store, neighbor, &items)? {
            Some(item) => item,
            None => pick_uniform(&items, &mut self.rng)
                .ok_or(SelectionError::UserExhausted(session.user()))?,
        };

        debug!(
            user = session.user(),
            neighbor = neighbor,
            item = item,
            "User bandit neighbor selected"
        );
        Ok(item)
    }

    fn rating_update(
        &mut self,
        store: &RatingStore,
        _user: usize,
        _item: usize,
        outcome: &RatingRecord,
    ) -> Result<()> {
        if let Some(arm) = self.last_arm {
            self.bandit
                .update_rewards(arm, store.bandit_reward(outcome), false)?;
        }
        Ok(())
    }

    fn epoch_update(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }
}
