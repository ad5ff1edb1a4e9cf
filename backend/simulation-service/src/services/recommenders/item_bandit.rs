use super::{candidates, BanditSettings, Recommender, Result, SelectionError};
use crate::models::RatingRecord;
use crate::services::rating_store::RatingStore;
use crate::services::user_session::UserSession;
use mab::{MultiArmedBandit, RestrictedBandit};
use rand::rngs::StdRng;
use tracing::{debug, info};

/// Item-level bandit: every item is an arm, pulls are restricted to the
/// session's candidate items
pub struct ItemBanditRecommender {
    bandit: RestrictedBandit,
    last_arm: Option<usize>,
}

impl ItemBanditRecommender {
    pub fn new(store: &RatingStore, settings: &BanditSettings, rng: StdRng) -> Result<Self> {
        let config = settings.bandit_config(store.n_items(), 0.0);
        Ok(Self {
            bandit: RestrictedBandit::new(config, rng)?,
            last_arm: None,
        })
    }

    pub fn bandit(&self) -> &RestrictedBandit {
        &self.bandit
    }
}

impl Recommender for ItemBanditRecommender {
    fn name(&self) -> &'static str {
        "item_bandit"
    }

    /// Replays every training rating as a pull of its item
    fn train(&mut self, store: &RatingStore) -> Result<()> {
        for rating in store.initial_training_ratings() {
            self.bandit.pull_fixed_arm(rating.item)?;
            self.bandit
                .update_rewards(rating.item, Some(rating.rating), false)?;
        }

        info!(
            replayed = store.initial_training_ratings().len(),
            total_reward = self.bandit.total_reward(),
            "Item bandit trained"
        );
        Ok(())
    }

    fn select_item(
        &mut self,
        _store: &RatingStore,
        session: &UserSession,
        allow_repetition: bool,
    ) -> Result<usize> {
        let items = candidates(session, allow_repetition)?;
        let pulled = self
            .bandit
            .pull(&items)
            .map_err(|e| SelectionError::from_bandit(session.user(), e))?;

        self.last_arm = Some(pulled.arm);
        debug!(
            user = session.user(),
            item = pulled.arm,
            estimate = self.bandit.reward_estimates()[pulled.arm],
            "Item bandit arm selected"
        );
        Ok(pulled.arm)
    }

    /// Rewards go through `RatingStore::bandit_reward`, so the known-only
    /// policy applies to the item bandit as well as to the user bandit.
    fn rating_update(
        &mut self,
        store: &RatingStore,
        _user: usize,
        item: usize,
        outcome: &RatingRecord,
    ) -> Result<()> {
        let arm = self.last_arm.unwrap_or(item);
        self.bandit
            .update_rewards(arm, store.bandit_reward(outcome), false)?;
        Ok(())
    }

    fn epoch_update(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }
}
