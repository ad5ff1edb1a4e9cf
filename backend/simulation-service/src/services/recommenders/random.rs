use super::{candidates, Recommender, Result, SelectionError};
use crate::models::RatingRecord;
use crate::services::rating_store::RatingStore;
use crate::services::user_session::UserSession;
use crate::utils::pick_uniform;
use rand::rngs::StdRng;
use tracing::debug;

/// Uniformly random pick among the eligible items; never learns
pub struct RandomRecommender {
    rng: StdRng,
}

impl RandomRecommender {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Recommender for RandomRecommender {
    fn name(&self) -> &'static str {
        "random"
    }

    fn train(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }

    fn select_item(
        &mut self,
        _store: &RatingStore,
        session: &UserSession,
        allow_repetition: bool,
    ) -> Result<usize> {
        let items = candidates(session, allow_repetition)?;
        let item = pick_uniform(&items, &mut self.rng)
            .ok_or(SelectionError::UserExhausted(session.user()))?;

        debug!(user = session.user(), item = item, "Random item selected");
        Ok(item)
    }

    fn rating_update(
        &mut self,
        _store: &RatingStore,
        _user: usize,
        _item: usize,
        _outcome: &RatingRecord,
    ) -> Result<()> {
        Ok(())
    }

    fn epoch_update(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }
}
