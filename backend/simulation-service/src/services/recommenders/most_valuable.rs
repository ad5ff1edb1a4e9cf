use super::{candidates, Recommender, Result, SelectionError};
use crate::models::RatingRecord;
use crate::services::rating_store::RatingStore;
use crate::services::user_session::UserSession;
use crate::utils::pick_highest;
use rand::rngs::StdRng;
use tracing::debug;

/// Laplace smoothing: an unrated item starts at ALPHA / (ALPHA * DELTA) = 0.5
const SMOOTHING_ALPHA: f64 = 1.0;
const SMOOTHING_DELTA: f64 = 2.0;

/// Recommends the eligible item with the highest smoothed mean rating
pub struct MostValuableRecommender {
    counts: Vec<f64>,
    means: Vec<f64>,
    rng: StdRng,
}

impl MostValuableRecommender {
    pub fn new(store: &RatingStore, rng: StdRng) -> Self {
        let prior_count = SMOOTHING_ALPHA * SMOOTHING_DELTA;
        Self {
            counts: vec![prior_count; store.n_items()],
            means: vec![SMOOTHING_ALPHA / prior_count; store.n_items()],
            rng,
        }
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }
}

impl Recommender for MostValuableRecommender {
    fn name(&self) -> &'static str {
        "most_valuable"
    }

    fn train(&mut self, store: &RatingStore) -> Result<()> {
        let prior_count = SMOOTHING_ALPHA * SMOOTHING_DELTA;
        let sums = store.item_known_sums();

        self.counts = store
            .item_known_counts()
            .into_iter()
            .map(|c| c as f64 + prior_count)
            .collect();
        self.means = sums
            .iter()
            .zip(&self.counts)
            .map(|(sum, count)| (sum + SMOOTHING_ALPHA) / count)
            .collect();
        Ok(())
    }

    fn select_item(
        &mut self,
        _store: &RatingStore,
        session: &UserSession,
        allow_repetition: bool,
    ) -> Result<usize> {
        let items = candidates(session, allow_repetition)?;
        let item = pick_highest(&items, &self.means, &mut self.rng)
            .ok_or(SelectionError::UserExhausted(session.user()))?;

        debug!(
            user = session.user(),
            item = item,
            mean = self.means[item],
            "Most valuable item selected"
        );
        Ok(item)
    }

    /// Running mean update; anything but a success counts as 0
    fn rating_update(
        &mut self,
        _store: &RatingStore,
        _user: usize,
        item: usize,
        outcome: &RatingRecord,
    ) -> Result<()> {
        let (Some(count), Some(mean)) = (self.counts.get_mut(item), self.means.get_mut(item))
        else {
            return Ok(());
        };

        let reward = if outcome.is_success() { 1.0 } else { 0.0 };
        let old_count = *count;
        *count += 1.0;
        *mean = (*mean * old_count + reward) / *count;
        Ok(())
    }

    fn epoch_update(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }
}
