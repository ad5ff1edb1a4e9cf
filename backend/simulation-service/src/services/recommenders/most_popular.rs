use super::{candidates, Recommender, Result, SelectionError};
use crate::models::RatingRecord;
use crate::services::rating_store::RatingStore;
use crate::services::user_session::UserSession;
use crate::utils::pick_highest;
use rand::rngs::StdRng;
use tracing::debug;

/// Recommends the eligible item with the most known ratings.
///
/// Counts start from the training matrix and grow by one for every revealed
/// success (rating 1).
pub struct MostPopularRecommender {
    counts: Vec<f64>,
    rng: StdRng,
}

impl MostPopularRecommender {
    pub fn new(store: &RatingStore, rng: StdRng) -> Self {
        Self {
            counts: vec![0.0; store.n_items()],
            rng,
        }
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }
}

impl Recommender for MostPopularRecommender {
    fn name(&self) -> &'static str {
        "most_popular"
    }

    fn train(&mut self, store: &RatingStore) -> Result<()> {
        self.counts = store
            .item_known_counts()
            .into_iter()
            .map(|c| c as f64)
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
        let item = pick_highest(&items, &self.counts, &mut self.rng)
            .ok_or(SelectionError::UserExhausted(session.user()))?;

        debug!(
            user = session.user(),
            item = item,
            count = self.counts[item],
            "Most popular item selected"
        );
        Ok(item)
    }

    fn rating_update(
        &mut self,
        _store: &RatingStore,
        _user: usize,
        item: usize,
        outcome: &RatingRecord,
    ) -> Result<()> {
        if outcome.is_success() {
            if let Some(count) = self.counts.get_mut(item) {
                *count += 1.0;
            }
        }
        Ok(())
    }

    fn epoch_update(&mut self, _store: &RatingStore) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingRow;
    use crate::services::rating_store::StoreConfig;
    use rand::SeedableRng;

    // Item 1 has two known ratings, item 0 one, item 2 none
    fn store() -> RatingStore {
        let train = vec![
            RatingRow::new(0, 1, 0.0),
            RatingRow::new(1, 1, 1.0),
            RatingRow::new(1, 0, 1.0),
        ];
        let test = vec![RatingRow::new(2, 2, 1.0)];
        RatingStore::from_split(StoreConfig::new(0.5, 0.5), &train, &test).unwrap()
    }

    #[test]
    fn test_train_counts_known_ratings() {
        let store = store();
        let mut rec = MostPopularRecommender::new(&store, StdRng::seed_from_u64(1));
        rec.train(&store).unwrap();

        assert_eq!(rec.counts(), &[1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_selects_most_popular_eligible_item() {
        let store = store();
        let mut rec = MostPopularRecommender::new(&store, StdRng::seed_from_u64(1));
        rec.train(&store).unwrap();

        let fresh = UserSession::new(2, &store).unwrap();
        assert_eq!(rec.select_item(&store, &fresh, false).unwrap(), 1);

        // User 0 already rated item 1
        let seen = UserSession::new(0, &store).unwrap();
        assert_eq!(rec.select_item(&store, &seen, false).unwrap(), 0);
        assert_eq!(rec.select_item(&store, &seen, true).unwrap(), 1);
    }

    #[test]
    fn test_only_successes_increase_counts() {
        let store = store();
        let mut rec = MostPopularRecommender::new(&store, StdRng::seed_from_u64(1));
        rec.train(&store).unwrap();

        rec.rating_update(&store, 2, 2, &RatingRecord::rated(0.0)).unwrap();
        rec.rating_update(&store, 2, 2, &RatingRecord::unknown()).unwrap();
        assert_eq!(rec.counts()[2], 0.0);

        rec.rating_update(&store, 2, 2, &RatingRecord::rated(1.0)).unwrap();
        rec.rating_update(&store, 0, 2, &RatingRecord::rated(1.0)).unwrap();
        rec.rating_update(&store, 0, 2, &RatingRecord::rated(1.0)).unwrap();
        assert_eq!(rec.counts()[2], 3.0);

        let fresh = UserSession::new(2, &store).unwrap();
        assert_eq!(rec.select_item(&store, &fresh, false).unwrap(), 2);
    }
}
