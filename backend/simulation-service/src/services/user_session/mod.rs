use crate::models::RatingRecord;
use crate::services::rating_store::{RatingStore, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-user simulation state: items not yet recommended plus a shared view
/// of the user's held-out ratings
#[derive(Debug, Clone)]
pub struct UserSession {
    user: usize,
    n_items: usize,
    /// Sorted; only ever shrinks
    eligible: Vec<usize>,
    held_out: Arc<HashMap<usize, RatingRecord>>,
}

impl UserSession {
    /// Starts from every item minus the ones in the user's training ratings
    pub fn new(user: usize, store: &RatingStore) -> Result<Self> {
        let seen = store.user_initial_items(user)?;
        let eligible = (0..store.n_items())
            .filter(|item| seen.binary_search(item).is_err())
            .collect();

        Ok(Self {
            user,
            n_items: store.n_items(),
            eligible,
            held_out: store.user_held_out(user)?,
        })
    }

    pub fn user(&self) -> usize {
        self.user
    }

    /// Candidate items: the whole item range when repetition is allowed,
    /// otherwise the remaining eligible set
    pub fn eligible_items(&self, allow_repetition: bool) -> Cow<'_, [usize]> {
        if allow_repetition {
            Cow::Owned((0..self.n_items).collect())
        } else {
            Cow::Borrowed(&self.eligible)
        }
    }

    /// Removes `item` from the eligible set; absent items are ignored
    pub fn add_recommended_item(&mut self, item: usize) {
        if let Ok(pos) = self.eligible.binary_search(&item) {
            self.eligible.remove(pos);
        }
    }

    pub fn remaining_items(&self) -> usize {
        self.eligible.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.eligible.is_empty()
    }

    pub fn held_out_rating(&self, item: usize) -> RatingRecord {
        self.held_out
            .get(&item)
            .cloned()
            .unwrap_or_else(RatingRecord::unknown)
    }
}
