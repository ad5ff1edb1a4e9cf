// ============================================
// Rating Store
// ============================================
//
// Reindexes raw (user, item, rating) rows into dense indices and keeps:
// - the known-ratings matrix (training pivot, grows as outcomes are revealed)
// - the immutable held-out set, keyed by (user, item)
// - relevance statistics of the held-out set, computed once
//
// Dense index = position of the key in the sorted, deduplicated key set.

mod catalog;

pub use catalog::Catalog;

use crate::models::{CatalogEntry, EntityKey, RatingRecord, RatingRow, TrainingRating};
use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate key {key} in {catalog} catalog")]
    DuplicateKey { catalog: &'static str, key: String },

    #[error("Key {key} is missing from the {catalog} catalog")]
    UnknownKey { catalog: &'static str, key: String },

    #[error("Held-out set contains ({user}, {item}) more than once")]
    DuplicateHeldOut { user: usize, item: usize },

    #[error("{axis} index {index} out of range (len {len})")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Which part of a held-out record is handed to bandit strategies as reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    /// The held-out rating itself
    #[default]
    Rating,
    /// The rating, only for records flagged `known == true`; anything else is
    /// an unknown reward
    KnownOnly,
}

/// Relevance thresholds; both comparisons are strict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceThresholds {
    pub relevance: f64,
    pub antirelevance: f64,
}

impl RelevanceThresholds {
    pub fn is_relevant(&self, rating: Option<f64>) -> bool {
        rating.map_or(false, |r| r > self.relevance)
    }

    pub fn is_antirelevant(&self, rating: Option<f64>) -> bool {
        rating.map_or(false, |r| r < self.antirelevance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    pub relevance_threshold: f64,
    pub antirelevance_threshold: f64,
    pub reward_policy: RewardPolicy,
}

impl StoreConfig {
    pub fn new(relevance_threshold: f64, antirelevance_threshold: f64) -> Self {
        Self {
            relevance_threshold,
            antirelevance_threshold,
            reward_policy: RewardPolicy::Rating,
        }
    }

    pub fn with_reward_policy(mut self, reward_policy: RewardPolicy) -> Self {
        self.reward_policy = reward_policy;
        self
    }

    pub fn thresholds(&self) -> RelevanceThresholds {
        RelevanceThresholds {
            relevance: self.relevance_threshold,
            antirelevance: self.antirelevance_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.relevance_threshold.is_finite() {
            return Err(StoreError::Validation(format!(
                "relevance threshold must be finite, got {}",
                self.relevance_threshold
            )));
        }
        if !self.antirelevance_threshold.is_finite() {
            return Err(StoreError::Validation(format!(
                "antirelevance threshold must be finite, got {}",
                self.antirelevance_threshold
            )));
        }
        Ok(())
    }
}

/// Builder for a [`RatingStore`]; catalogs are optional and inferred from
/// the ratings when absent
#[derive(Debug, Clone)]
pub struct RatingStoreBuilder {
    config: StoreConfig,
    users: Option<Vec<CatalogEntry>>,
    items: Option<Vec<CatalogEntry>>,
}

impl RatingStoreBuilder {
    pub fn users(mut self, entries: Vec<CatalogEntry>) -> Self {
        self.users = Some(entries);
        self
    }

    pub fn items(mut self, entries: Vec<CatalogEntry>) -> Self {
        self.items = Some(entries);
        self
    }

    /// Builds from pre-split training and held-out tables
    pub fn build_split(self, train: &[RatingRow], test: &[RatingRow]) -> Result<RatingStore> {
        self.config.validate()?;
        validate_rows(train.iter().chain(test.iter()))?;

        let users = match self.users {
            Some(entries) => Catalog::from_entries("users", entries)?,
            None => Catalog::inferred("users", train.iter().chain(test).map(|r| &r.user_key)),
        };
        let items = match self.items {
            Some(entries) => Catalog::from_entries("items", entries)?,
            None => Catalog::inferred("items", train.iter().chain(test).map(|r| &r.item_key)),
        };

        RatingStore::assemble(self.config, users, items, train, test)
    }

    /// Builds from one table, sending each row to the held-out side with
    /// probability `test_proportion`
    pub fn build_sampled<R: Rng + ?Sized>(
        self,
        ratings: &[RatingRow],
        test_proportion: f64,
        rng: &mut R,
    ) -> Result<RatingStore> {
        if !test_proportion.is_finite() || !(0.0..=1.0).contains(&test_proportion) {
            return Err(StoreError::Validation(format!(
                "test proportion must be within [0, 1], got {}",
                test_proportion
            )));
        }

        let (test, train): (Vec<RatingRow>, Vec<RatingRow>) = ratings
            .iter()
            .cloned()
            .partition(|_| rng.gen::<f64>() < test_proportion);

        self.build_split(&train, &test)
    }
}

fn validate_rows<'a>(rows: impl Iterator<Item = &'a RatingRow>) -> Result<()> {
    for row in rows {
        if !row.rating.is_finite() {
            return Err(StoreError::Validation(format!(
                "rating of ({}, {}) must be finite, got {}",
                row.user_key, row.item_key, row.rating
            )));
        }
    }
    Ok(())
}

/// Dense rating data shared by every component of one simulation
#[derive(Debug, Clone)]
pub struct RatingStore {
    config: StoreConfig,
    users: Catalog,
    items: Catalog,
    matrix: Array2<Option<f64>>,
    held_out: Vec<Arc<HashMap<usize, RatingRecord>>>,
    held_out_len: usize,
    initial_training: Vec<TrainingRating>,
    initial_items: Vec<Vec<usize>>,
    relevant_count: usize,
    antirelevant_count: usize,
}

impl RatingStore {
    pub fn builder(config: StoreConfig) -> RatingStoreBuilder {
        RatingStoreBuilder {
            config,
            users: None,
            items: None,
        }
    }

    pub fn from_split(config: StoreConfig, train: &[RatingRow], test: &[RatingRow]) -> Result<Self> {
        Self::builder(config).build_split(train, test)
    }

    pub fn from_whole<R: Rng + ?Sized>(
        config: StoreConfig,
        ratings: &[RatingRow],
        test_proportion: f64,
        rng: &mut R,
    ) -> Result<Self> {
        Self::builder(config).build_sampled(ratings, test_proportion, rng)
    }

    fn assemble(
        config: StoreConfig,
        users: Catalog,
        items: Catalog,
        train: &[RatingRow],
        test: &[RatingRow],
    ) -> Result<Self> {
        let (n_users, n_items) = (users.len(), items.len());

        // Pivot: repeated training pairs collapse to their mean
        let mut cells: BTreeMap<(usize, usize), (f64, u32)> = BTreeMap::new();
        for row in train {
            let user = users.require(&row.user_key)?;
            let item = items.require(&row.item_key)?;
            let cell = cells.entry((user, item)).or_insert((0.0, 0));
            cell.0 += row.rating;
            cell.1 += 1;
        }

        let mut matrix = Array2::from_elem((n_users, n_items), None);
        let mut initial_training = Vec::with_capacity(cells.len());
        let mut initial_items = vec![Vec::new(); n_users];
        for (&(user, item), &(sum, count)) in &cells {
            let rating = sum / f64::from(count);
            matrix[[user, item]] = Some(rating);
            initial_training.push(TrainingRating { user, item, rating });
            // BTreeMap order keeps each user's list sorted
            initial_items[user].push(item);
        }

        let thresholds = config.thresholds();
        let mut held_out: Vec<HashMap<usize, RatingRecord>> = vec![HashMap::new(); n_users];
        let mut relevant_count = 0;
        let mut antirelevant_count = 0;
        for row in test {
            let user = users.require(&row.user_key)?;
            let item = items.require(&row.item_key)?;
            let record = RatingRecord::rated(row.rating)
                .with_known(row.known)
                .with_extra(row.extra.clone());

            if held_out[user].insert(item, record.clone()).is_some() {
                return Err(StoreError::DuplicateHeldOut { user, item });
            }
            if thresholds.is_relevant(record.rating) {
                relevant_count += 1;
            }
            if thresholds.is_antirelevant(record.rating) {
                antirelevant_count += 1;
            }
        }

        info!(
            n_users = n_users,
            n_items = n_items,
            training_ratings = initial_training.len(),
            held_out_ratings = test.len(),
            relevant = relevant_count,
            antirelevant = antirelevant_count,
            "Rating store built"
        );

        Ok(Self {
            config,
            users,
            items,
            matrix,
            held_out: held_out.into_iter().map(Arc::new).collect(),
            held_out_len: test.len(),
            initial_training,
            initial_items,
            relevant_count,
            antirelevant_count,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    pub fn users(&self) -> &Catalog {
        &self.users
    }

    pub fn items(&self) -> &Catalog {
        &self.items
    }

    pub fn user_key(&self, user: usize) -> Option<&EntityKey> {
        self.users.key(user)
    }

    pub fn item_key(&self, item: usize) -> Option<&EntityKey> {
        self.items.key(item)
    }

    /// Every dense user index
    pub fn list_users(&self) -> Vec<usize> {
        (0..self.n_users()).collect()
    }

    pub fn matrix(&self) -> &Array2<Option<f64>> {
        &self.matrix
    }

    pub fn get_known_rating(&self, user: usize, item: usize) -> Result<Option<f64>> {
        self.check_user(user)?;
        self.check_item(item)?;
        Ok(self.matrix[[user, item]])
    }

    /// Upserts a cell; an unknown rating never overwrites anything
    pub fn set_rating(&mut self, user: usize, item: usize, rating: Option<f64>) -> Result<()> {
        self.check_user(user)?;
        self.check_item(item)?;
        if let Some(r) = rating {
            self.matrix[[user, item]] = Some(r);
        }
        Ok(())
    }

    pub fn row(&self, user: usize) -> Result<ArrayView1<'_, Option<f64>>> {
        self.check_user(user)?;
        Ok(self.matrix.row(user))
    }

    /// Copies the selected rows/columns; `None` keeps the whole axis
    pub fn submatrix(
        &self,
        users: Option<&[usize]>,
        items: Option<&[usize]>,
    ) -> Result<Array2<Option<f64>>> {
        let rows = match users {
            Some(users) => {
                for &user in users {
                    self.check_user(user)?;
                }
                self.matrix.select(Axis(0), users)
            }
            None => self.matrix.clone(),
        };

        match items {
            Some(items) => {
                for &item in items {
                    self.check_item(item)?;
                }
                Ok(rows.select(Axis(1), items))
            }
            None => Ok(rows),
        }
    }

    /// Known (non-unknown) cells of a user's row, in item order
    pub fn user_known_ratings(&self, user: usize) -> Result<Vec<(usize, f64)>> {
        Ok(self
            .row(user)?
            .iter()
            .enumerate()
            .filter_map(|(item, rating)| rating.map(|r| (item, r)))
            .collect())
    }

    /// Number of known ratings per item in the current matrix
    pub fn item_known_counts(&self) -> Vec<u64> {
        self.matrix
            .columns()
            .into_iter()
            .map(|col| col.iter().filter(|r| r.is_some()).count() as u64)
            .collect()
    }

    /// Sum of known ratings per item in the current matrix
    pub fn item_known_sums(&self) -> Vec<f64> {
        self.matrix
            .columns()
            .into_iter()
            .map(|col| col.iter().flatten().sum::<f64>())
            .collect()
    }

    /// The user's held-out ratings, shared with its session
    pub fn user_held_out(&self, user: usize) -> Result<Arc<HashMap<usize, RatingRecord>>> {
        self.check_user(user)?;
        Ok(Arc::clone(&self.held_out[user]))
    }

    /// Held-out record of (user, item), or the unknown sentinel
    pub fn held_out_rating(&self, user: usize, item: usize) -> RatingRecord {
        self.held_out
            .get(user)
            .and_then(|ratings| ratings.get(&item))
            .cloned()
            .unwrap_or_else(RatingRecord::unknown)
    }

    pub fn held_out_len(&self) -> usize {
        self.held_out_len
    }

    pub fn thresholds(&self) -> RelevanceThresholds {
        self.config.thresholds()
    }

    pub fn is_relevant(&self, rating: Option<f64>) -> bool {
        self.thresholds().is_relevant(rating)
    }

    pub fn is_antirelevant(&self, rating: Option<f64>) -> bool {
        self.thresholds().is_antirelevant(rating)
    }

    pub fn relevant_count(&self) -> usize {
        self.relevant_count
    }

    pub fn antirelevant_count(&self) -> usize {
        self.antirelevant_count
    }

    pub fn discoverable_count(&self) -> usize {
        self.relevant_count + self.antirelevant_count
    }

    /// Training pivot as dense triples, in (user, item) order
    pub fn initial_training_ratings(&self) -> &[TrainingRating] {
        &self.initial_training
    }

    /// Items present in the user's training ratings, sorted
    pub fn user_initial_items(&self, user: usize) -> Result<&[usize]> {
        self.check_user(user)?;
        Ok(&self.initial_items[user])
    }

    /// Maps a revealed outcome to the reward fed to bandit strategies.
    ///
    /// The record carries the source row's extra columns in `extra`.
    pub fn bandit_reward(&self, record: &RatingRecord) -> Option<f64> {
        match self.config.reward_policy {
            RewardPolicy::Rating => record.rating,
            RewardPolicy::KnownOnly => match record.known {
                Some(true) => record.rating,
                _ => None,
            },
        }
    }

    fn check_user(&self, user: usize) -> Result<()> {
        if user >= self.n_users() {
            return Err(StoreError::IndexOutOfRange {
                axis: "user",
                index: user,
                len: self.n_users(),
            });
        }
        Ok(())
    }

    fn check_item(&self, item: usize) -> Result<()> {
        if item >= self.n_items() {
            return Err(StoreError::IndexOutOfRange {
                axis: "item",
                index: item,
                len: self.n_items(),
            });
        }
        Ok(())
    }
}
