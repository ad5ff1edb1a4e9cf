// ============================================
// Recommendation Engine
// ============================================
//
// Drives the simulation:
// 1. recommend        - lazily open the user's session, ask the strategy for an item
// 2. check_rating     - reveal the held-out outcome, fold it into the matrix
// 3. rating_update    - per-outcome learning hook of the strategy
// 4. eval             - cumulative metrics (optional)
//
// A user is either active or exhausted; exhaustion is permanent. In
// no-repetition mode a user becomes exhausted as soon as the last eligible
// item was recommended.

use crate::error::{Result, SimulationError};
use crate::models::{
    FixedUserRecord, FixedUserReport, MetricsRow, MetricsSnapshot, RatingRecord,
    RecommendationEvent, RoundReport, SimulationReport, StopReason,
};
use crate::services::evaluator::Evaluator;
use crate::services::rating_store::RatingStore;
use crate::services::recommenders::{Recommender, SelectionError};
use crate::services::user_session::UserSession;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct RecommendationEngine {
    store: RatingStore,
    strategy: Box<dyn Recommender>,
    evaluator: Evaluator,
    sessions: HashMap<usize, UserSession>,
    exhausted: BTreeSet<usize>,
    allow_repetition: bool,
    enable_metrics: bool,
    trained: bool,
    round: u64,
    rng: StdRng,
}

impl RecommendationEngine {
    pub fn new(store: RatingStore, strategy: Box<dyn Recommender>, rng: StdRng) -> Self {
        let evaluator = Evaluator::new(&store);
        Self {
            store,
            strategy,
            evaluator,
            sessions: HashMap::new(),
            exhausted: BTreeSet::new(),
            allow_repetition: false,
            enable_metrics: false,
            trained: false,
            round: 0,
            rng,
        }
    }

    pub fn with_repetition(mut self, allow_repetition: bool) -> Self {
        self.allow_repetition = allow_repetition;
        self
    }

    pub fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Number of rounds started so far
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn session(&self, user: usize) -> Option<&UserSession> {
        self.sessions.get(&user)
    }

    pub fn is_exhausted(&self, user: usize) -> bool {
        self.exhausted.contains(&user)
    }

    /// Users still eligible for recommendations, ascending
    pub fn active_users(&self) -> Vec<usize> {
        (0..self.store.n_users())
            .filter(|user| !self.exhausted.contains(user))
            .collect()
    }

    /// Warm-starts the strategy from the training partition; runs at most once
    pub fn train(&mut self) -> Result<()> {
        if self.trained {
            return Ok(());
        }

        self.strategy.train(&self.store)?;
        self.trained = true;

        info!(
            strategy = self.strategy.name(),
            training_ratings = self.store.initial_training_ratings().len(),
            "Strategy trained"
        );
        Ok(())
    }

    /// Chooses one item for `user` and marks it as recommended
    pub fn recommend(&mut self, user: usize) -> Result<usize> {
        if user >= self.store.n_users() {
            return Err(SimulationError::UnknownUser(user));
        }
        if self.exhausted.contains(&user) {
            return Err(SimulationError::UserExhausted(user));
        }
        self.train()?;

        let session = match self.sessions.entry(user) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(UserSession::new(user, &self.store)?),
        };

        let item = match self
            .strategy
            .select_item(&self.store, session, self.allow_repetition)
        {
            Ok(item) => item,
            Err(SelectionError::UserExhausted(_)) => {
                self.mark_exhausted(user);
                return Err(SimulationError::UserExhausted(user));
            }
            Err(e) => return Err(e.into()),
        };

        session.add_recommended_item(item);
        if !self.allow_repetition && session.is_exhausted() {
            self.mark_exhausted(user);
        }

        debug!(user = user, item = item, "Item recommended");
        Ok(item)
    }

    /// Reveals the held-out outcome and folds it into the known ratings
    pub fn check_rating(&mut self, user: usize, item: usize) -> Result<RatingRecord> {
        let outcome = match self.sessions.get(&user) {
            Some(session) => session.held_out_rating(item),
            None => self.store.held_out_rating(user, item),
        };
        self.store.set_rating(user, item, outcome.rating)?;
        Ok(outcome)
    }

    pub fn eval_recommendation(&mut self, outcome: &RatingRecord) -> MetricsSnapshot {
        self.evaluator.all_metrics(outcome)
    }

    /// Current metrics without recording an outcome
    pub fn metrics(&self) -> MetricsSnapshot {
        self.evaluator.metrics()
    }

    pub fn restart_metrics(&mut self) {
        self.evaluator.restart_metrics();
    }

    /// One recommendation for every active user, in a fresh random order.
    ///
    /// # Returns
    /// `SimulationError::SystemExhausted` when no active user is left; users
    /// exhausted during the round are skipped and reported.
    pub fn recommendation_round(&mut self) -> Result<RoundReport> {
        let mut users = self.active_users();
        if users.is_empty() {
            return Err(SimulationError::SystemExhausted);
        }
        self.train()?;

        self.round += 1;
        users.shuffle(&mut self.rng);

        let mut events = Vec::with_capacity(users.len());
        let mut exhausted_users = Vec::new();

        for user in users {
            let item = match self.recommend(user) {
                Ok(item) => item,
                Err(SimulationError::UserExhausted(user)) => {
                    exhausted_users.push(user);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome = self.step(user, item)?;
            events.push(RecommendationEvent {
                round: self.round,
                user,
                item,
                outcome,
            });

            if self.exhausted.contains(&user) {
                exhausted_users.push(user);
            }
        }

        let metrics = self.enable_metrics.then(|| self.evaluator.metrics());

        debug!(
            round = self.round,
            events = events.len(),
            exhausted = exhausted_users.len(),
            "Round completed"
        );

        Ok(RoundReport {
            round: self.round,
            events,
            metrics,
            exhausted_users,
        })
    }

    /// Runs up to `max_rounds` rounds, calling the strategy's epoch hook
    /// after each; stops early once every user is exhausted
    pub fn recommendation_round_loop(&mut self, max_rounds: u64) -> Result<SimulationReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            strategy = self.strategy.name(),
            max_rounds = max_rounds,
            allow_repetition = self.allow_repetition,
            "Starting recommendation round loop"
        );

        let mut events = Vec::new();
        let mut metrics = Vec::new();
        let mut rounds_completed = 0;
        let mut stop_reason = StopReason::MaxRounds;

        while rounds_completed < max_rounds {
            let report = match self.recommendation_round() {
                Ok(report) => report,
                Err(SimulationError::SystemExhausted) => {
                    stop_reason = StopReason::SystemExhausted;
                    break;
                }
                Err(e) => return Err(e),
            };

            if let Some(snapshot) = report.metrics {
                metrics.push(MetricsRow::new(report.round, snapshot));
            }
            events.extend(report.events);

            self.strategy.epoch_update(&self.store)?;
            rounds_completed += 1;
        }

        info!(
            run_id = %run_id,
            rounds_completed = rounds_completed,
            events = events.len(),
            stop_reason = ?stop_reason,
            "Recommendation round loop finished"
        );

        Ok(SimulationReport {
            run_id,
            strategy: self.strategy.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            rounds_completed,
            stop_reason,
            events,
            metrics,
        })
    }

    /// Recommends to a single user up to `max_iter` times, calling the
    /// epoch hook after every recommendation
    pub fn fixed_user_recommendation_loop(
        &mut self,
        user: usize,
        max_iter: u64,
    ) -> Result<FixedUserReport> {
        let mut records = Vec::new();
        let mut stop_reason = StopReason::MaxRounds;

        for iteration in 1..=max_iter {
            let item = match self.recommend(user) {
                Ok(item) => item,
                Err(SimulationError::UserExhausted(_)) => {
                    stop_reason = StopReason::UserExhausted;
                    break;
                }
                Err(e) => return Err(e),
            };

            let outcome = self.step(user, item)?;
            let metrics = self.enable_metrics.then(|| self.evaluator.metrics());
            records.push(FixedUserRecord {
                iteration,
                item,
                outcome,
                metrics,
            });

            self.strategy.epoch_update(&self.store)?;
        }

        info!(
            user = user,
            recommendations = records.len(),
            stop_reason = ?stop_reason,
            "Fixed user loop finished"
        );

        Ok(FixedUserReport {
            user,
            stop_reason,
            records,
        })
    }

    /// Reveal, learn and (optionally) evaluate one recommendation
    fn step(&mut self, user: usize, item: usize) -> Result<RatingRecord> {
        let outcome = self.check_rating(user, item)?;
        self.strategy
            .rating_update(&self.store, user, item, &outcome)?;
        if self.enable_metrics {
            self.eval_recommendation(&outcome);
        }
        Ok(outcome)
    }

    fn mark_exhausted(&mut self, user: usize) {
        if self.exhausted.insert(user) {
            warn!(user = user, "User exhausted, removed from target users");
        }
    }
}
