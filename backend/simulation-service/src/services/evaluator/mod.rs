// ============================================
// Evaluator
// ============================================
//
// Online accumulator of the five cumulative metrics:
//   recall         = relevant hits / relevant held-out ratings
//   precision      = relevant hits / iterations
//   fallout        = antirelevant hits / antirelevant held-out ratings
//   antiprecision  = antirelevant hits / iterations
//   discovery rate = discoveries / discoverable held-out ratings
//
// Denominators from the held-out set are fixed at construction; a zero
// denominator keeps its metric at 0.

use crate::models::{MetricsSnapshot, RatingRecord};
use crate::services::rating_store::{RatingStore, RelevanceThresholds};
use crate::utils::ratio;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Evaluator {
    thresholds: RelevanceThresholds,
    relevant_total: usize,
    antirelevant_total: usize,
    discoverable_total: usize,

    iterations: u64,
    relevant_hits: u64,
    antirelevant_hits: u64,
    discoveries: u64,
    metrics: MetricsSnapshot,
}

impl Evaluator {
    pub fn new(store: &RatingStore) -> Self {
        Self {
            thresholds: store.thresholds(),
            relevant_total: store.relevant_count(),
            antirelevant_total: store.antirelevant_count(),
            discoverable_total: store.discoverable_count(),
            iterations: 0,
            relevant_hits: 0,
            antirelevant_hits: 0,
            discoveries: 0,
            metrics: MetricsSnapshot::default(),
        }
    }

    /// Folds one revealed outcome into the running metrics
    pub fn all_metrics(&mut self, record: &RatingRecord) -> MetricsSnapshot {
        self.iterations += 1;

        let relevant = self.thresholds.is_relevant(record.rating);
        let antirelevant = self.thresholds.is_antirelevant(record.rating);

        if relevant {
            self.relevant_hits += 1;
            self.metrics.recall = ratio(self.relevant_hits, self.relevant_total as u64);
        }
        self.metrics.precision = ratio(self.relevant_hits, self.iterations);

        if antirelevant {
            self.antirelevant_hits += 1;
            self.metrics.fallout = ratio(self.antirelevant_hits, self.antirelevant_total as u64);
        }
        self.metrics.antiprecision = ratio(self.antirelevant_hits, self.iterations);

        if relevant || antirelevant {
            self.discoveries += 1;
            self.metrics.discovery_rate = ratio(self.discoveries, self.discoverable_total as u64);
        }

        debug!(
            iteration = self.iterations,
            relevant = relevant,
            antirelevant = antirelevant,
            "Outcome evaluated"
        );

        self.metrics
    }

    /// Current values without recording anything
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn restart_metrics(&mut self) {
        self.iterations = 0;
        self.relevant_hits = 0;
        self.antirelevant_hits = 0;
        self.discoveries = 0;
        self.metrics = MetricsSnapshot::default();
    }
}
