use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External identifier of a user or an item.
///
/// Keys are totally ordered (every integer key sorts before every text key),
/// which fixes the dense index assignment of the rating store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    Text(String),
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        EntityKey::Int(value)
    }
}

impl From<i32> for EntityKey {
    fn from(value: i32) -> Self {
        EntityKey::Int(i64::from(value))
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Text(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        EntityKey::Text(value)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Int(v) => write!(f, "{}", v),
            EntityKey::Text(v) => f.write_str(v),
        }
    }
}

/// One raw rating as handed over by a dataset loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRow {
    pub user_key: EntityKey,
    pub item_key: EntityKey,
    pub rating: f64,
    /// Whether the user already knew the item (only some datasets carry it)
    #[serde(default)]
    pub known: Option<bool>,
    /// Any other column of the row (timestamp, context tag, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RatingRow {
    pub fn new(user_key: impl Into<EntityKey>, item_key: impl Into<EntityKey>, rating: f64) -> Self {
        Self {
            user_key: user_key.into(),
            item_key: item_key.into(),
            rating,
            known: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_known(mut self, known: bool) -> Self {
        self.known = Some(known);
        self
    }

    pub fn with_extra(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }
}

/// Catalog row: external key plus opaque attribute columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: EntityKey,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl CatalogEntry {
    pub fn new(key: impl Into<EntityKey>) -> Self {
        Self {
            key: key.into(),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// Held-out outcome of a (user, item) pair.
///
/// `rating == None` is the explicit "unknown" sentinel returned for pairs
/// absent from the held-out set. Extra columns of the source row are carried
/// along for reward mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RatingRecord {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn rated(rating: f64) -> Self {
        Self {
            rating: Some(rating),
            known: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_known(mut self, known: Option<bool>) -> Self {
        self.known = known;
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn extra_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }

    pub fn is_unknown(&self) -> bool {
        self.rating.is_none()
    }

    /// True when the rating is exactly 1 (a binary success)
    pub fn is_success(&self) -> bool {
        self.rating == Some(1.0)
    }
}

/// Training rating expressed with dense indices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingRating {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

/// Cumulative evaluation metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub recall: f64,
    pub precision: f64,
    pub fallout: f64,
    pub antiprecision: f64,
    pub discovery_rate: f64,
}

/// A single simulated recommendation and its revealed outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationEvent {
    pub round: u64,
    pub user: usize,
    pub item: usize,
    pub outcome: RatingRecord,
}

/// Metrics after a completed round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsRow {
    pub round: u64,
    pub recall: f64,
    pub precision: f64,
    pub fallout: f64,
    pub antiprecision: f64,
    pub discovery_rate: f64,
}

impl MetricsRow {
    pub fn new(round: u64, metrics: MetricsSnapshot) -> Self {
        Self {
            round,
            recall: metrics.recall,
            precision: metrics.precision,
            fallout: metrics.fallout,
            antiprecision: metrics.antiprecision,
            discovery_rate: metrics.discovery_rate,
        }
    }
}

/// Result of one recommendation round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: u64,
    pub events: Vec<RecommendationEvent>,
    /// Present only when metrics are enabled
    pub metrics: Option<MetricsSnapshot>,
    /// Users that became exhausted during this round
    pub exhausted_users: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The requested number of rounds/iterations was reached
    MaxRounds,
    /// No active user was left at the start of a round
    SystemExhausted,
    /// The single target user of a fixed-user loop ran out of items
    UserExhausted,
}

/// Output of a round loop
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub strategy: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounds_completed: u64,
    pub stop_reason: StopReason,
    pub events: Vec<RecommendationEvent>,
    pub metrics: Vec<MetricsRow>,
}

/// One iteration of a fixed-user loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedUserRecord {
    pub iteration: u64,
    pub item: usize,
    pub outcome: RatingRecord,
    pub metrics: Option<MetricsSnapshot>,
}

/// Output of a fixed-user loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedUserReport {
    pub user: usize,
    pub stop_reason: StopReason,
    pub records: Vec<FixedUserRecord>,
}
