//! Rolling statistics view.
//!
//! Every source of counters (threat events, status replies, backend polls)
//! delivers a *partial* snapshot.  [`StatsAggregator::merge`] applies it field
//! by field: a field present in the partial overwrites the current value, a
//! field absent from it is left alone.
//!
//! The view holds at most [`MAX_STATS_COUNTERS`] names.  Once it is full,
//! known counters keep updating and new names are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Detection counters the aggregator seeds with zero.
pub const DETECTION_COUNTERS: [&str; 6] = [
    "total_detections",
    "layer1_supervised",
    "layer2_anomaly",
    "layer3_rules",
    "layer4_slow",
    "ensemble_detections",
];

/// Most distinct counter names the aggregator keeps.
pub const MAX_STATS_COUNTERS: usize = 256;

/// A set of named integer counters.
///
/// Ordered by name so rendering and logging are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsSnapshot(BTreeMap<String, i64>);

impl StatsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for partials in code and tests.
    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Sets `name` to `value`, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: i64) -> Option<i64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extracts the integer-valued fields of a JSON object.
    ///
    /// Non-integer values are skipped; a float that is a whole number (`3.0`)
    /// counts as an integer since some agents emit counters as floats.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .filter_map(|(name, value)| json_integer(value).map(|v| (name.clone(), v)))
            .collect()
    }
}

impl FromIterator<(String, i64)> for StatsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

/// Holds the current merged statistics view.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    current: StatsSnapshot,
    dropped: u64,
}

impl StatsAggregator {
    /// Creates an aggregator with every detection counter at zero.
    pub fn new() -> Self {
        Self::with_counters(DETECTION_COUNTERS)
    }

    /// Creates an aggregator with the given counters seeded at zero.
    pub fn with_counters<I, S>(counters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let current = counters.into_iter().map(|name| (name.into(), 0)).collect();
        Self { current, dropped: 0 }
    }

    /// Applies `partial` field by field.
    ///
    /// Returns how many fields actually changed, so merging the same partial
    /// twice returns 0 the second time.  A new name arriving when the view
    /// already holds [`MAX_STATS_COUNTERS`] names is dropped and not counted.
    pub fn merge(&mut self, partial: &StatsSnapshot) -> usize {
        let mut changed = 0;
        for (name, value) in partial.iter() {
            let len = self.current.len();
            match self.current.0.get_mut(name) {
                Some(current) if *current == value => {}
                Some(current) => {
                    *current = value;
                    changed += 1;
                }
                None if len < MAX_STATS_COUNTERS => {
                    self.current.insert(name, value);
                    changed += 1;
                }
                None => self.drop_counter(name),
            }
        }
        changed
    }

    fn drop_counter(&mut self, name: &str) {
        self.dropped += 1;
        if self.dropped == 1 {
            warn!(
                counter = name,
                limit = MAX_STATS_COUNTERS,
                "stats view is full, ignoring new counters"
            );
        } else {
            debug!(counter = name, dropped = self.dropped, "stats counter ignored");
        }
    }

    /// New counter names ignored because the view was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The latest merged view.
    pub fn current(&self) -> &StatsSnapshot {
        &self.current
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.current.get(name)
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
