// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Metric entity, identity key and the metric set shared by every backend

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of metric, which decides both the payload type and the merge rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Point-in-time `f64` value, replaced on every update
    Gauge,
    /// Running `i64` total, accumulated on every update
    Counter,
}

impl MetricKind {
    /// Wire name of the kind
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(StorageError::IncorrectMetricType(other.to_string())),
        }
    }
}

/// A metric as exchanged with callers and persisted in snapshots
///
/// Exactly one of `delta`/`value` is meaningful, selected by `kind`. The
/// optional shape mirrors what remote reporters send; use
/// [`Metric::payload`] to get the typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name
    pub id: String,

    /// Metric kind (`gauge` or `counter` on the wire)
    #[serde(rename = "type")]
    pub kind: MetricKind,

    /// Counter increment, or the accumulated total when read back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    /// Gauge value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Metric {
    /// Create a gauge metric
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Metric {
            id: id.into(),
            kind: MetricKind::Gauge,
            delta: None,
            value: Some(value),
        }
    }

    /// Create a counter metric
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Metric {
            id: id.into(),
            kind: MetricKind::Counter,
            delta: Some(delta),
            value: None,
        }
    }

    /// Rebuild a metric from a stored key and payload
    pub fn from_parts(key: MetricKey, value: MetricValue) -> Self {
        match value {
            MetricValue::Gauge(v) => Metric::gauge(key.id, v),
            MetricValue::Counter(d) => Metric::counter(key.id, d),
        }
    }

    /// Identity of this metric
    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.kind, self.id.clone())
    }

    /// Typed payload required by the metric kind
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NilGaugeValue`] or [`StorageError::NilCounterDelta`]
    /// when the field required by `kind` is absent.
    pub fn payload(&self) -> StorageResult<MetricValue> {
        match self.kind {
            MetricKind::Gauge => self
                .value
                .map(MetricValue::Gauge)
                .ok_or_else(|| StorageError::NilGaugeValue(self.id.clone())),
            MetricKind::Counter => self
                .delta
                .map(MetricValue::Counter)
                .ok_or_else(|| StorageError::NilCounterDelta(self.id.clone())),
        }
    }
}

/// Unique identity of a metric: `(kind, id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    /// Metric kind
    pub kind: MetricKind,
    /// Metric name
    pub id: String,
}

impl MetricKey {
    /// Create a key
    pub fn new(kind: MetricKind, id: impl Into<String>) -> Self {
        MetricKey { kind, id: id.into() }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Stored numeric payload of a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Gauge value
    Gauge(f64),
    /// Accumulated counter total
    Counter(i64),
}

impl MetricValue {
    /// Kind matching this payload
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// Apply an update on top of the currently stored payload.
    ///
    /// Counters add the incoming delta to the stored total, gauges take the
    /// incoming value as-is.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IncorrectMetricValue`] if a counter total would
    /// overflow `i64`.
    pub fn merge(
        key: &MetricKey,
        current: Option<MetricValue>,
        incoming: MetricValue,
    ) -> StorageResult<MetricValue> {
        match (current, incoming) {
            (Some(MetricValue::Counter(total)), MetricValue::Counter(delta)) => total
                .checked_add(delta)
                .map(MetricValue::Counter)
                .ok_or_else(|| {
                    StorageError::IncorrectMetricValue(format!(
                        "counter {} overflows: {} + {}",
                        key.id, total, delta
                    ))
                }),
            (_, incoming) => Ok(incoming),
        }
    }
}

/// Full collection of current metric values, one entry per key
///
/// Ordered by key so listings and snapshots are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    entries: BTreeMap<MetricKey, MetricValue>,
}

impl MetricSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored payload for a key
    pub fn get(&self, key: &MetricKey) -> Option<MetricValue> {
        self.entries.get(key).copied()
    }

    /// Store a payload, returning the previous one
    pub fn insert(&mut self, key: MetricKey, value: MetricValue) -> Option<MetricValue> {
        self.entries.insert(key, value)
    }

    /// Remove a key, returning its payload
    pub fn remove(&mut self, key: &MetricKey) -> Option<MetricValue> {
        self.entries.remove(key)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, MetricKey, MetricValue> {
        self.entries.iter()
    }

    /// Materialise the set as a metric list, in key order
    pub fn to_metrics(&self) -> Vec<Metric> {
        self.entries
            .iter()
            .map(|(key, value)| Metric::from_parts(key.clone(), *value))
            .collect()
    }
}

impl FromIterator<(MetricKey, MetricValue)> for MetricSet {
    fn from_iter<I: IntoIterator<Item = (MetricKey, MetricValue)>>(iter: I) -> Self {
        MetricSet {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MetricSet {
    type Item = (MetricKey, MetricValue);
    type IntoIter = btree_map::IntoIter<MetricKey, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
