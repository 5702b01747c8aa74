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

//! In-memory metric storage backend
//!
//! Provides a thread-safe, in-memory implementation of
//! [`MetricStorage`](crate::MetricStorage). Every operation, read or write,
//! holds one exclusive `tokio::sync::Mutex` for its whole duration, so
//! operations on the same instance never overlap.
//!
//! This backend defines the reference semantics for `get`/`set`/`get_all`
//! that the other backends reproduce.
//!
//! # Examples
//!
//! ```rust,no_run
//! use metricstore_storage::{memory::MemoryStorage, Metric, MetricKind, MetricStorage};
//!
//! #[tokio::main]
//! async fn main() -> metricstore_storage::StorageResult<()> {
//!     let storage = MemoryStorage::new();
//!
//!     storage.set_metric(Metric::gauge("temp", 36.6)).await?;
//!     storage.set_metric(Metric::gauge("temp", 37.1)).await?;
//!
//!     let temp = storage.get_metric(MetricKind::Gauge, "temp").await?;
//!     assert_eq!(temp.value, Some(37.1));
//!     Ok(())
//! }
//! ```

use crate::error::{StorageError, StorageResult};
use crate::metric::{Metric, MetricKey, MetricKind, MetricSet, MetricValue};
use crate::MetricStorage;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Previous payloads of the keys touched by a mutation, in application order
pub(crate) type Journal = Vec<(MetricKey, Option<MetricValue>)>;

/// Metric set plus the merge rules, without any locking
#[derive(Debug, Default)]
pub(crate) struct MetricTable {
    set: MetricSet,
}

impl MetricTable {
    pub(crate) fn get(&self, kind: MetricKind, id: &str) -> StorageResult<Metric> {
        let key = MetricKey::new(kind, id);
        match self.set.get(&key) {
            Some(value) => Ok(Metric::from_parts(key, value)),
            None => Err(StorageError::not_found(kind, id)),
        }
    }

    /// Merge one update, recording the previous payload in `journal`
    pub(crate) fn apply(&mut self, metric: &Metric, journal: &mut Journal) -> StorageResult<Metric> {
        let incoming = metric.payload()?;
        let key = metric.key();
        let previous = self.set.get(&key);
        let merged = MetricValue::merge(&key, previous, incoming)?;

        self.set.insert(key.clone(), merged);
        journal.push((key.clone(), previous));
        Ok(Metric::from_parts(key, merged))
    }

    /// Merge a batch; on the first failure every earlier item is undone
    pub(crate) fn apply_batch(
        &mut self,
        metrics: &[Metric],
        journal: &mut Journal,
    ) -> StorageResult<Vec<Metric>> {
        let mut applied = Vec::with_capacity(metrics.len());
        for metric in metrics {
            match self.apply(metric, journal) {
                Ok(stored) => applied.push(stored),
                Err(e) => {
                    self.rollback(std::mem::take(journal));
                    return Err(e);
                }
            }
        }
        Ok(applied)
    }

    /// Restore the payloads recorded in `journal`, newest first
    pub(crate) fn rollback(&mut self, journal: Journal) {
        for (key, previous) in journal.into_iter().rev() {
            match previous {
                Some(value) => {
                    self.set.insert(key, value);
                }
                None => {
                    self.set.remove(&key);
                }
            }
        }
    }

    pub(crate) fn set(&self) -> &MetricSet {
        &self.set
    }
}

/// In-memory metric storage backend
///
/// Cloning is cheap and clones share the same underlying table.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    table: Arc<Mutex<MetricTable>>,
}

impl MemoryStorage {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with `metrics`
    pub fn with_metrics(metrics: MetricSet) -> Self {
        MemoryStorage {
            table: Arc::new(Mutex::new(MetricTable { set: metrics })),
        }
    }

    /// Number of distinct keys stored
    pub async fn len(&self) -> usize {
        self.table.lock().await.set.len()
    }

    /// Check if nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.set.is_empty()
    }

    /// Point-in-time copy of the whole set
    pub async fn snapshot(&self) -> MetricSet {
        self.table.lock().await.set.clone()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, MetricTable> {
        self.table.lock().await
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage").finish()
    }
}

#[async_trait]
impl MetricStorage for MemoryStorage {
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<Metric> {
        self.lock().await.get(kind, id)
    }

    async fn set_metric(&self, metric: Metric) -> StorageResult<Metric> {
        self.lock().await.apply(&metric, &mut Journal::new())
    }

    async fn set_metrics(&self, metrics: Vec<Metric>) -> StorageResult<Vec<Metric>> {
        self.lock().await.apply_batch(&metrics, &mut Journal::new())
    }

    async fn get_all_metrics(&self) -> StorageResult<Vec<Metric>> {
        Ok(self.lock().await.set.to_metrics())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
