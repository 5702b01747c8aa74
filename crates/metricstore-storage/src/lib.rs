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

//! Metric persistence layer for MetricStore
//!
//! This crate provides a unified, asynchronous storage interface for counters
//! and gauges with three interchangeable backends:
//! - In-memory ([`memory::MemoryStorage`])
//! - File-backed, write-through or deferred ([`file::FileStorage`])
//! - PostgreSQL append-only log ([`postgres::PostgresStorage`])
//!
//! # Architecture
//!
//! The [`MetricStorage`] trait defines the capability set every backend
//! implements. Merge semantics are identical across backends:
//!
//! - **Counters** accumulate: an update adds its delta to the stored total and
//!   the returned metric carries the new total.
//! - **Gauges** overwrite: the last value written wins.
//!
//! [`retry::RetryingStorage`] decorates a backend with bounded retries on
//! connection-level failures, and [`snapshot`] serialises a full
//! [`MetricSet`] for durability and restart recovery.
//!
//! # Examples
//!
//! ```no_run
//! use metricstore_storage::{memory::MemoryStorage, Metric, MetricKind, MetricStorage};
//!
//! #[tokio::main]
//! async fn main() -> metricstore_storage::StorageResult<()> {
//!     let storage = MemoryStorage::new();
//!
//!     storage.set_metric(Metric::counter("hits", 5)).await?;
//!     let total = storage.set_metric(Metric::counter("hits", 3)).await?;
//!     assert_eq!(total.delta, Some(8));
//!
//!     let hits = storage.get_metric(MetricKind::Counter, "hits").await?;
//!     assert_eq!(hits.delta, Some(8));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod metric;
pub mod postgres;
pub mod retry;
pub mod snapshot;

use async_trait::async_trait;
use std::fmt::Debug;

pub use error::{StorageError, StorageResult};
pub use file::{FileStorage, WriteMode};
pub use memory::MemoryStorage;
pub use metric::{Metric, MetricKey, MetricKind, MetricSet, MetricValue};
pub use postgres::{PostgresOptions, PostgresStorage};
pub use retry::{RetryPolicy, RetryingStorage};
pub use snapshot::SnapshotFile;

/// Storage backend trait for metric persistence
///
/// All implementations must be `Send + Sync + Debug` so a single instance can
/// be shared by concurrent request handlers and background tasks.
///
/// # Error Handling
///
/// Operations return [`StorageError`]:
/// - `get_metric`: [`StorageError::NotFound`] when the key was never set
/// - `set_metric` / `set_metrics`: [`StorageError::NilGaugeValue`] or
///   [`StorageError::NilCounterDelta`] when the payload required by the kind
///   is missing, plus backend I/O or database errors
/// - `ping`: backend liveness failures only
#[async_trait]
pub trait MetricStorage: Send + Sync + Debug {
    /// Retrieve the current value of a metric
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no metric is stored under
    /// `(kind, id)`, or a backend error.
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<Metric>;

    /// Apply one update and return the metric as stored afterwards
    ///
    /// For counters the returned `delta` is the accumulated total, not the
    /// increment that was passed in.
    ///
    /// # Errors
    ///
    /// Returns a payload error or a backend error; on error the stored value
    /// is unchanged.
    async fn set_metric(&self, metric: Metric) -> StorageResult<Metric>;

    /// Apply a batch of updates in order with the same per-item semantics
    ///
    /// The returned list is positionally aligned with the input. Backends
    /// with transactions apply the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns the first failing item's error.
    async fn set_metrics(&self, metrics: Vec<Metric>) -> StorageResult<Vec<Metric>>;

    /// Return every stored metric, one entry per distinct key
    ///
    /// # Errors
    ///
    /// Returns a backend error if the set cannot be read.
    async fn get_all_metrics(&self) -> StorageResult<Vec<Metric>>;

    /// Check that the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns a backend error if the liveness probe fails.
    async fn ping(&self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _check_object_safe(_: &dyn MetricStorage) {}
    }

    #[tokio::test]
    async fn backends_are_interchangeable_behind_arc() {
        let storage: std::sync::Arc<dyn MetricStorage> = std::sync::Arc::new(MemoryStorage::new());
        storage.set_metric(Metric::gauge("temp", 1.5)).await.unwrap();
        assert_eq!(storage.get_all_metrics().await.unwrap().len(), 1);
        storage.ping().await.unwrap();
    }
}
