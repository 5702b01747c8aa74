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

//! File-backed metric storage backend
//!
//! [`FileStorage`] keeps the authoritative metric set in a [`MemoryStorage`]
//! and uses a [`SnapshotFile`] as a write-behind target. Reads never touch the
//! file.
//!
//! # Write modes
//!
//! - [`WriteMode::Sync`]: every successful `set_metric`/`set_metrics` writes the
//!   entire set to disk before returning, while the table lock is still held.
//!   If the write fails, the entries touched by the call are put back to their
//!   previous values and the I/O error is returned.
//! - [`WriteMode::Deferred`]: mutations only touch memory; the owner is
//!   expected to snapshot periodically and at shutdown.

use crate::error::StorageResult;
use crate::memory::{Journal, MemoryStorage, MetricTable};
use crate::metric::{Metric, MetricKind};
use crate::snapshot::SnapshotFile;
use crate::MetricStorage;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, error};

/// When the file backend writes its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Write the full set on every mutation
    Sync,
    /// Leave writes to an external timer and shutdown hook
    #[default]
    Deferred,
}

/// Durable backend combining an in-memory table and a snapshot file
#[derive(Debug, Clone)]
pub struct FileStorage {
    memory: MemoryStorage,
    file: SnapshotFile,
    mode: WriteMode,
}

impl FileStorage {
    /// Create an empty file backend writing to `path`
    ///
    /// The file is not read here; restoring previous contents is the
    /// caller's decision.
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        let file = SnapshotFile::new(path);
        debug!(path = %file.path().display(), ?mode, "Created file storage");
        FileStorage {
            memory: MemoryStorage::new(),
            file,
            mode,
        }
    }

    /// Snapshot file this backend writes to
    pub fn snapshot_file(&self) -> &SnapshotFile {
        &self.file
    }

    /// Write the current set to disk regardless of mode
    ///
    /// # Errors
    ///
    /// Returns an I/O or codec error if the snapshot cannot be written.
    pub async fn flush(&self) -> StorageResult<()> {
        let table = self.memory.lock().await;
        self.file.save(table.set()).await
    }

    async fn write_through<T>(
        &self,
        apply: impl FnOnce(&mut MetricTable, &mut Journal) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut table = self.memory.lock().await;
        let mut journal = Journal::new();
        let result = apply(&mut *table, &mut journal)?;

        if self.mode == WriteMode::Sync {
            if let Err(e) = self.file.save(table.set()).await {
                error!(
                    path = %self.file.path().display(),
                    error = %e,
                    "Snapshot write failed, rolling back update"
                );
                table.rollback(journal);
                return Err(e);
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl MetricStorage for FileStorage {
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<Metric> {
        self.memory.get_metric(kind, id).await
    }

    async fn set_metric(&self, metric: Metric) -> StorageResult<Metric> {
        self.write_through(|table, journal| table.apply(&metric, journal))
            .await
    }

    async fn set_metrics(&self, metrics: Vec<Metric>) -> StorageResult<Vec<Metric>> {
        self.write_through(|table, journal| table.apply_batch(&metrics, journal))
            .await
    }

    async fn get_all_metrics(&self) -> StorageResult<Vec<Metric>> {
        self.memory.get_all_metrics().await
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sync_mode_writes_every_update() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("metrics.json"), WriteMode::Sync);

        storage.set_metric(Metric::counter("hits", 5)).await.unwrap();
        storage.set_metric(Metric::counter("hits", 3)).await.unwrap();

        let on_disk = storage.snapshot_file().load().await.unwrap();
        assert_eq!(on_disk.to_metrics(), vec![Metric::counter("hits", 8)]);
    }

    #[tokio::test]
    async fn test_deferred_mode_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        let storage = FileStorage::new(&path, WriteMode::Deferred);

        storage.set_metric(Metric::gauge("temp", 36.6)).await.unwrap();
        assert!(!path.exists());

        storage.flush().await.unwrap();
        let on_disk = storage.snapshot_file().load().await.unwrap();
        assert_eq!(on_disk.to_metrics(), vec![Metric::gauge("temp", 36.6)]);
    }

    #[tokio::test]
    async fn test_reads_come_from_memory() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("metrics.json"), WriteMode::Sync);

        storage.set_metric(Metric::gauge("temp", 1.0)).await.unwrap();
        std::fs::remove_file(storage.snapshot_file().path()).unwrap();

        let temp = storage.get_metric(MetricKind::Gauge, "temp").await.unwrap();
        assert_eq!(temp.value, Some(1.0));
        assert_eq!(storage.get_all_metrics().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let storage = FileStorage::new(blocker.join("metrics.json"), WriteMode::Sync);

        let err = storage
            .set_metric(Metric::counter("hits", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StorageError::Io(_)));

        let err = storage
            .get_metric(MetricKind::Counter, "hits")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_batch_write_rolls_back_every_item() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let storage = FileStorage::new(blocker.join("metrics.json"), WriteMode::Sync);

        let result = storage
            .set_metrics(vec![Metric::counter("hits", 1), Metric::gauge("temp", 2.0)])
            .await;
        assert!(result.is_err());
        assert!(storage.get_all_metrics().await.unwrap().is_empty());
    }

    #[test]
    fn test_default_mode_is_deferred() {
        assert_eq!(WriteMode::default(), WriteMode::Deferred);
    }
}
