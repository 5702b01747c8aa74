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

//! Snapshot codec
//!
//! A snapshot is the full [`MetricSet`] serialised as a JSON array of metric
//! records. The list form (rather than a map keyed by `(kind, id)`) keeps the
//! file legible and identical to what the HTTP API returns.
//!
//! Decoding is tolerant of first runs and foreign data: empty input yields an
//! empty set, and records without the payload their kind requires are dropped.

use crate::error::StorageResult;
use crate::metric::{Metric, MetricSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Serialise a metric set
///
/// # Errors
///
/// Returns [`StorageError::Snapshot`](crate::StorageError::Snapshot) if
/// serialisation fails.
pub fn encode(set: &MetricSet) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(&set.to_metrics())?)
}

/// Deserialise a metric set produced by [`encode`]
///
/// # Errors
///
/// Returns [`StorageError::Snapshot`](crate::StorageError::Snapshot) if the
/// input is neither blank nor a JSON array of metric records.
pub fn decode(bytes: &[u8]) -> StorageResult<MetricSet> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MetricSet::new());
    }

    let records: Vec<Metric> = serde_json::from_slice(bytes)?;
    let total = records.len();

    let set: MetricSet = records
        .into_iter()
        .filter_map(|record| {
            let value = record.payload().ok()?;
            Some((record.key(), value))
        })
        .collect();

    if set.len() < total {
        debug!(
            records = total,
            kept = set.len(),
            "Dropped snapshot records without a usable payload or with duplicate keys"
        );
    }
    Ok(set)
}

/// Snapshot stored at a single file path
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Create a handle for `path`; nothing is touched on disk until used
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotFile { path: path.into() }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file is an empty set
    ///
    /// # Errors
    ///
    /// Returns an I/O error for anything other than a missing file, or a
    /// codec error if the content cannot be decoded.
    pub async fn load(&self) -> StorageResult<MetricSet> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let set = decode(&bytes)?;
                debug!(path = %self.path.display(), metrics = set.len(), "Loaded snapshot");
                Ok(set)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Snapshot file not found, starting empty");
                Ok(MetricSet::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the snapshot with `set`
    ///
    /// The content is written to a sibling temp file, synced, and renamed
    /// over the target so readers never observe a partial snapshot.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory, temp file, or rename fails.
    pub async fn save(&self, set: &MetricSet) -> StorageResult<()> {
        let data = encode(set)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        let _ = fs::remove_file(&temp_path).await;

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), metrics = set.len(), bytes = data.len(), "Saved snapshot");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricKey, MetricKind, MetricValue};
    use tempfile::TempDir;

    fn sample() -> MetricSet {
        [
            (MetricKey::new(MetricKind::Counter, "hits"), MetricValue::Counter(8)),
            (MetricKey::new(MetricKind::Gauge, "temp"), MetricValue::Gauge(37.1)),
            (MetricKey::new(MetricKind::Gauge, "hits"), MetricValue::Gauge(-0.25)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_round_trip() {
        let set = sample();
        let bytes = encode(&set).unwrap();
        assert_eq!(decode(&bytes).unwrap(), set);
    }

    #[test]
    fn test_empty_set_round_trip() {
        let bytes = encode(&MetricSet::new()).unwrap();
        assert_eq!(bytes, b"[]");
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_blank_input_is_empty_set() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"  \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_encoded_form_is_a_list() {
        let bytes = encode(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert!(list
            .iter()
            .any(|m| m["id"] == "hits" && m["type"] == "counter" && m["delta"] == 8));
    }

    #[test]
    fn test_records_without_payload_are_dropped() {
        let raw = br#"[
            {"id": "ok", "type": "gauge", "value": 1.5},
            {"id": "bare", "type": "counter"},
            {"id": "mismatch", "type": "gauge", "delta": 3}
        ]"#;

        let set = decode(raw).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&MetricKey::new(MetricKind::Gauge, "ok")),
            Some(MetricValue::Gauge(1.5))
        );
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        assert!(decode(b"{not json").is_err());
        assert!(decode(br#"[{"id": "x", "type": "histogram", "value": 1}]"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("absent.json"));
        assert!(file.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested/dir/metrics.json"));

        file.save(&sample()).await.unwrap();
        assert_eq!(file.load().await.unwrap(), sample());
        assert!(!file.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("metrics.json"));

        file.save(&sample()).await.unwrap();
        file.save(&MetricSet::new()).await.unwrap();
        assert!(file.load().await.unwrap().is_empty());
    }
}
