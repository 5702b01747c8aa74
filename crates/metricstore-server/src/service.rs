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

//! Backend-agnostic metric business rules.
//!
//! [`MetricService`] validates updates before they reach a backend, converts
//! textual requests into typed metrics, and owns the snapshot file used for
//! restore-on-start and periodic backups.

use crate::error::{ServiceError, ServiceResult};
use metricstore_storage::{Metric, MetricKind, MetricSet, MetricStorage, SnapshotFile, StorageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A metric as submitted by a reporter, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetric {
    /// Metric name
    pub id: String,

    /// Kind as text; anything but `gauge`/`counter` is rejected
    #[serde(rename = "type")]
    pub kind: String,

    /// Counter increment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    /// Gauge value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl RawMetric {
    /// Check the kind and required payload, producing a typed metric
    pub fn validate(self) -> ServiceResult<Metric> {
        let kind = parse_kind(&self.kind)?;
        match kind {
            MetricKind::Gauge => match self.value {
                Some(value) => Ok(Metric::gauge(self.id, value)),
                None => Err(ServiceError::NilGaugeValue(self.id)),
            },
            MetricKind::Counter => match self.delta {
                Some(delta) => Ok(Metric::counter(self.id, delta)),
                None => Err(ServiceError::NilCounterDelta(self.id)),
            },
        }
    }
}

impl From<Metric> for RawMetric {
    fn from(metric: Metric) -> Self {
        RawMetric {
            id: metric.id,
            kind: metric.kind.to_string(),
            delta: metric.delta,
            value: metric.value,
        }
    }
}

fn parse_kind(kind: &str) -> ServiceResult<MetricKind> {
    kind.parse()
        .map_err(|_| ServiceError::IncorrectMetricType(kind.to_string()))
}

/// Startup options for [`MetricService`]
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    /// Snapshot file for restore and backups; `None` disables both
    pub snapshot_path: Option<PathBuf>,

    /// Replay the snapshot into the backend on construction
    pub restore: bool,

    /// Backend persists accumulated totals itself
    ///
    /// Replaying a snapshot into such a backend would add every counter
    /// total on top of itself, so restore is skipped.
    pub durable_backend: bool,
}

/// Metric operations shared by every transport
#[derive(Debug)]
pub struct MetricService {
    storage: Arc<dyn MetricStorage>,
    snapshot: Option<SnapshotFile>,
}

impl MetricService {
    /// Build the service, restoring the last snapshot if requested
    ///
    /// # Errors
    ///
    /// A snapshot that exists but cannot be read or replayed is fatal.
    pub async fn new(storage: Arc<dyn MetricStorage>, options: ServiceOptions) -> ServiceResult<Self> {
        let service = MetricService {
            storage,
            snapshot: options.snapshot_path.map(SnapshotFile::new),
        };

        match (&service.snapshot, options.restore) {
            (Some(file), true) if options.durable_backend => {
                warn!(
                    path = %file.path().display(),
                    "Restore requested but the backend is durable, skipping snapshot replay"
                );
            }
            (Some(_), true) => service.restore().await?,
            (None, true) => debug!("Restore requested without a snapshot file, nothing to do"),
            (_, false) => {}
        }

        Ok(service)
    }

    async fn restore(&self) -> ServiceResult<()> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };

        let set = file
            .load()
            .await
            .map_err(ServiceError::storage("failed to load snapshot for restore"))?;
        if set.is_empty() {
            info!(path = %file.path().display(), "Snapshot empty, nothing to restore");
            return Ok(());
        }

        let count = set.len();
        self.storage
            .set_metrics(set.to_metrics())
            .await
            .map_err(ServiceError::storage("failed to replay snapshot"))?;

        info!(path = %file.path().display(), metrics = count, "Restored metrics from snapshot");
        Ok(())
    }

    /// Current value of one metric
    pub async fn get_metric(&self, kind: &str, id: &str) -> ServiceResult<Metric> {
        let kind = parse_kind(kind)?;
        self.storage
            .get_metric(kind, id)
            .await
            .map_err(ServiceError::storage("failed to get metric"))
    }

    /// Current value of one metric rendered as plain text
    ///
    /// Counters print as integers, gauges in the shortest decimal form that
    /// parses back to the same `f64`.
    pub async fn get_metric_value(&self, kind: &str, id: &str) -> ServiceResult<String> {
        let metric = self.get_metric(kind, id).await?;
        let text = match (metric.delta, metric.value) {
            (Some(delta), _) if metric.kind == MetricKind::Counter => delta.to_string(),
            (_, Some(value)) => value.to_string(),
            _ => {
                return Err(ServiceError::Storage {
                    context: "failed to render metric",
                    source: StorageError::backend(format!(
                        "stored {} {} has no payload",
                        metric.kind, metric.id
                    )),
                })
            }
        };
        Ok(text)
    }

    /// Apply one update and return the stored result
    pub async fn set_metric(&self, raw: RawMetric) -> ServiceResult<Metric> {
        let metric = raw.validate()?;
        self.storage
            .set_metric(metric)
            .await
            .map_err(ServiceError::storage("failed to set metric"))
    }

    /// Apply a batch; nothing reaches the backend unless every item is valid
    pub async fn set_metrics(&self, raw: Vec<RawMetric>) -> ServiceResult<Vec<Metric>> {
        let metrics = raw
            .into_iter()
            .map(RawMetric::validate)
            .collect::<ServiceResult<Vec<_>>>()?;

        self.storage
            .set_metrics(metrics)
            .await
            .map_err(ServiceError::storage("failed to set metrics"))
    }

    /// Apply an update given entirely as text, as in `/update/{type}/{name}/{value}`
    pub async fn set_metric_value(&self, kind: &str, id: &str, value: &str) -> ServiceResult<Metric> {
        let incorrect = || ServiceError::IncorrectMetricValue {
            id: id.to_string(),
            value: value.to_string(),
        };

        let metric = match parse_kind(kind)? {
            MetricKind::Counter => Metric::counter(id, value.parse::<i64>().map_err(|_| incorrect())?),
            MetricKind::Gauge => {
                let parsed = value.parse::<f64>().map_err(|_| incorrect())?;
                if !parsed.is_finite() {
                    return Err(incorrect());
                }
                Metric::gauge(id, parsed)
            }
        };

        self.storage
            .set_metric(metric)
            .await
            .map_err(ServiceError::storage("failed to set metric"))
    }

    /// Every stored metric, one per key
    pub async fn get_all_metrics(&self) -> ServiceResult<Vec<Metric>> {
        self.storage
            .get_all_metrics()
            .await
            .map_err(ServiceError::storage("failed to get all metrics"))
    }

    /// Backend liveness
    pub async fn ping(&self) -> ServiceResult<()> {
        self.storage
            .ping()
            .await
            .map_err(ServiceError::storage("storage ping failed"))
    }

    /// Whether a snapshot file is configured
    pub fn snapshots_enabled(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Write the backend's full metric set to the snapshot file
    ///
    /// Returns the number of metrics written.
    pub async fn save_snapshot(&self) -> ServiceResult<usize> {
        let file = self.snapshot.as_ref().ok_or(ServiceError::SnapshotDisabled)?;

        let metrics = self.get_all_metrics().await?;
        let set: MetricSet = metrics
            .iter()
            .map(|m| m.payload().map(|value| (m.key(), value)))
            .collect::<Result<_, _>>()
            .map_err(ServiceError::storage("failed to collect metrics for snapshot"))?;

        file.save(&set)
            .await
            .map_err(ServiceError::storage("failed to save snapshot"))?;

        debug!(path = %file.path().display(), metrics = metrics.len(), "Snapshot saved");
        Ok(metrics.len())
    }
}
