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

//! PostgreSQL metric storage backend
//!
//! Every update appends a row to the `metrics` table; the current value of a
//! key is its newest row (`created_at`, then `id` as tie-breaker). The log is
//! never queried as history.
//!
//! Counter updates read the latest total and append the accumulated one. To
//! keep concurrent increments of the same key from losing updates, each
//! counter update runs in a transaction holding a transaction-scoped advisory
//! lock derived from the key. Batches take all their counter locks up front in
//! key order, so two batches cannot deadlock on each other.
//!
//! # Construction
//!
//! [`PostgresStorage::connect`] builds a bounded pool, probes the server, and
//! applies the embedded migrations. The backend is not returned unless all
//! three succeed.

use crate::error::{StorageError, StorageResult};
use crate::metric::{Metric, MetricKey, MetricKind, MetricValue};
use crate::MetricStorage;
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_LATEST: &str = "SELECT delta, value FROM metrics \
     WHERE name = $1 AND type = $2 \
     ORDER BY created_at DESC, id DESC LIMIT 1";

const SELECT_ALL_LATEST: &str = "SELECT DISTINCT ON (name, type) name, type, delta, value \
     FROM metrics ORDER BY name, type, created_at DESC, id DESC";

const INSERT: &str = "INSERT INTO metrics (name, type, delta, value) VALUES ($1, $2, $3, $4)";

const LOCK_KEY: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresOptions {
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long an operation waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        PostgresOptions {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// PostgreSQL-backed metric storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect, verify liveness, and run migrations
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the pool cannot be created or
    /// the probe fails, and [`StorageError::Migration`] if the schema cannot
    /// be brought up to date.
    pub async fn connect(dsn: &str, options: &PostgresOptions) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(dsn)
            .await?;

        let storage = PostgresStorage { pool };
        storage.ping().await?;

        MIGRATOR.run(&storage.pool).await?;
        info!(
            max_connections = options.max_connections,
            "PostgreSQL storage ready, migrations applied"
        );

        Ok(storage)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn lock_key(conn: &mut PgConnection, key: &MetricKey) -> StorageResult<()> {
    sqlx::query(LOCK_KEY)
        .bind(key.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn latest(conn: &mut PgConnection, key: &MetricKey) -> StorageResult<Option<MetricValue>> {
    let row = sqlx::query(SELECT_LATEST)
        .bind(&key.id)
        .bind(key.kind.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| decode_value(key, &row)).transpose()
}

async fn append(conn: &mut PgConnection, key: &MetricKey, value: MetricValue) -> StorageResult<()> {
    let (delta, gauge) = match value {
        MetricValue::Gauge(v) => (None, Some(v)),
        MetricValue::Counter(d) => (Some(d), None),
    };

    sqlx::query(INSERT)
        .bind(&key.id)
        .bind(key.kind.as_str())
        .bind(delta)
        .bind(gauge)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Merge one update; counters must already hold their advisory lock
async fn apply(conn: &mut PgConnection, metric: &Metric) -> StorageResult<Metric> {
    let incoming = metric.payload()?;
    let key = metric.key();

    let merged = match incoming {
        MetricValue::Counter(_) => {
            let current = latest(conn, &key).await?;
            MetricValue::merge(&key, current, incoming)?
        }
        MetricValue::Gauge(_) => incoming,
    };

    append(conn, &key, merged).await?;
    Ok(Metric::from_parts(key, merged))
}

fn decode_value(key: &MetricKey, row: &PgRow) -> StorageResult<MetricValue> {
    let delta: Option<i64> = row.try_get("delta")?;
    let value: Option<f64> = row.try_get("value")?;

    let payload = match key.kind {
        MetricKind::Gauge => value.map(MetricValue::Gauge),
        MetricKind::Counter => delta.map(MetricValue::Counter),
    };
    payload.ok_or_else(|| StorageError::backend(format!("row for {key} has no {} payload", key.kind)))
}

fn decode_metric(row: &PgRow) -> StorageResult<Metric> {
    let name: String = row.try_get("name")?;
    let kind: String = row.try_get("type")?;
    let key = MetricKey::new(kind.parse()?, name);
    let value = decode_value(&key, row)?;
    Ok(Metric::from_parts(key, value))
}

#[async_trait]
impl MetricStorage for PostgresStorage {
    #[instrument(skip(self))]
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<Metric> {
        let key = MetricKey::new(kind, id);
        let mut conn = self.pool.acquire().await?;

        match latest(&mut conn, &key).await? {
            Some(value) => Ok(Metric::from_parts(key, value)),
            None => Err(StorageError::not_found(kind, id)),
        }
    }

    #[instrument(skip(self, metric), fields(id = %metric.id, kind = %metric.kind))]
    async fn set_metric(&self, metric: Metric) -> StorageResult<Metric> {
        metric.payload()?;

        let mut tx = self.pool.begin().await?;
        if metric.kind == MetricKind::Counter {
            lock_key(&mut tx, &metric.key()).await?;
        }
        let stored = apply(&mut tx, &metric).await?;
        tx.commit().await?;

        debug!("Metric appended");
        Ok(stored)
    }

    #[instrument(skip(self, metrics), fields(count = metrics.len()))]
    async fn set_metrics(&self, metrics: Vec<Metric>) -> StorageResult<Vec<Metric>> {
        for metric in &metrics {
            metric.payload()?;
        }

        let counters: BTreeSet<MetricKey> = metrics
            .iter()
            .filter(|m| m.kind == MetricKind::Counter)
            .map(Metric::key)
            .collect();

        let mut tx = self.pool.begin().await?;
        for key in &counters {
            lock_key(&mut tx, key).await?;
        }

        let mut stored = Vec::with_capacity(metrics.len());
        for metric in &metrics {
            stored.push(apply(&mut tx, metric).await?);
        }
        tx.commit().await?;

        debug!(locked = counters.len(), "Batch appended");
        Ok(stored)
    }

    async fn get_all_metrics(&self) -> StorageResult<Vec<Metric>> {
        let rows = sqlx::query(SELECT_ALL_LATEST).fetch_all(&self.pool).await?;

        let mut metrics = rows
            .iter()
            .map(decode_metric)
            .collect::<StorageResult<Vec<_>>>()?;
        metrics.sort_by_key(Metric::key);
        Ok(metrics)
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
