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

//! Bounded retry for transient backend failures
//!
//! [`RetryingStorage`] wraps any [`MetricStorage`] and re-runs an operation
//! when it fails with a connection-level error (see
//! [`crate::StorageError::is_connection_error`]). Every other error is
//! returned on the first attempt. The schedule is fixed, not exponential.
//!
//! The wrapper adds no error kinds of its own: once attempts are exhausted,
//! or the cancellation token fires during a back-off, the caller receives the
//! most recent error from the wrapped backend.
//!
//! A counter update whose commit succeeded but whose reply was lost will be
//! applied again on retry. The database cannot tell the two apart.

use crate::error::StorageResult;
use crate::metric::{Metric, MetricKind};
use crate::MetricStorage;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry policy: total attempts and the delay before each retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before retry `n` is `backoff[min(n, len - 1)]`
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
            ],
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and schedule
    pub fn new(attempts: u32, backoff: Vec<Duration>) -> Self {
        RetryPolicy { attempts, backoff }
    }

    /// Delay before the retry following failed attempt `retry` (0-based)
    pub fn delay(&self, retry: usize) -> Duration {
        match self.backoff.len() {
            0 => Duration::ZERO,
            len => self.backoff[retry.min(len - 1)],
        }
    }
}

/// Backend decorator adding bounded retries on connection errors
#[derive(Debug)]
pub struct RetryingStorage<S> {
    inner: S,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<S: MetricStorage> RetryingStorage<S> {
    /// Wrap `inner` with `policy`
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        RetryingStorage {
            inner,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort pending back-offs when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= attempts || !err.is_connection_error() {
                return Err(err);
            }

            let delay = self.policy.delay(attempt as usize - 1);
            warn!(
                operation,
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Connection error, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    warn!(operation, attempt, "Retry cancelled");
                    return Err(err);
                }
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl<S: MetricStorage> MetricStorage for RetryingStorage<S> {
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<Metric> {
        self.run("get_metric", || self.inner.get_metric(kind, id))
            .await
    }

    async fn set_metric(&self, metric: Metric) -> StorageResult<Metric> {
        self.run("set_metric", || self.inner.set_metric(metric.clone()))
            .await
    }

    async fn set_metrics(&self, metrics: Vec<Metric>) -> StorageResult<Vec<Metric>> {
        self.run("set_metrics", || self.inner.set_metrics(metrics.clone()))
            .await
    }

    async fn get_all_metrics(&self) -> StorageResult<Vec<Metric>> {
        self.run("get_all_metrics", || self.inner.get_all_metrics())
            .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.run("ping", || self.inner.ping()).await
    }
}
