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

//! Periodic snapshot task.

use crate::error::ServiceResult;
use crate::service::MetricService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Background task writing the service's metrics to its snapshot file
#[derive(Debug)]
pub struct Snapshotter {
    service: Arc<MetricService>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Snapshotter {
    /// Start snapshotting every `period`; the first write happens one period in
    pub fn spawn(service: Arc<MetricService>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&service), period, cancel.clone()));

        info!(period_secs = period.as_secs(), "Snapshot task started");
        Snapshotter {
            service,
            cancel,
            handle,
        }
    }

    /// Stop the loop, wait for it, then write one final snapshot
    ///
    /// Returns the number of metrics in the final snapshot.
    pub async fn shutdown(self) -> ServiceResult<usize> {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Snapshot task ended abnormally");
        }

        let count = self.service.save_snapshot().await?;
        info!(metrics = count, "Final snapshot written");
        Ok(count)
    }
}

async fn run(service: Arc<MetricService>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = service.save_snapshot().await {
                    error!(error = %e, "Periodic snapshot failed");
                }
            }
        }
    }
}
