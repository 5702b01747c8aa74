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

//! Startup and shutdown sequence shared by the binary and its tests.

use anyhow::{Context, Result};
use metricstore_config::{Config, StorageSelection};
use metricstore_storage::{
    FileStorage, MemoryStorage, MetricStorage, PostgresStorage, RetryPolicy, RetryingStorage,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ServiceResult;
use crate::service::{MetricService, ServiceOptions};
use crate::snapshotter::Snapshotter;
use crate::state::AppState;
use crate::create_router;

/// Backend chosen at startup
#[derive(Debug, Clone)]
pub struct SelectedStorage {
    /// The backend, shared by every request
    pub storage: Arc<dyn MetricStorage>,

    /// Whether the backend keeps accumulated totals on its own
    pub durable: bool,

    retry_cancel: CancellationToken,
    postgres: Option<PostgresStorage>,
}

impl SelectedStorage {
    /// Backend used as-is
    pub fn new(storage: Arc<dyn MetricStorage>, durable: bool) -> Self {
        SelectedStorage {
            storage,
            durable,
            retry_cancel: CancellationToken::new(),
            postgres: None,
        }
    }

    /// Backend wrapped in [`RetryingStorage`]
    ///
    /// Pending back-offs end early once [`SelectedStorage::close`] runs.
    pub fn with_retries<S>(inner: S, policy: RetryPolicy, durable: bool) -> Self
    where
        S: MetricStorage + 'static,
    {
        let retry_cancel = CancellationToken::new();
        let storage = RetryingStorage::new(inner, policy).with_cancellation(retry_cancel.clone());
        SelectedStorage {
            storage: Arc::new(storage),
            durable,
            retry_cancel,
            postgres: None,
        }
    }

    /// Stop retrying and release database connections
    pub async fn close(self) {
        self.retry_cancel.cancel();
        if let Some(postgres) = &self.postgres {
            postgres.close().await;
            info!("PostgreSQL pool closed");
        }
    }
}

/// Open the backend named by `selection`
///
/// The relational backend is wrapped in [`RetryingStorage`].
pub async fn open_storage(
    selection: &StorageSelection,
    policy: RetryPolicy,
) -> Result<SelectedStorage> {
    let selected = match selection {
        StorageSelection::Memory => {
            info!("Using in-memory storage");
            SelectedStorage::new(Arc::new(MemoryStorage::new()), false)
        }
        StorageSelection::File { path, mode } => {
            info!(path = %path.display(), ?mode, "Using file storage");
            SelectedStorage::new(Arc::new(FileStorage::new(path.clone(), *mode)), false)
        }
        StorageSelection::Postgres { dsn, options } => {
            let postgres = PostgresStorage::connect(dsn, options)
                .await
                .context("Failed to open PostgreSQL storage")?;
            SelectedStorage {
                postgres: Some(postgres.clone()),
                ..SelectedStorage::with_retries(postgres, policy, true)
            }
        }
    };

    Ok(selected)
}

/// Build the service on top of `selected`, restoring if configured
pub async fn build_service(config: &Config, selected: &SelectedStorage) -> Result<Arc<MetricService>> {
    let options = ServiceOptions {
        snapshot_path: config.storage.snapshot_path(),
        restore: config.storage.restore,
        durable_backend: selected.durable,
    };

    let service = MetricService::new(Arc::clone(&selected.storage), options)
        .await
        .context("Failed to initialise metric service")?;
    Ok(Arc::new(service))
}

/// Write the final snapshot, then close the backend
///
/// Retries stay live until the snapshot is written, so a connection blip
/// during shutdown does not lose it.
pub async fn finish(
    service: &MetricService,
    snapshotter: Option<Snapshotter>,
    backend: SelectedStorage,
) -> ServiceResult<()> {
    let final_snapshot = match snapshotter {
        Some(snapshotter) => snapshotter.shutdown().await.map(|_| ()),
        None if service.snapshots_enabled() => service.save_snapshot().await.map(|_| ()),
        None => Ok(()),
    };
    if let Err(e) = &final_snapshot {
        error!(error = %e, "Final snapshot failed");
    }

    backend.close().await;
    final_snapshot
}

/// Serve on `listener` until `shutdown` resolves, then write the final snapshot
pub async fn run<F>(config: Config, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let backend = open_storage(&config.storage_selection(), config.retry_policy()).await?;
    let service = build_service(&config, &backend).await?;

    let interval = config.storage.store_interval();
    let snapshotter = (service.snapshots_enabled() && !interval.is_zero())
        .then(|| Snapshotter::spawn(Arc::clone(&service), interval));

    let app = create_router(Arc::new(AppState::new(Arc::clone(&service))));
    let local_addr = listener.local_addr().context("Failed to read listen address")?;
    info!("MetricStore server listening on {}", local_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed");

    info!("Server stopped, flushing metrics");
    let flushed = finish(&service, snapshotter, backend).await;

    served?;
    flushed.context("Failed to write final snapshot")
}
