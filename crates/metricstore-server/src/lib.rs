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

//! HTTP front end and wiring for MetricStore
//!
//! The [`service::MetricService`] holds the backend-agnostic rules; this
//! crate adds the axum router on top of it, the periodic
//! [`snapshotter::Snapshotter`], and the startup sequence used by the
//! `metricstore-server` binary.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod service;
pub mod snapshotter;
pub mod state;

pub use config::ServerArgs;
pub use error::{ApiError, ServiceError, ServiceResult};
pub use service::{MetricService, RawMetric, ServiceOptions};
pub use snapshotter::Snapshotter;
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

/// Create the axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_metrics))
        .route("/ping", get(handlers::ping))
        .route("/update/", post(handlers::update_json))
        .route("/update/:kind/:id/:value", post(handlers::update_path))
        .route("/updates/", post(handlers::update_batch))
        .route("/value/", post(handlers::value_json))
        .route("/value/:kind/:id", get(handlers::value_path))
        .with_state(state)
        // Reporters gzip their bodies; readers may ask for gzip back
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
