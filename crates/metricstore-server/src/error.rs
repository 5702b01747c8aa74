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

//! Service and HTTP error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metricstore_storage::StorageError;
use thiserror::Error;

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by [`MetricService`](crate::service::MetricService)
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Kind is neither `gauge` nor `counter`
    #[error("incorrect metric type: {0}")]
    IncorrectMetricType(String),

    /// Textual value does not parse for the declared kind
    #[error("incorrect metric value for {id}: {value:?}")]
    IncorrectMetricValue {
        /// Metric name
        id: String,
        /// Rejected input
        value: String,
    },

    /// Gauge update without `value`
    #[error("gauge value is nil: {0}")]
    NilGaugeValue(String),

    /// Counter update without `delta`
    #[error("counter delta is nil: {0}")]
    NilCounterDelta(String),

    /// Snapshot requested but no snapshot file is configured
    #[error("no snapshot file configured")]
    SnapshotDisabled,

    /// Backend failure, with the operation that hit it
    #[error("{context}: {source}")]
    Storage {
        /// What the service was doing
        context: &'static str,
        /// Underlying backend error
        #[source]
        source: StorageError,
    },
}

impl ServiceError {
    pub(crate) fn storage(context: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| ServiceError::Storage { context, source }
    }

    /// Read miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Storage { source, .. } if source.is_not_found())
    }

    /// Caller supplied an unusable request
    pub fn is_bad_request(&self) -> bool {
        match self {
            ServiceError::IncorrectMetricType(_)
            | ServiceError::IncorrectMetricValue { .. }
            | ServiceError::NilGaugeValue(_)
            | ServiceError::NilCounterDelta(_) => true,
            ServiceError::Storage { source, .. } => source.is_invalid_input(),
            ServiceError::SnapshotDisabled => false,
        }
    }
}

/// Error returned by HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Update failed; validation maps to 400
    Update(ServiceError),
    /// Read failed; unknown kinds are reported as missing (404)
    Read(ServiceError),
    /// Body is not the expected JSON
    BadBody(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Update(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Update(e) if e.is_bad_request() => StatusCode::BAD_REQUEST,
            ApiError::Read(e)
                if e.is_not_found() || matches!(e, ServiceError::IncorrectMetricType(_)) =>
            {
                StatusCode::NOT_FOUND
            }
            ApiError::Read(e) if e.is_bad_request() => StatusCode::BAD_REQUEST,
            ApiError::Update(_) | ApiError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = ?self, "Request failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            }
            ApiError::Update(e) | ApiError::Read(e) => {
                tracing::debug!(error = %e, %status, "Request rejected");
                e.to_string()
            }
            ApiError::BadBody(msg) => {
                tracing::debug!(error = %msg, "Malformed request body");
                msg.clone()
            }
        };
        (status, message).into_response()
    }
}
