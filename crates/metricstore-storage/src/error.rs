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

//! Storage error types and utilities

use crate::metric::MetricKind;
use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// SQLSTATE class for connection exceptions (`08xxx`)
const CONNECTION_EXCEPTION_CLASS: &str = "08";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No metric is stored under the requested key
    #[error("item not found: {kind} {id}")]
    NotFound {
        /// Kind half of the missing key
        kind: MetricKind,
        /// Identifier half of the missing key
        id: String,
    },

    /// Metric kind is neither `gauge` nor `counter`
    #[error("incorrect metric type: {0}")]
    IncorrectMetricType(String),

    /// Metric value cannot be represented for its kind
    #[error("incorrect metric value: {0}")]
    IncorrectMetricValue(String),

    /// Gauge submitted without a value
    #[error("gauge value is nil: {0}")]
    NilGaugeValue(String),

    /// Counter submitted without a delta
    #[error("counter delta is nil: {0}")]
    NilCounterDelta(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot payload could not be encoded or decoded
    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Database driver or pool error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Storage backend not available or returned inconsistent data
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create a NotFound error for the given key
    pub fn not_found<S: Into<String>>(kind: MetricKind, id: S) -> Self {
        StorageError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Check if this error describes invalid input rather than a backend fault
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StorageError::IncorrectMetricType(_)
                | StorageError::IncorrectMetricValue(_)
                | StorageError::NilGaugeValue(_)
                | StorageError::NilCounterDelta(_)
        )
    }

    /// Check if this error is a broken or unavailable database link
    ///
    /// Only these errors are worth retrying: constraint violations, data
    /// errors and decoding failures will fail the same way on every attempt.
    pub fn is_connection_error(&self) -> bool {
        let StorageError::Database(err) = self else {
            return false;
        };

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db_err) => db_err
                .code()
                .is_some_and(|code| code.starts_with(CONNECTION_EXCEPTION_CLASS)),
            _ => false,
        }
    }
}
