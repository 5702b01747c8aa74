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

//! Configuration schema and the storage backend choice it implies

use metricstore_storage::{PostgresOptions, RetryPolicy, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main MetricStore configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend and snapshot settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policy for the relational backend
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Backend chosen once at startup, carrying only the settings it needs
#[derive(Debug, Clone, PartialEq)]
pub enum StorageSelection {
    /// Volatile in-process map
    Memory,
    /// In-process map mirrored to a snapshot file
    File {
        /// Snapshot file path
        path: PathBuf,
        /// Write-through or timer-driven
        mode: WriteMode,
    },
    /// PostgreSQL append-only log
    Postgres {
        /// Connection string
        dsn: String,
        /// Pool settings
        options: PostgresOptions,
    },
}

impl Config {
    /// Pick the storage backend
    ///
    /// A configured DSN takes precedence; otherwise a non-empty file path
    /// selects the file backend, and an empty one selects memory.
    pub fn storage_selection(&self) -> StorageSelection {
        if let Some(dsn) = self.storage.database_dsn.as_deref() {
            return StorageSelection::Postgres {
                dsn: dsn.to_string(),
                options: self.storage.postgres_options(),
            };
        }

        match self.storage.snapshot_path() {
            Some(path) => StorageSelection::File {
                path,
                mode: self.storage.write_mode(),
            },
            None => StorageSelection::Memory,
        }
    }

    /// Retry policy built from `retry`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.attempts,
            self.retry
                .backoff_secs
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
        )
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Listen address, `host:port` or `:port`
    #[serde(default = "default_address")]
    pub address: String,
}

impl ServerConfig {
    /// Address suitable for binding; `:8080` listens on every interface
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }
}

/// Storage backend and snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Snapshot file; empty disables file storage and snapshots
    #[serde(default = "default_file_path")]
    pub file_path: String,

    /// Seconds between snapshots; `0` writes on every update instead
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,

    /// Replay the snapshot on startup
    #[serde(default = "default_true")]
    pub restore: bool,

    /// PostgreSQL connection string
    #[serde(default)]
    pub database_dsn: Option<String>,

    /// Maximum pooled database connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl StorageConfig {
    /// Snapshot path, if one is configured
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        let trimmed = self.file_path.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Snapshot interval
    pub fn store_interval(&self) -> Duration {
        Duration::from_secs(self.store_interval_secs)
    }

    /// File backend write mode implied by the interval
    pub fn write_mode(&self) -> WriteMode {
        if self.store_interval_secs == 0 {
            WriteMode::Sync
        } else {
            WriteMode::Deferred
        }
    }

    /// Pool settings for the relational backend
    pub fn postgres_options(&self) -> PostgresOptions {
        PostgresOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

/// Retry policy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Seconds to wait before each retry; the last entry repeats
    #[serde(default = "default_backoff")]
    pub backoff_secs: Vec<u64>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_true() -> bool {
    true
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_file_path() -> String {
    "/tmp/metrics-db.json".to_string()
}

fn default_store_interval() -> u64 {
    300
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff() -> Vec<u64> {
    vec![1, 3, 5]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: default_address(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            file_path: default_file_path(),
            store_interval_secs: default_store_interval(),
            restore: true,
            database_dsn: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: default_attempts(),
            backoff_secs: default_backoff(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}
