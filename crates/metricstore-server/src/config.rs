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

//! Command-line flags for the server binary.

use clap::Parser;
use metricstore_config::CliOverrides;
use std::path::PathBuf;

/// MetricStore server command line
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "metricstore-server")]
#[command(version, about = "Collects counters and gauges over HTTP")]
#[command(
    long_about = "Collects counters and gauges from remote reporters and serves their current values.
Settings are layered: defaults, then the config file, then flags, then METRICSTORE_* environment variables."
)]
pub struct ServerArgs {
    /// Listen address (host:port or :port)
    #[arg(short = 'a', long, value_name = "ADDR")]
    pub address: Option<String>,

    /// Seconds between snapshots; 0 writes the file on every update
    #[arg(short = 'i', long = "store-interval", value_name = "SECS")]
    pub store_interval: Option<u64>,

    /// Snapshot file; an empty value keeps metrics in memory only
    #[arg(short = 'f', long = "file-storage-path", value_name = "PATH")]
    pub file_storage_path: Option<String>,

    /// PostgreSQL connection string; selects the database backend
    #[arg(short = 'd', long = "database-dsn", value_name = "DSN")]
    pub database_dsn: Option<String>,

    /// Replay the snapshot file on startup
    #[arg(short = 'r', long, value_name = "BOOL", num_args = 1)]
    pub restore: Option<bool>,

    /// Log level or filter directive
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Configuration file (.toml, .yaml or .json)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ServerArgs {
    /// Flag values as overrides for the configuration loader
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            address: self.address.clone(),
            store_interval_secs: self.store_interval,
            file_path: self.file_storage_path.clone(),
            database_dsn: self.database_dsn.clone(),
            restore: self.restore,
            log_level: self.log_level.clone(),
        }
    }
}
