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

//! Structured logging for MetricStore
//!
//! Library crates only emit events through `tracing`; they never hold a
//! logger of their own. The binary installs one subscriber at startup with
//! [`init_tracing`] or [`init_tracing_with_config`].
//!
//! # Features
//!
//! - **Multiple Output Formats**: Pretty, JSON, and compact output formats
//! - **Filtering**: `EnvFilter` directives from configuration or `RUST_LOG`
//! - **Async Context Propagation**: request spans carry through tokio tasks
//!
//! # Example
//!
//! ```no_run
//! use metricstore_observability::{init_tracing, LogFormat};
//!
//! fn main() -> Result<(), metricstore_observability::LogError> {
//!     init_tracing(LogFormat::Pretty, Some("debug"))?;
//!     tracing::info!("Server starting");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
