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

//! Configuration management for MetricStore
//!
//! Settings come from four layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. An optional configuration file (TOML, YAML or JSON, chosen by extension)
//! 3. Command-line flags ([`CliOverrides`])
//! 4. Environment variables with the `METRICSTORE_` prefix
//!
//! The effective configuration is validated once all layers are applied.
//! [`Config::storage_selection`] then turns the storage section into a
//! [`StorageSelection`], the single backend choice made at startup.
//!
//! # Example
//!
//! ```no_run
//! use metricstore_config::{CliOverrides, ConfigLoader, StorageSelection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .load(None, &CliOverrides::default())
//!         .await?;
//!
//!     if let StorageSelection::Memory = config.storage_selection() {
//!         println!("metrics will not survive a restart");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{CliOverrides, ConfigFormat, ConfigLoader, ENV_PREFIX};
pub use schema::*;
pub use validation::Validator;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("store_interval_secs = 300"));

        let parsed = ConfigLoader::new()
            .load_from_string(&toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(parsed, config);
    }
}
