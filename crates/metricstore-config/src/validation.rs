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

//! Semantic checks run after every layer has been applied

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Log levels accepted by `observability.log_level`
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Formats accepted by `observability.log_format`
pub const VALID_LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validator for configuration settings
pub trait Validator {
    /// Check the settings, returning the first problem found
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.storage.validate()?;
        self.retry.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingRequired("server.address".to_string()));
        }

        let port = self.address.rsplit_once(':').map(|(_, port)| port);
        match port.map(str::parse::<u16>) {
            Some(Ok(_)) => Ok(()),
            _ => Err(ConfigError::invalid_value(
                "server.address",
                format!("expected host:port or :port, got {}", self.address),
            )),
        }
    }
}

impl Validator for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(dsn) = &self.database_dsn {
            if dsn.trim().is_empty() {
                return Err(ConfigError::MissingRequired(
                    "storage.database_dsn".to_string(),
                ));
            }

            if self.max_connections == 0 {
                return Err(ConfigError::invalid_value(
                    "storage.max_connections",
                    "must be greater than 0",
                ));
            }
        }

        Ok(())
    }
}

impl Validator for RetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.attempts == 0 {
            return Err(ConfigError::invalid_value(
                "retry.attempts",
                "must be greater than 0",
            ));
        }

        if self.backoff_secs.is_empty() {
            return Err(ConfigError::MissingRequired("retry.backoff_secs".to_string()));
        }

        Ok(())
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", VALID_LOG_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }
}
