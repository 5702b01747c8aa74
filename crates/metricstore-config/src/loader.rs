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

//! Layered configuration loading: file, flags, then environment.

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;
use crate::validation::Validator;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "METRICSTORE_";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// `-a`
    pub address: Option<String>,
    /// `-i`
    pub store_interval_secs: Option<u64>,
    /// `-f`
    pub file_path: Option<String>,
    /// `-d`
    pub database_dsn: Option<String>,
    /// `-r`
    pub restore: Option<bool>,
    /// `-l`
    pub log_level: Option<String>,
}

impl CliOverrides {
    /// Write every present value into `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = &self.address {
            config.server.address.clone_from(address);
        }
        if let Some(interval) = self.store_interval_secs {
            config.storage.store_interval_secs = interval;
        }
        if let Some(path) = &self.file_path {
            config.storage.file_path.clone_from(path);
        }
        if let Some(dsn) = &self.database_dsn {
            config.storage.database_dsn = non_empty(dsn);
        }
        if let Some(restore) = self.restore {
            config.storage.restore = restore;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level.clone_from(level);
        }
    }
}

/// Configuration loader
///
/// Layers, lowest precedence first: built-in defaults, the optional config
/// file, command-line flags, then `METRICSTORE_*` environment variables.
#[derive(Debug)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Build the effective configuration from every layer
    pub async fn load(&self, file: Option<&Path>, cli: &CliOverrides) -> ConfigResult<Config> {
        let mut config = match file {
            Some(path) => self.read_file(path).await?,
            None => Config::default(),
        };

        cli.apply(&mut config);
        self.apply_env_overrides(&mut config)?;

        if self.validate {
            config.validate()?;
            info!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let config = self.read_file(path.as_ref()).await?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config = self.parse(content, format)?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    async fn read_file(&self, path: &Path) -> ConfigResult<Config> {
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.parse(&content, format)
    }

    fn parse(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        debug!("Configuration parsed from {}", format.name());
        Ok(config)
    }

    /// Apply `METRICSTORE_*` variables from the process environment
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_env_with(config, |name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names
    pub fn apply_env_with<F>(&self, config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}{}", ENV_PREFIX, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = var("ADDRESS") {
            config.server.address = value;
        }
        if let Some((name, value)) = var("STORE_INTERVAL") {
            config.storage.store_interval_secs =
                parse_number(&name, &value, "expected interval in whole seconds")?;
        }
        if let Some((_, value)) = var("FILE_STORAGE_PATH") {
            config.storage.file_path = value;
        }
        if let Some((_, value)) = var("DATABASE_DSN") {
            config.storage.database_dsn = non_empty(&value);
        }
        if let Some((name, value)) = var("RESTORE") {
            config.storage.restore = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = var("MAX_CONNECTIONS") {
            config.storage.max_connections =
                parse_number(&name, &value, "expected positive integer")?;
        }
        if let Some((name, value)) = var("RETRY_ATTEMPTS") {
            config.retry.attempts = parse_number(&name, &value, "expected positive integer")?;
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            config.observability.log_level = value;
        }
        if let Some((_, value)) = var("LOG_FORMAT") {
            config.observability.log_format = value;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str, reason: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_var_parsing_error(name, value, reason))
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
pub fn parse_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            name,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("config.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("config.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(ConfigFormat::from_path("config.xml").is_err());
        assert!(ConfigFormat::from_path("config").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "YES").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(parse_bool("X", "on").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(!parse_bool("X", "no").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(parse_bool("X", "invalid").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new();
        let toml = r#"
        [server]
        address = "0.0.0.0:9000"

        [storage]
        file_path = ""
        store_interval_secs = 0
        "#;
        let config = loader.load_from_string(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:9000");
        assert_eq!(config.storage.store_interval_secs, 0);
        assert!(config.storage.restore);
    }

    #[test]
    fn test_parse_yaml() {
        let loader = ConfigLoader::new();
        let yaml = "storage:\n  restore: false\nretry:\n  attempts: 5\n";
        let config = loader.load_from_string(yaml, ConfigFormat::Yaml).unwrap();
        assert!(!config.storage.restore);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.backoff_secs, vec![1, 3, 5]);
    }

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new();
        let json = r#"{"observability": {"log_level": "debug", "log_format": "json"}}"#;
        let config = loader.load_from_string(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_loader_validates() {
        let json = r#"{"retry": {"attempts": 0}}"#;
        assert!(ConfigLoader::new()
            .load_from_string(json, ConfigFormat::Json)
            .is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(json, ConfigFormat::Json)
            .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();

        loader
            .apply_env_with(
                &mut config,
                env(&[
                    ("METRICSTORE_ADDRESS", ":9999"),
                    ("METRICSTORE_STORE_INTERVAL", "0"),
                    ("METRICSTORE_RESTORE", "false"),
                    ("METRICSTORE_DATABASE_DSN", "postgres://db/metrics"),
                ]),
            )
            .unwrap();

        assert_eq!(config.server.address, ":9999");
        assert_eq!(config.storage.store_interval_secs, 0);
        assert!(!config.storage.restore);
        assert_eq!(
            config.storage.database_dsn.as_deref(),
            Some("postgres://db/metrics")
        );
    }

    #[test]
    fn test_empty_env_dsn_means_unset() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();
        config.storage.database_dsn = Some("postgres://from-flag".to_string());

        loader
            .apply_env_with(&mut config, env(&[("METRICSTORE_DATABASE_DSN", "")]))
            .unwrap();
        assert_eq!(config.storage.database_dsn, None);
    }

    #[test]
    fn test_bad_env_value_names_variable() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();

        let err = loader
            .apply_env_with(&mut config, env(&[("METRICSTORE_STORE_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarParsingError { ref variable_name, .. }
                if variable_name == "METRICSTORE_STORE_INTERVAL"
        ));
    }

    #[test]
    fn test_env_wins_over_cli() {
        let loader = ConfigLoader::new();
        let mut config = Config::default();
        let cli = CliOverrides {
            address: Some("127.0.0.1:1111".to_string()),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        cli.apply(&mut config);
        loader
            .apply_env_with(&mut config, env(&[("METRICSTORE_ADDRESS", "127.0.0.1:2222")]))
            .unwrap();

        assert_eq!(config.server.address, "127.0.0.1:2222");
        assert_eq!(config.observability.log_level, "debug");
    }
}
