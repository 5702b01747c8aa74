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

//! Logging initialization and setup.

use crate::config::{LogConfig, LogError, LogFormat, LogOutput};
use std::io;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initialize tracing with the given format and optional level.
///
/// # Errors
///
/// Returns [`LogError::InvalidFilter`] for an unparseable level and
/// [`LogError::AlreadyInitialized`] if a global subscriber already exists.
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let mut config = LogConfig::new().with_format(format);
    if let Some(level) = level {
        config = config.with_level(level);
    }
    init_tracing_with_config(config)
}

/// Initialize tracing with a detailed configuration.
///
/// # Errors
///
/// Same as [`init_tracing`].
pub fn init_tracing_with_config(config: LogConfig) -> Result<(), LogError> {
    let env_filter = build_env_filter(&config)?;

    Registry::default()
        .with(build_layer(&config))
        .with(env_filter)
        .try_init()
        .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
}

fn build_layer(config: &LogConfig) -> BoxedLayer {
    let span_events = if config.span_close_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(make_writer(config.output))
        .with_target(config.include_targets)
        .with_span_events(span_events);

    match config.format {
        LogFormat::Pretty => layer.pretty().with_ansi(config.use_color).boxed(),
        LogFormat::Compact => layer.compact().with_ansi(config.use_color).boxed(),
        LogFormat::Json => layer.json().with_ansi(false).boxed(),
    }
}

fn make_writer(output: LogOutput) -> BoxMakeWriter {
    match output {
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
    }
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let filter = config.effective_level();

    EnvFilter::try_new(&filter).map_err(|e| LogError::InvalidFilter {
        filter,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Global subscriber installation is covered in tests/init_tests.rs,
    // which runs in its own process.

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("debug")).is_ok());
        assert!(build_env_filter(&LogConfig::new().with_level("trace")).is_ok());
    }

    #[test]
    fn test_directive_filter() {
        let config = LogConfig::new().with_level("warn,metricstore_storage=debug,tower_http=info");
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let config = LogConfig::new().with_level("metricstore=[");
        assert!(matches!(
            build_env_filter(&config),
            Err(LogError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let _layer = build_layer(&LogConfig::new().with_format(format));
        }
    }
}
