//! Tracing subscriber setup shared by SelQ binaries.
#![deny(missing_docs)]

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Initial level, used when `RUST_LOG` is unset.
    pub level: Level,
    /// Directory for daily-rotated JSON logs; stderr only when `None`.
    pub dir: Option<PathBuf>,
    /// File name prefix inside `dir`.
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            dir: None,
            file_prefix: "selq.log".to_string(),
        }
    }
}

/// Keeps the subscriber's file writer alive and allows level changes at runtime.
pub struct LogGuard {
    handle: reload::Handle<EnvFilter, Registry>,
    _file: Option<WorkerGuard>,
}

impl LogGuard {
    /// Replace the active filter with one at `level`.
    pub fn set_level(&self, level: Level) -> Result<()> {
        self.handle
            .reload(level_filter(level))
            .context("failed to reload log filter")
    }
}

/// Parse a level name such as `debug` or `warn`.
pub fn parse_level(name: &str) -> Result<Level> {
    Level::from_str(name.trim()).map_err(|_| anyhow!("unknown log level `{name}`"))
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

/// Install the global subscriber: compact text on stderr, plus JSON lines in
/// a rolling file when `config.dir` is set. `RUST_LOG` overrides the level.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(config.level));
    let (filter, handle) = reload::Layer::new(filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, file_guard) = match &config.dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .json()
                .with_current_span(false)
                .with_span_list(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(LogGuard {
        handle,
        _file: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" warn ").unwrap(), Level::WARN);
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn default_logs_warnings_to_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(config.dir.is_none());
    }
}
