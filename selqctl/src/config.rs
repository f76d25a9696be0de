//! `~/.selqrc` loading and merging with command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

use crate::error::CliError;

/// How parse results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human summary with the first error as a source diagnostic.
    #[default]
    Pretty,
    /// `ParseOutput` as JSON.
    Json,
    /// `ParseOutput` via `{:#?}`.
    Debug,
}

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub format: OutputFormat,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub show_tokens: bool,
    pub show_cst: bool,
}

impl Config {
    pub fn from_yaml(path: &Path, content: &str) -> Result<Self, CliError> {
        // An empty file deserialises to `null`, which serde_yaml rejects for a struct.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &content)
    }

    /// Load `explicit` if given (it must exist), else `$HOME/.selqrc` when present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.home_dir().join(".selqrc"))
}

pub fn default_history_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "selq").map(|dirs| dirs.data_dir().join("history.txt"))
}

/// Effective output settings after applying flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub format: OutputFormat,
    pub show_tokens: bool,
    pub show_cst: bool,
    pub history: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(
        config: &Config,
        format: Option<OutputFormat>,
        show_tokens: bool,
        show_cst: bool,
    ) -> Self {
        Self {
            format: format.unwrap_or(config.format),
            show_tokens: show_tokens || config.show_tokens,
            show_cst: show_cst || config.show_cst,
            history: config.history.clone().or_else(default_history_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Config, CliError> {
        Config::from_yaml(Path::new("test.yaml"), yaml)
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse("").unwrap(), Config::default());
        assert_eq!(parse("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn reads_every_key() {
        let config = parse(
            "format: json\nlog_level: debug\nlog_dir: /tmp/selq\nhistory: /tmp/h.txt\nshow_tokens: true\nshow_cst: true\n",
        )
        .unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/selq")));
        assert_eq!(config.history, Some(PathBuf::from("/tmp/h.txt")));
        assert!(config.show_tokens);
        assert!(config.show_cst);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let err = parse("colour: red\n").unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
        assert!(err.to_string().starts_with("invalid config test.yaml"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::discover(Some(Path::new("/nonexistent/selqrc"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigRead { .. }));
    }

    #[test]
    fn flags_override_config() {
        let config = Config {
            format: OutputFormat::Json,
            show_cst: true,
            history: Some(PathBuf::from("h")),
            ..Config::default()
        };
        let settings = Settings::resolve(&config, Some(OutputFormat::Debug), true, false);
        assert_eq!(settings.format, OutputFormat::Debug);
        assert!(settings.show_tokens);
        assert!(settings.show_cst);
        assert_eq!(settings.history, Some(PathBuf::from("h")));

        let settings = Settings::resolve(&config, None, false, false);
        assert_eq!(settings.format, OutputFormat::Json);
    }
}
