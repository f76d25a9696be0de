use std::io;
use std::path::PathBuf;

use rustyline::error::ReadlineError;
use thiserror::Error;

/// Failures the CLI reports before or outside of parsing.
#[derive(Debug, Error)]
pub enum CliError {
    /// The config file exists but could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::Config`].
    #[error("invalid config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The line editor could not be started or failed mid-session.
    #[error("line editor: {0}")]
    Editor(#[from] ReadlineError),
}
