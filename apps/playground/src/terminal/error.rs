use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::assistant::AssistantError;
use crate::config::ConfigError;
use crate::telemetry::logging::InitError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("unable to read {path:?}: {source}")]
    ReadSource { path: PathBuf, source: io::Error },
    #[error("assistant request failed: {0}")]
    Assistant(#[from] AssistantError),
    #[error("logging initialization failed: {0}")]
    Logging(#[from] InitError),
}
