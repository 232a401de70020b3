//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (`--config` or TABLEFSM_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tablefsm_document::{ParseMode, ParserConfig};
use thiserror::Error;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document parser settings.
    pub parser: ParserConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Engine settings for `run` and `repl`.
    pub engine: EngineConfig,
}

impl Config {
    /// Loads configuration from `path` (or TABLEFSM_CONFIG), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("TABLEFSM_CONFIG") {
                Ok(path) => Self::from_file(path)?,
                Err(_) => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup. Unparseable values are
    /// ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = var("TABLEFSM_PARSE_MODE") {
            if let Ok(mode) = mode.parse::<ParseMode>() {
                self.parser.mode = mode;
            }
        }

        if let Some(format) = var("TABLEFSM_FORMAT") {
            if let Some(format) = OutputFormat::from_name(&format) {
                self.output.format = format;
            }
        }

        if let Some(offset) = var("TABLEFSM_MESSAGE_OFFSET") {
            if let Ok(offset) = offset.parse() {
                self.engine.message_offset = offset;
            }
        }

        if let Some(kind) = var("TABLEFSM_ENGINE") {
            self.engine.kind = match kind.to_lowercase().as_str() {
                "named" => EngineKind::Named,
                "indexed" => EngineKind::Indexed,
                _ => self.engine.kind,
            };
        }
    }
}

/// Serialization format of a document file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    /// Detects the format from a file extension; anything other than
    /// `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
            .unwrap_or(OutputFormat::Json)
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Format used when writing to stdout.
    pub format: OutputFormat,
    /// Whether states without transitions still get a block.
    pub include_empty_blocks: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            include_empty_blocks: true,
        }
    }
}

/// Which engine drives `run` and `repl`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Indexed,
    Named,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// First message id of the indexed engine.
    pub message_offset: usize,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {1}", path = .0.display())]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{path}': {1}", path = .0.display())]
    ParseError(PathBuf, String),
}
