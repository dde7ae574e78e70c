use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ConfigError;
use crate::domain::ProcessorError;

/// Threads value meaning "not set"
pub const DEFAULT_THREADS: i64 = -1;

/// Configuration for a parallel processing pipeline
///
/// Processors are applied to every batch in the order they are listed.
/// `threads` of 2 or more spawns that many lanes, each with its own copy of
/// the processor chain; any lower value (including the default of -1) wires
/// a single chain straight between input and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub threads: i64,
    pub processors: Vec<ProcessorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            processors: Vec::new(),
        }
    }
}

impl Config {
    /// Create a config with the given thread count and processors
    pub fn new(threads: i64, processors: Vec<ProcessorConfig>) -> Self {
        Self {
            threads,
            processors,
        }
    }

    /// Number of lanes this config asks for (always at least 1)
    pub fn lanes(&self) -> usize {
        if self.threads >= 2 {
            self.threads as usize
        } else {
            1
        }
    }

    /// Check if this config selects the pooled runner over direct wiring
    pub fn is_pooled(&self) -> bool {
        self.lanes() > 1
    }

    /// Parse a config from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file
    ///
    /// # Example
    /// ```rust,ignore
    /// let config = Config::from_file("pipeline.json").await?;
    /// ```
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&raw)
    }
}

/// Configuration of a single processor
///
/// Everything besides `type` is kept as a free-form option map and
/// interpreted by the constructor registered for that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ProcessorConfig {
    /// Create a processor config without options
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: Map::new(),
        }
    }

    /// Add an option (fluent interface)
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Read an optional string option
    pub fn str_option(&self, key: &str) -> Result<Option<&str>, ProcessorError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ProcessorError::invalid_config(
                key,
                format!("expected a string, got {other}"),
            )),
        }
    }

    /// Read a required string option
    pub fn required_str(&self, key: &str) -> Result<&str, ProcessorError> {
        self.str_option(key)?
            .ok_or_else(|| ProcessorError::invalid_config(key, "missing required option"))
    }

    /// Read an optional non-negative integer option
    pub fn u64_option(&self, key: &str) -> Result<Option<u64>, ProcessorError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                ProcessorError::invalid_config(
                    key,
                    format!("expected a non-negative integer, got {value}"),
                )
            }),
        }
    }
}
