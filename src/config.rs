//! Coordinator Configuration
//!
//! TOML-loadable settings for the coordinator, its default pool and history retention.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Worker threads for the default fixed pool
    pub pool_size: usize,
    /// Finished tasks kept for lookup (None = unbounded)
    pub finished_capacity: Option<usize>,
    /// Buffer size of the coordinator event broadcast
    pub event_capacity: usize,
    /// Name of the coordinator thread
    pub thread_name: String,
    /// Start processing commands as soon as the coordinator is built
    pub autostart: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            finished_capacity: Some(100),
            event_capacity: 256,
            thread_name: "task-coordinator".to_string(),
            autostart: false,
        }
    }
}

impl CoordinatorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("pool_size must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid("thread_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Set pool size
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set finished retention (None = unbounded)
    pub fn with_finished_capacity(mut self, capacity: Option<usize>) -> Self {
        self.finished_capacity = capacity;
        self
    }

    /// Start immediately on build
    pub fn autostart(mut self) -> Self {
        self.autostart = true;
        self
    }
}
