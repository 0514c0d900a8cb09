use crate::error::{EraseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Engine tuning passed into every batch. Nothing here is read from globals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Overwrite chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Minimum interval between two throttled progress events (milliseconds).
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// How long a holder gets to exit after a graceful request (milliseconds).
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,

    /// Allow terminating processes that hold a file open.
    #[serde(default = "default_true")]
    pub terminate_holders: bool,

    /// fsync after every pass.
    #[serde(default = "default_true")]
    pub sync_each_pass: bool,

    /// Allow the platform removal command as the last directory strategy.
    #[serde(default = "default_true")]
    pub fallback_command: bool,

    /// Message language: "en-GB" or "zh-CN".
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_progress_interval_ms() -> u64 {
    500
}

fn default_terminate_timeout_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en-GB".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            progress_interval_ms: default_progress_interval_ms(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
            terminate_holders: true,
            sync_each_pass: true,
            fallback_command: true,
            language: default_language(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EraseError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let cfg: EngineConfig = serde_json::from_str(&raw)
            .map_err(|e| EraseError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(EraseError::Config("chunk_size must be greater than zero".into()));
        }
        if self.language.trim().is_empty() {
            return Err(EraseError::Config("language cannot be empty".into()));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}
