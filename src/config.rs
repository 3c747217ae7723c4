//! Session configuration.
//!
//! Everything here tunes the workers' waiting behavior; the capture
//! semantics themselves (buffer sizes, modality order, overflow policy)
//! are fixed contracts and deliberately not configurable.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::SensorError;

/// What a worker does when its bounded wait elapses with no frame and no
/// terminate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// Exit the worker loop. The deployed fail-safe against a wedged
    /// sensor feed: the session survives with stale buffers and a
    /// non-advancing tick.
    Terminate,
    /// Treat the timeout as an idle iteration and keep waiting.
    Retry,
}

/// Tunables for a capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bounded wait per worker iteration, in milliseconds.
    pub worker_timeout_ms: u64,
    /// Timeout handling for both workers.
    pub stall_policy: StallPolicy,
    /// Poll interval for `wait_for_tick`, in milliseconds.
    pub tick_poll_ms: u64,
    /// How long `close` waits for each worker to exit, in milliseconds.
    pub join_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            worker_timeout_ms: 5000,
            stall_policy: StallPolicy::Terminate,
            tick_poll_ms: 100,
            join_timeout_ms: 2000,
        }
    }
}

impl SessionConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    pub fn tick_poll(&self) -> Duration {
        Duration::from_millis(self.tick_poll_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| SensorError::Config(format!("failed to read {:?}: {}", path, e)))?;
        let config: SessionConfig = toml::from_str(&contents)
            .map_err(|e| SensorError::Config(format!("failed to parse {:?}: {}", path, e)))?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SensorError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SensorError::Config(format!("failed to create config dir: {}", e)))?;
        }
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| SensorError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)
            .map_err(|e| SensorError::Config(format!("failed to write {:?}: {}", path, e)))?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("depthcam.toml")
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.worker_timeout_ms == 0 {
            return Err("worker timeout must be non-zero".to_string());
        }
        if self.tick_poll_ms == 0 {
            return Err("tick poll interval must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployed_behavior() {
        let config = SessionConfig::default();
        assert_eq!(config.worker_timeout_ms, 5000);
        assert_eq!(config.stall_policy, StallPolicy::Terminate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SessionConfig::default();
        config.stall_policy = StallPolicy::Retry;
        config.worker_timeout_ms = 250;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depthcam.toml");
        config.save_to_file(&path).unwrap();

        let loaded = SessionConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.stall_policy, StallPolicy::Retry);
        assert_eq!(loaded.worker_timeout_ms, 250);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let loaded = SessionConfig::load_from_file("/nonexistent/depthcam.toml").unwrap();
        assert_eq!(loaded.worker_timeout_ms, 5000);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = SessionConfig::default();
        config.worker_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
