//! Persistent revolution counter.
//!
//! The counter survives restarts in a small JSON state file and never
//! drops below zero.

use crate::storage::config::get_data_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// On-disk counter state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    /// Total crank revolutions
    pub counter: u64,
    /// Last modification timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Counter shared between the metrics session and the streaming relay.
pub type SharedCounter = Arc<Mutex<RevolutionCounter>>;

/// Monotonic, floor-clamped revolution counter backed by a JSON file.
#[derive(Debug)]
pub struct RevolutionCounter {
    path: PathBuf,
    state: CounterState,
}

impl RevolutionCounter {
    /// Load the counter from `path`.
    ///
    /// A missing file starts fresh; an unreadable or corrupt file is logged
    /// and replaced by defaults on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let state = if !path.exists() {
            tracing::info!("No state file found at {}, starting fresh", path.display());
            CounterState::default()
        } else {
            match Self::read_state(&path) {
                Ok(state) => {
                    tracing::info!("Loaded counter state: {}", state.counter);
                    state
                }
                Err(e) => {
                    tracing::error!("Failed to load state file, using defaults: {}", e);
                    CounterState::default()
                }
            }
        };

        Self { path, state }
    }

    fn read_state(path: &Path) -> Result<CounterState, CounterError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CounterError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| CounterError::ParseError(e.to_string()))
    }

    /// Wrap in the shared handle used by sinks and the relay.
    pub fn shared(self) -> SharedCounter {
        Arc::new(Mutex::new(self))
    }

    /// State file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current counter value.
    pub fn get(&self) -> u64 {
        self.state.counter
    }

    /// Add `amount` (may be negative), clamping at zero, and persist.
    pub fn increment(&mut self, amount: i64) -> Result<u64, CounterError> {
        let current = i64::try_from(self.state.counter).unwrap_or(i64::MAX);
        self.set(current.saturating_add(amount))
    }

    /// Replace the counter, clamping at zero, and persist.
    pub fn set(&mut self, value: i64) -> Result<u64, CounterError> {
        self.state.counter = value.max(0).unsigned_abs();
        self.state.updated_at = Some(Utc::now());
        self.save()?;
        Ok(self.state.counter)
    }

    /// Write the state file.
    pub fn save(&self) -> Result<(), CounterError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CounterError::IoError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.state)
            .map_err(|e| CounterError::SerializeError(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| CounterError::IoError(e.to_string()))
    }
}

/// Get the default counter state file path.
pub fn get_state_path() -> PathBuf {
    get_data_dir().join("state.json")
}

/// Counter persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
