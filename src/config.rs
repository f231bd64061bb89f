//! Bridge configuration
//!
//! Every field has a default, so a JSON file only needs the keys it changes.
//! `CHESS_ENGINE_PATH` overrides the engine path wherever the config came from.

use crate::engine::options::EngineSettings;
use crate::error::ConfigError;
use crate::game_tree::DEFAULT_MAX_NODES;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENGINE_PATH_ENV: &str = "CHESS_ENGINE_PATH";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub engine_path: String,
    pub engine_args: Vec<String>,
    /// `uci` -> `uciok`
    pub handshake_timeout_ms: u64,
    /// `isready` -> `readyok`
    pub ready_timeout_ms: u64,
    /// Added to the movetime of a time-limited search
    pub movetime_grace_ms: u64,
    /// Ceiling for a depth-limited search
    pub depth_timeout_ms: u64,
    /// How long to wait for `bestmove` after `stop`
    pub stop_grace_ms: u64,
    pub shutdown_grace_ms: u64,
    pub tick_ms: u64,
    pub auto_restart: bool,
    pub threads: usize,
    pub hash_mb: usize,
    pub cache_capacity: usize,
    pub max_tree_nodes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            engine_path: "stockfish".to_string(),
            engine_args: Vec::new(),
            handshake_timeout_ms: 5_000,
            ready_timeout_ms: 5_000,
            movetime_grace_ms: 2_000,
            depth_timeout_ms: 30_000,
            stop_grace_ms: 500,
            shutdown_grace_ms: 500,
            tick_ms: 10,
            auto_restart: true,
            threads: num_cpus::get(),
            hash_mb: 64,
            cache_capacity: 1024,
            max_tree_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl BridgeConfig {
    pub fn for_engine(path: impl Into<String>) -> Self {
        BridgeConfig {
            engine_path: path.into(),
            ..BridgeConfig::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Apply `CHESS_ENGINE_PATH` if it is set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(ENGINE_PATH_ENV) {
            if !path.trim().is_empty() {
                self.engine_path = path;
            }
        }
        self
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            threads: self.threads.max(1),
            hash_mb: self.hash_mb.max(1),
            multipv: 1,
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn movetime_grace(&self) -> Duration {
        Duration::from_millis(self.movetime_grace_ms)
    }

    pub fn depth_timeout(&self) -> Duration {
        Duration::from_millis(self.depth_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}
