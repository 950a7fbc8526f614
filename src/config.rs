use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub replication: ReplicationConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Grid width in columns
    pub cols: usize,
    /// Grid height in rows
    pub rows: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { cols: 7, rows: 6 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Shared-store poll cadence (ms)
    pub poll_interval_ms: u64,
    /// Key the session snapshot lives under in the shared store
    pub store_key: String,
    /// Capacity of the player-input channel feeding the coordinator
    pub input_buffer: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            store_key: "game".to_string(),
            input_buffer: 32,
        }
    }
}

/// Presentation palette and geometry. Immutable, handed to the rendering
/// layer at startup; the core never reads it and it is never replicated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Board slot edge length (px)
    pub slot_size: u32,
    pub player_one_color: String,
    pub player_two_color: String,
    pub win_line_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            slot_size: 117,
            player_one_color: "#E22100".to_string(),
            player_two_color: "#1B1819".to_string(),
            win_line_color: "#F5F3EF".to_string(),
        }
    }
}

impl AppConfig {
    /// Layered load: optional config file, then `DROPFOUR_*` environment
    /// overrides (e.g. `DROPFOUR_REPLICATION__POLL_INTERVAL_MS=50`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("dropfour").required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix("DROPFOUR").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
