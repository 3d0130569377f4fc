//! Shared config utilities for loading/saving JSON config files
//! and resolving API keys from fields or environment variables,
//! plus the engine's own tunables.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to parse config {}: {} — using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            info!(
                "[{}] No config file at {} — using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

/// Resolve an API key: check the direct `api_key` field first,
/// then fall back to reading the environment variable named in `api_key_env`.
pub fn resolve_api_key(api_key: &Option<String>, api_key_env: &Option<String>) -> Option<String> {
    if let Some(ref key) = api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    if let Some(ref env_var) = api_key_env {
        if let Ok(key) = std::env::var(env_var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    None
}

// ── Engine Tunables ────────────────────────────────────────

/// Tunables for the conversational pipeline and mood aggregation.
/// Persisted to `engine_config.json`; every field has a serde default so
/// partial config files keep working across versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum prior turns fetched per session for context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Newest turns replayed to the model as user/assistant pairs.
    #[serde(default = "default_history_pairs")]
    pub history_pairs: usize,
    /// Mood entries considered by the summary aggregation.
    #[serde(default = "default_mood_window")]
    pub mood_window: usize,
    /// Entries feeding the recency-weighted trend.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// Concurrent background turn-processing jobs.
    #[serde(default = "default_max_concurrent_turns")]
    pub max_concurrent_turns: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_context_window() -> usize {
    10
}

fn default_history_pairs() -> usize {
    5
}

fn default_mood_window() -> usize {
    30
}

fn default_trend_window() -> usize {
    7
}

fn default_max_concurrent_turns() -> usize {
    4
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            history_pairs: default_history_pairs(),
            mood_window: default_mood_window(),
            trend_window: default_trend_window(),
            max_concurrent_turns: default_max_concurrent_turns(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

pub fn load_engine_config(path: &Path) -> EngineConfig {
    load_json_config(path, "Engine")
}

pub fn save_engine_config(path: &Path, config: &EngineConfig) -> Result<(), String> {
    save_json_config(path, config, "Engine")
}
