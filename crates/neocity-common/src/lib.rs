//! Common configuration types shared across Neocity crates

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// How `System` dialogue nodes are dismissed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMessageAdvance {
    /// Wait for an explicit advance signal (click / Space / Enter)
    #[default]
    Manual,
    /// Dismiss automatically after `system_message_delay_ms`
    Auto,
}

impl SystemMessageAdvance {
    /// Get the display name for this mode
    pub fn display_name(&self) -> &str {
        match self {
            SystemMessageAdvance::Manual => "manual",
            SystemMessageAdvance::Auto => "auto",
        }
    }

    /// Parse a mode from its config spelling (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(SystemMessageAdvance::Manual),
            "auto" => Some(SystemMessageAdvance::Auto),
            _ => None,
        }
    }
}

/// Default delay before an auto-advancing system message is dismissed
pub const DEFAULT_SYSTEM_MESSAGE_DELAY_MS: u32 = 2000;

/// Configuration for the story engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scene to enter from the archive hotspot (falls back to the story's own start)
    pub start_scene: Option<String>,
    /// External scene graph (JSON); the embedded chapter is used when unset
    pub story_path: Option<PathBuf>,
    pub system_message_advance: SystemMessageAdvance,
    pub system_message_delay_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_scene: None,
            story_path: None,
            system_message_advance: SystemMessageAdvance::Manual,
            system_message_delay_ms: DEFAULT_SYSTEM_MESSAGE_DELAY_MS,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load a config file, or fall back to defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }
}
