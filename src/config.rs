//! Configuration management.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (`STUDY_HALL_*`)
//! 2. Configuration file (JSON)
//! 3. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChannelId, GuildContext, GuildId, UserId};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session engine settings.
    pub session: SessionSection,
    /// Per-guild defaults.
    pub guild: GuildSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

/// Session engine configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Idle timeout before a session expires, in seconds.
    pub idle_timeout_secs: u64,
}

impl SessionSection {
    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
        }
    }
}

/// Guild defaults configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSection {
    /// Prefix guild commands must start with.
    pub command_prefix: String,
    /// Category channel course channels are created under.
    pub course_category: Option<String>,
    /// User allowed to open admin sessions.
    pub admin_user: Option<String>,
}

impl Default for GuildSection {
    fn default() -> Self {
        Self {
            command_prefix: "!".to_string(),
            course_category: None,
            admin_user: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(secs) = std::env::var("STUDY_HALL_IDLE_TIMEOUT") {
            if let Ok(secs) = secs.parse() {
                self.session.idle_timeout_secs = secs;
            }
        }

        if let Ok(prefix) = std::env::var("STUDY_HALL_COMMAND_PREFIX") {
            if !prefix.is_empty() {
                self.guild.command_prefix = prefix;
            }
        }

        if let Ok(admin) = std::env::var("STUDY_HALL_ADMIN_USER") {
            if !admin.is_empty() {
                self.guild.admin_user = Some(admin);
            }
        }

        if let Ok(level) = std::env::var("STUDY_HALL_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Load configuration with the full priority chain.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Build a guild context for `guild` from the configured defaults.
    pub fn guild_context(&self, guild: GuildId) -> GuildContext {
        GuildContext {
            id: guild,
            command_prefix: self.guild.command_prefix.clone(),
            course_category: self
                .guild
                .course_category
                .clone()
                .map(ChannelId::from),
            admin_user: self.guild.admin_user.clone().map(UserId::from),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(std::io::Error),
    /// Configuration file is not valid JSON.
    #[error("failed to parse config file: {0}")]
    Json(serde_json::Error),
}
