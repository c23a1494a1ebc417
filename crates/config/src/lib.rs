//! Configuration loading, validation, and management for StepStream.
//!
//! Loads configuration from `~/.stepstream/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stepstream_core::model::ToolChoice;

/// The root configuration structure.
///
/// Maps directly to `~/.stepstream/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// System prompt handed to the model on every call
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum reasoning/tool-call steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Tool-choice policy ("auto" or "none")
    #[serde(default)]
    pub tool_choice: ToolChoice,

    /// Reasoning models never see tools; forces `tool_choice = "none"`
    #[serde(default)]
    pub reasoning_model: bool,

    /// Capacity of each run's delta channel
    #[serde(default = "default_delta_buffer")]
    pub delta_buffer: usize,

    /// Cache key invalidated when a chat title changes
    #[serde(default = "default_chat_history_key")]
    pub chat_history_key: String,

    /// Per-tool gate policies, keyed by tool name
    #[serde(default)]
    pub tools: HashMap<String, ToolPolicyConfig>,
}

fn default_system_prompt() -> String {
    "You are a friendly assistant. Keep your responses concise and helpful.".into()
}
fn default_max_steps() -> usize {
    5
}
fn default_delta_buffer() -> usize {
    128
}
fn default_chat_history_key() -> String {
    "chat-history".into()
}

/// How the gate around one tool behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicyConfig {
    /// Suspend the run for a human decision before each invocation
    #[serde(default)]
    pub requires_approval: bool,

    /// Per-invocation deadline in seconds (unset = no deadline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ToolPolicyConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepstream/config.toml).
    ///
    /// Environment variables override the file:
    /// - `STEPSTREAM_MAX_STEPS`
    /// - `STEPSTREAM_TOOL_CHOICE` (`auto` | `none`)
    /// - `STEPSTREAM_SYSTEM_PROMPT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("STEPSTREAM_MAX_STEPS") {
            self.max_steps = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "STEPSTREAM_MAX_STEPS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("STEPSTREAM_TOOL_CHOICE") {
            self.tool_choice = match raw.trim() {
                "auto" => ToolChoice::Auto,
                "none" => ToolChoice::None,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "STEPSTREAM_TOOL_CHOICE must be 'auto' or 'none', got '{other}'"
                    )));
                }
            };
        }

        if let Some(prompt) = lookup("STEPSTREAM_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepstream")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "max_steps must be at least 1".into(),
            ));
        }

        if self.delta_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "delta_buffer must be at least 1".into(),
            ));
        }

        if let Some((name, _)) = self
            .tools
            .iter()
            .find(|(_, policy)| policy.timeout_secs == Some(0))
        {
            return Err(ConfigError::ValidationError(format!(
                "tools.{name}.timeout_secs must be greater than 0"
            )));
        }

        Ok(())
    }

    /// The tool-choice policy runs actually use.
    pub fn effective_tool_choice(&self) -> ToolChoice {
        if self.reasoning_model {
            ToolChoice::None
        } else {
            self.tool_choice
        }
    }

    /// Gate policy for a tool (defaults when unconfigured).
    pub fn tool_policy(&self, name: &str) -> ToolPolicyConfig {
        self.tools.get(name).cloned().unwrap_or_default()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_steps: default_max_steps(),
            tool_choice: ToolChoice::Auto,
            reasoning_model: false,
            delta_buffer: default_delta_buffer(),
            chat_history_key: default_chat_history_key(),
            tools: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
