//! Configuration management for LadderMoon
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (LADDERMOON_*)
//! 3. Config file (~/.config/laddermoon/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{LockOptions, DEFAULT_BRANCH};
use crate::{Error, Result};

/// Agent-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Path to the claude executable
    pub claude_path: String,

    /// Model to use for Claude
    pub model: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None, // Let claude use its default
        }
    }
}

/// Shadow branch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the shadow branch
    pub branch: String,

    /// Path to the git executable
    pub git_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_string(),
            git_path: "git".to_string(),
        }
    }
}

/// Mutation lock timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long to wait for another command to finish
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Delay between lock attempts
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Break a lock held longer than this, even by a live process
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stale_after: Option<Duration>,
}

impl Default for LockConfig {
    fn default() -> Self {
        let defaults = LockOptions::default();
        Self {
            timeout: defaults.timeout,
            poll_interval: defaults.poll_interval,
            stale_after: defaults.stale_after,
        }
    }
}

impl LockConfig {
    /// Lock options for the store
    pub fn options(&self) -> LockOptions {
        LockOptions {
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            stale_after: self.stale_after,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Agent configuration
    pub agent: AgentConfig,

    /// Shadow branch configuration
    pub store: StoreConfig,

    /// Lock configuration
    pub lock: LockConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/laddermoon/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("laddermoon").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - LADDERMOON_CLAUDE_PATH: Path to claude executable
    /// - LADDERMOON_MODEL: Model to use
    /// - LADDERMOON_GIT_PATH: Path to git executable
    /// - LADDERMOON_LOCK_TIMEOUT: Lock timeout, e.g. `45s`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(claude_path) = var("LADDERMOON_CLAUDE_PATH") {
            self.agent.claude_path = claude_path;
        }

        if let Some(model) = var("LADDERMOON_MODEL") {
            self.agent.model = Some(model);
        }

        if let Some(git_path) = var("LADDERMOON_GIT_PATH") {
            self.store.git_path = git_path;
        }

        if let Some(timeout) = var("LADDERMOON_LOCK_TIMEOUT") {
            self.lock.timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .map_err(|e| {
                    Error::Config(format!("LADDERMOON_LOCK_TIMEOUT '{}': {}", timeout, e))
                })?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        claude_path: Option<String>,
        model: Option<String>,
    ) -> Self {
        if let Some(path) = claude_path {
            self.agent.claude_path = path;
        }

        if let Some(m) = model {
            self.agent.model = Some(m);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(claude_path: Option<String>, model: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()?
            .with_cli_overrides(claude_path, model))
    }
}
