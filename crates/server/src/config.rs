//! Configuration management for the file browser.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/filebrowser/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::{DEFAULT_CATALOG_DIR, DEFAULT_MAX_UPLOAD_SIZE};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("host must not be empty")]
    EmptyHost,

    #[error("max_upload_size must be greater than 0, got {0}")]
    InvalidMaxUploadSize(u64),

    #[error("catalog subdir must not be empty")]
    EmptyCatalogDir,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default text of the notice banner.
pub const DEFAULT_NOTICE_TEXT: &str = "Notice: We can put notices up here.";

/// Main configuration structure for the file browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener and logging configuration.
    pub server: ServerConfig,

    /// Served root and mutation switches.
    pub files: FilesConfig,

    /// Presentation settings.
    pub ui: UiConfig,

    /// Software catalog settings.
    pub catalog: CatalogConfig,

    /// Extra file classification mappings.
    pub classifier: ClassifierConfig,
}

/// Listener and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily-rotated log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

/// Served root and mutation switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory to serve.
    pub root: PathBuf,

    /// Allow file uploads.
    pub enable_upload: bool,

    /// Allow folder creation.
    pub enable_new_folder: bool,

    /// Maximum upload size in bytes (default: 1GB).
    pub max_upload_size: u64,
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Text of the notice banner.
    pub notice_text: String,
}

/// Software catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog directory, relative to the served root.
    pub subdir: String,
}

/// Extra file classification mappings, merged over the built-in tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Exact file name (case-insensitive) to category.
    pub names: BTreeMap<String, String>,

    /// Extension without the dot (case-insensitive) to category.
    pub extensions: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            enable_upload: false,
            enable_new_folder: false,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notice_text: DEFAULT_NOTICE_TEXT.to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            subdir: DEFAULT_CATALOG_DIR.to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filebrowser")
        .join("config.toml")
}

/// Returns the default served root: the working directory.
fn default_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILEBROWSER_ROOT: Override the served root
    /// - FILEBROWSER_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FILEBROWSER_NOTICE_TEXT: Override the notice banner
    ///
    /// Returns the names of the variables that were applied. This runs before
    /// logging is set up, so reporting them is left to the caller.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Ok(root) = std::env::var("FILEBROWSER_ROOT") {
            if !root.is_empty() {
                self.files.root = PathBuf::from(root);
                applied.push("FILEBROWSER_ROOT");
            }
        }

        if let Ok(level) = std::env::var("FILEBROWSER_LOG_LEVEL") {
            if !level.is_empty() {
                self.server.log_level = level;
                applied.push("FILEBROWSER_LOG_LEVEL");
            }
        }

        if let Ok(text) = std::env::var("FILEBROWSER_NOTICE_TEXT") {
            self.ui.notice_text = text;
            applied.push("FILEBROWSER_NOTICE_TEXT");
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// The root itself is checked when the file manager is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.files.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize(self.files.max_upload_size));
        }

        if self.catalog.subdir.trim().is_empty() {
            return Err(ConfigError::EmptyCatalogDir);
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();
    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }
    msg
}
