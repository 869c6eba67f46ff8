//! Configuration loading, validation, and management for slotboard.
//!
//! Loads configuration from `~/.slotboard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use slotboard_core::scope::{DAILY_CAPACITY, EVENT_CAPACITY, MAX_CAPACITY};
use slotboard_core::{OverflowPolicy, ScopeConfig};

/// The root configuration structure.
///
/// Maps directly to `~/.slotboard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Key-value store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-board capacity and overflow settings
    #[serde(default)]
    pub boards: BoardsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory", "file" or "sqlite"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database or JSON file path (unused by "memory")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Logical store name; rows of several stores may share one database
    #[serde(default = "default_store_name")]
    pub store_name: String,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_store_name() -> String {
    "statestore".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
            store_name: default_store_name(),
        }
    }
}

impl StoreConfig {
    /// The configured path, or the backend's default under the config dir.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None if self.backend == "file" => AppConfig::config_dir().join("state.json"),
            None => AppConfig::config_dir().join("state.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS (the admin UI)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    42700
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:8080".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Settings for one kind of board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Slot count; unset keeps the board kind's built-in capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    #[serde(default)]
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardsConfig {
    #[serde(default = "default_event_board")]
    pub event: BoardConfig,

    #[serde(default = "default_daily_board")]
    pub daily: BoardConfig,

    /// Applies to every per-topic board
    #[serde(default = "default_daily_board")]
    pub topic: BoardConfig,
}

fn default_event_board() -> BoardConfig {
    BoardConfig {
        capacity: Some(EVENT_CAPACITY),
        overflow: OverflowPolicy::EvictTail,
    }
}
fn default_daily_board() -> BoardConfig {
    BoardConfig {
        capacity: Some(DAILY_CAPACITY),
        overflow: OverflowPolicy::EvictTail,
    }
}

impl Default for BoardsConfig {
    fn default() -> Self {
        Self {
            event: default_event_board(),
            daily: default_daily_board(),
            topic: default_daily_board(),
        }
    }
}

impl BoardConfig {
    /// Apply these settings to a built-in scope definition.
    pub fn apply(&self, scope: ScopeConfig) -> ScopeConfig {
        let capacity = self.capacity.unwrap_or(scope.capacity);
        scope.with_capacity(capacity).with_overflow(self.overflow)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.slotboard/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SLOTBOARD_STORE_BACKEND`
    /// - `SLOTBOARD_STORE_PATH`
    /// - `SLOTBOARD_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
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

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(backend) = std::env::var("SLOTBOARD_STORE_BACKEND") {
            self.store.backend = backend;
        }

        if let Ok(path) = std::env::var("SLOTBOARD_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Ok(port) = std::env::var("SLOTBOARD_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("SLOTBOARD_PORT is not a port: {port}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".slotboard")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.store.backend.as_str(), "memory" | "file" | "sqlite") {
            return Err(ConfigError::ValidationError(format!(
                "store.backend must be memory, file or sqlite, got '{}'",
                self.store.backend
            )));
        }

        if self.store.store_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.store_name must not be empty".into(),
            ));
        }

        for (name, board) in [
            ("event", &self.boards.event),
            ("daily", &self.boards.daily),
            ("topic", &self.boards.topic),
        ] {
            if board.capacity.is_some_and(|c| c == 0 || c > MAX_CAPACITY) {
                return Err(ConfigError::ValidationError(format!(
                    "boards.{name}.capacity must be between 1 and {MAX_CAPACITY}"
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.backend, "sqlite");
        assert_eq!(config.gateway.port, 42700);
        assert_eq!(config.boards.event.capacity, Some(6));
        assert_eq!(config.boards.daily.capacity, Some(9));
        assert_eq!(config.boards.topic.overflow, OverflowPolicy::EvictTail);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.store.store_name, config.store.store_name);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.boards.daily.capacity, config.boards.daily.capacity);
    }

    #[test]
    fn board_overrides_parse() {
        let toml_str = r#"
[store]
backend = "memory"

[boards.event]
capacity = 4
overflow = "reject"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.boards.event.capacity, Some(4));
        assert_eq!(config.boards.event.overflow, OverflowPolicy::Reject);
        // untouched boards keep their defaults
        assert_eq!(config.boards.daily.capacity, Some(9));

        let scope = config.boards.event.apply(ScopeConfig::event_carousel());
        assert_eq!(scope.capacity, 4);
        assert_eq!(scope.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn board_table_without_capacity_keeps_kind_default() {
        let toml_str = r#"
[boards.daily]
overflow = "reject"

[boards.event]
overflow = "reject"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.boards.daily.capacity, None);

        let daily = config.boards.daily.apply(ScopeConfig::daily_top());
        assert_eq!(daily.capacity, 9);
        assert_eq!(daily.overflow, OverflowPolicy::Reject);
        let event = config.boards.event.apply(ScopeConfig::event_carousel());
        assert_eq!(event.capacity, 6);
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "redis".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.boards.topic.capacity = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().store.backend, "sqlite");
    }

    #[test]
    fn load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[boards.daily]\ncapacity = 100\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        std::fs::write(&path, "this is = = not toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_store_paths_depend_on_backend() {
        let mut store = StoreConfig::default();
        assert!(store.resolved_path().ends_with("state.sqlite"));
        store.backend = "file".into();
        assert!(store.resolved_path().ends_with("state.json"));
        store.path = Some(PathBuf::from("/data/x.json"));
        assert_eq!(store.resolved_path(), PathBuf::from("/data/x.json"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("statestore"));
        assert!(toml_str.contains("42700"));
        assert!(toml_str.contains("evict_tail"));
    }
}
