//! TOML-based configuration shared by the sender and the receiver.
//!
//! Reads and writes [`MirrorConfig`] from the platform-appropriate file:
//! - Windows:  `%APPDATA%\InputMirror\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/inputmirror/config.toml` or `~/.config/inputmirror/config.toml`
//! - macOS:    `~/Library/Application Support/InputMirror/config.toml`
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [network]
//! port = 8765
//! bind_address = "0.0.0.0"
//!
//! [session]
//! connect_timeout_ms = 30000
//! mouse_throttle_ms = 16
//! token_length = 6
//! ```
//!
//! # Missing fields
//!
//! Every field carries `#[serde(default = "...")]` and every section carries
//! `#[serde(default)]`, so an empty file, a file from an older release or no
//! file at all all produce a usable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a config file could not be read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `APPDATA`, `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("no config directory for this platform")]
    NoPlatformConfigDir,

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be written as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MirrorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the receiver listens and the sender connects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// WebSocket port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address the receiver binds to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Session protocol tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long the sender waits for `accept`/`reject` after connecting.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Minimum spacing between forwarded mouse moves.
    #[serde(default = "default_mouse_throttle_ms")]
    pub mouse_throttle_ms: u64,
    /// Number of characters in a generated token.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn mouse_throttle(&self) -> Duration {
        Duration::from_millis(self.mouse_throttle_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    8765
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    30_000
}
fn default_mouse_throttle_ms() -> u64 {
    16
}
fn default_token_length() -> usize {
    crate::crypto::token::DEFAULT_TOKEN_LENGTH
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            mouse_throttle_ms: default_mouse_throttle_ms(),
            token_length: default_token_length(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Directory holding `config.toml` on this platform.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// `config_dir()/config.toml`.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from `path`, or from the platform default when `None`.
///
/// A missing file yields [`MirrorConfig::default()`].
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML; [`ConfigError::Io`] for any read
/// failure except a missing file.
pub fn load_config(path: Option<&Path>) -> Result<MirrorConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(MirrorConfig::default())
        }
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Writes `config` to `path`, creating missing parent directories.
pub fn save_config(config: &MirrorConfig, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("InputMirror"))
    }

    #[cfg(target_os = "linux")]
    {
        match std::env::var_os("XDG_CONFIG_HOME") {
            Some(xdg) => Some(PathBuf::from(xdg).join("inputmirror")),
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config").join("inputmirror")),
        }
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("InputMirror")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mirror_cfg_test_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = MirrorConfig::default();

        // Assert
        assert_eq!(cfg.general.log_level, "info");
        assert_eq!(cfg.network.port, 8765);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.session.connect_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.session.mouse_throttle(), Duration::from_millis(16));
        assert_eq!(cfg.session.token_length, 6);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: MirrorConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, MirrorConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[network]
port = 9000
"#;

        // Act
        let cfg: MirrorConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.session.connect_timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        // Arrange
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config(Some(&path));

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        assert_eq!(load_config(Some(&path)).unwrap(), MirrorConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("nested").join("config.toml");
        let mut cfg = MirrorConfig::default();
        cfg.network.port = 12345;
        cfg.general.log_level = "debug".to_string();

        // Act
        save_config(&cfg, &path).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
