//! Persistent settings, read from `<config_dir>/regioncap/config.json`.
//!
//! Every key is optional; a missing or out-of-range value falls back to the
//! built-in default. The file is never written by the tool itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::magnifier::MagnifierSettings;
use crate::selection::SelectionLimits;
use crate::session::SessionSettings;

pub const APP_DIR_NAME: &str = "regioncap";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_ACTIVATION_PORT: u16 = 19283;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub min_selection_size: i32,
    pub handle_threshold: i32,
    pub magnifier_size: u32,
    pub magnifier_zoom: u32,
    pub magnifier_hide_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub activation_port: u16,
    pub show_info: bool,
    pub restore_on_activate: bool,
    pub copy_on_save: bool,
    pub persist_history: bool,
    pub save_dir: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let limits = SelectionLimits::default();
        let magnifier = MagnifierSettings::default();
        Config {
            min_selection_size: limits.min_size,
            handle_threshold: limits.handle_threshold,
            magnifier_size: magnifier.size,
            magnifier_zoom: magnifier.zoom,
            magnifier_hide_delay_ms: magnifier.hide_delay.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            activation_port: DEFAULT_ACTIVATION_PORT,
            show_info: true,
            restore_on_activate: true,
            copy_on_save: true,
            persist_history: false,
            save_dir: default_save_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    min_selection_size: Option<i32>,
    #[serde(default)]
    handle_threshold: Option<i32>,
    #[serde(default)]
    magnifier_size: Option<u32>,
    #[serde(default)]
    magnifier_zoom: Option<u32>,
    #[serde(default)]
    magnifier_hide_delay_ms: Option<u64>,
    #[serde(default)]
    poll_interval_ms: Option<u64>,
    #[serde(default)]
    activation_port: Option<u16>,
    #[serde(default)]
    show_info: Option<bool>,
    #[serde(default)]
    restore_on_activate: Option<bool>,
    #[serde(default)]
    copy_on_save: Option<bool>,
    #[serde(default)]
    persist_history: Option<bool>,
    #[serde(default)]
    save_dir: Option<PathBuf>,
    #[serde(default)]
    log_level: Option<String>,
}

/// `~/Downloads`, or the home directory, or the working directory.
pub fn default_save_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Loads the platform config file. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let raw: RawConfig = serde_json::from_str(&contents)?;
        debug!("loaded config from {}", path.display());
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let d = Self::default();
        Config {
            min_selection_size: raw
                .min_selection_size
                .filter(|v| *v > 0)
                .unwrap_or(d.min_selection_size),
            handle_threshold: raw
                .handle_threshold
                .filter(|v| *v >= 0)
                .unwrap_or(d.handle_threshold),
            magnifier_size: raw
                .magnifier_size
                .filter(|v| *v > 0)
                .unwrap_or(d.magnifier_size),
            magnifier_zoom: raw
                .magnifier_zoom
                .filter(|v| *v > 0)
                .unwrap_or(d.magnifier_zoom),
            magnifier_hide_delay_ms: raw
                .magnifier_hide_delay_ms
                .unwrap_or(d.magnifier_hide_delay_ms),
            poll_interval_ms: raw
                .poll_interval_ms
                .filter(|v| *v > 0)
                .unwrap_or(d.poll_interval_ms),
            activation_port: raw
                .activation_port
                .filter(|v| *v > 0)
                .unwrap_or(d.activation_port),
            show_info: raw.show_info.unwrap_or(d.show_info),
            restore_on_activate: raw.restore_on_activate.unwrap_or(d.restore_on_activate),
            copy_on_save: raw.copy_on_save.unwrap_or(d.copy_on_save),
            persist_history: raw.persist_history.unwrap_or(d.persist_history),
            save_dir: raw.save_dir.unwrap_or(d.save_dir),
            log_level: raw
                .log_level
                .filter(|l| log_level_is_valid(l))
                .unwrap_or(d.log_level),
        }
    }

    pub fn selection_limits(&self) -> SelectionLimits {
        SelectionLimits {
            min_size: self.min_selection_size,
            handle_threshold: self.handle_threshold,
        }
    }

    pub fn magnifier_settings(&self) -> MagnifierSettings {
        MagnifierSettings {
            size: self.magnifier_size,
            zoom: self.magnifier_zoom,
            hide_delay: Duration::from_millis(self.magnifier_hide_delay_ms),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            limits: self.selection_limits(),
            magnifier: self.magnifier_settings(),
            show_info: self.show_info,
            restore_on_activate: self.restore_on_activate,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn log_level_is_valid(level: &str) -> bool {
    matches!(
        level.to_ascii_lowercase().as_str(),
        "off" | "error" | "warn" | "info" | "debug" | "trace"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.min_selection_size, 10);
        assert_eq!(config.handle_threshold, 10);
        assert_eq!(config.magnifier_size, 180);
        assert_eq!(config.magnifier_zoom, 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "magnifier_zoom": 4, "copy_on_save": false, "save_dir": "/tmp/shots" }"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.magnifier_zoom, 4);
        assert!(!config.copy_on_save);
        assert_eq!(config.save_dir, PathBuf::from("/tmp/shots"));
        assert_eq!(config.magnifier_size, 180);
        assert!(config.restore_on_activate);
    }

    #[test]
    fn nonsense_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "magnifier_zoom": 0, "min_selection_size": -5, "log_level": "loud" }"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.magnifier_zoom, 3);
        assert_eq!(config.min_selection_size, 10);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn converts_to_component_settings() {
        let config = Config {
            min_selection_size: 20,
            handle_threshold: 6,
            magnifier_hide_delay_ms: 250,
            ..Config::default()
        };
        let s = config.session_settings();
        assert_eq!(s.limits.min_size, 20);
        assert_eq!(s.limits.handle_threshold, 6);
        assert_eq!(s.magnifier.hide_delay, Duration::from_millis(250));
    }
}
