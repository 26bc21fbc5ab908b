use crate::duration::{DEFAULT_DURATIONS, parse_duration};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TODO_TIMER_CONFIG_PATH";
const DEFAULT_ALERT_PLAYER: &str = "aplay";
const DEFAULT_ALERT_SOUND: &str = "sounds/finished.wav";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Presets offered when creating a task.
    #[serde(default = "default_durations")]
    pub durations: Vec<String>,
    #[serde(default = "default_alert_player")]
    pub alert_player: String,
    #[serde(default = "default_alert_sound")]
    pub alert_sound: String,
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,
    #[serde(default)]
    pub store_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durations: default_durations(),
            alert_player: default_alert_player(),
            alert_sound: default_alert_sound(),
            desktop_notifications: true,
            store_path: None,
        }
    }
}

fn default_durations() -> Vec<String> {
    DEFAULT_DURATIONS.iter().map(|value| value.to_string()).collect()
}

fn default_alert_player() -> String {
    DEFAULT_ALERT_PLAYER.to_string()
}

fn default_alert_sound() -> String {
    DEFAULT_ALERT_SOUND.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub durations: Option<Vec<String>>,
    pub alert_player: Option<String>,
    pub alert_sound: Option<String>,
    pub desktop_notifications: Option<bool>,
    pub store_path: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("todo-timer")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todo-timer")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate_durations(&config.durations)
        .map_err(|err| AppError::invalid_data(format!("{}: {}", path.display(), err.message())))?;
    Ok(config)
}

/// Every preset must parse and be non-zero.
pub fn validate_durations(durations: &[String]) -> Result<(), AppError> {
    if durations.is_empty() {
        return Err(AppError::invalid_input("durations cannot be empty"));
    }
    for value in durations {
        if parse_duration(value)?.is_zero() {
            return Err(AppError::invalid_input(format!(
                "duration '{value}' must be greater than zero"
            )));
        }
    }
    Ok(())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(durations) = overrides.durations.as_ref() {
        merged.durations = durations.clone();
    }
    if let Some(player) = overrides.alert_player.as_ref() {
        merged.alert_player = player.clone();
    }
    if let Some(sound) = overrides.alert_sound.as_ref() {
        merged.alert_sound = sound.clone();
    }
    if let Some(enabled) = overrides.desktop_notifications {
        merged.desktop_notifications = enabled;
    }
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }

    merged
}
