use clap::{Parser, Subcommand};
use todo_timer_core::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task with a countdown
    ///
    /// Example: todo_timer add "Write report" 30m
    /// Example: todo_timer add "Stretch" 1h30m
    Add {
        description: String,
        duration: String,
    },
    /// List tasks with their remaining time
    ///
    /// Example: todo_timer list
    List,
    /// Start a task's countdown
    ///
    /// Outside the interactive prompt the countdown runs in the foreground
    /// until it expires or Ctrl-C stops it.
    ///
    /// Example: todo_timer start 3f2a
    Start {
        id: String,
    },
    /// Stop a running countdown and save the remaining time
    ///
    /// Only available inside the interactive prompt, where timers keep running
    /// between commands. A foreground `start` is stopped with Ctrl-C.
    ///
    /// Example: stop 3f2a
    Stop {
        id: String,
    },
    /// Restore a task's countdown to its planned duration
    ///
    /// Example: todo_timer reset 3f2a
    Reset {
        id: String,
    },
    /// Toggle a task's completed flag
    ///
    /// Example: todo_timer done 3f2a
    Done {
        id: String,
    },
    /// Delete every completed task
    ///
    /// Example: todo_timer clear
    Clear,
    /// Show the duration presets
    ///
    /// Example: todo_timer durations
    Durations,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Durations,
    AlertPlayer,
    AlertSound,
    DesktopNotifications,
    StorePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "durations" | "duration" => ConfigOverrideTarget::Durations,
        "alert_player" | "player" => ConfigOverrideTarget::AlertPlayer,
        "alert_sound" | "sound" => ConfigOverrideTarget::AlertSound,
        "desktop_notifications" | "notifications" => ConfigOverrideTarget::DesktopNotifications,
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` flag into one set of overrides; later flags win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Durations => {
                let durations: Vec<String> = parsed
                    .value
                    .split(',')
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect();
                if durations.is_empty() {
                    return Err("durations override needs at least one value".to_string());
                }
                overrides.durations = Some(durations);
            }
            ConfigOverrideTarget::AlertPlayer => overrides.alert_player = Some(parsed.value),
            ConfigOverrideTarget::AlertSound => overrides.alert_sound = Some(parsed.value),
            ConfigOverrideTarget::DesktopNotifications => {
                overrides.desktop_notifications = Some(parse_flag(&parsed.value)?);
            }
            ConfigOverrideTarget::StorePath => overrides.store_path = Some(parsed.value),
        }
    }

    Ok(overrides)
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrideTarget, collect_config_overrides, parse_config_override};

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" Alert-Player = paplay ").unwrap();

        assert_eq!(parsed.target, ConfigOverrideTarget::AlertPlayer);
        assert_eq!(parsed.value, "paplay");
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("theme=noir").unwrap_err();
        assert!(err.contains("unknown config field"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("durations").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn parse_config_override_rejects_empty_key() {
        let err = parse_config_override(" = 5m").unwrap_err();
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn collect_splits_duration_lists() {
        let overrides =
            collect_config_overrides(&["durations= 5m, 25m ,".to_string()]).unwrap();
        assert_eq!(
            overrides.durations,
            Some(vec!["5m".to_string(), "25m".to_string()])
        );
    }

    #[test]
    fn collect_later_flags_win() {
        let overrides = collect_config_overrides(&[
            "store_path=/tmp/a.db".to_string(),
            "store=/tmp/b.db".to_string(),
            "notifications=off".to_string(),
        ])
        .unwrap();

        assert_eq!(overrides.store_path.as_deref(), Some("/tmp/b.db"));
        assert_eq!(overrides.desktop_notifications, Some(false));
        assert_eq!(overrides.alert_player, None);
    }

    #[test]
    fn collect_rejects_bad_flag_value() {
        let err = collect_config_overrides(&["notifications=maybe".to_string()]).unwrap_err();
        assert!(err.contains("expected true or false"));
    }
}
