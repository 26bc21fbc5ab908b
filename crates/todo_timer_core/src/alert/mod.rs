//! Audible and visual signal fired when a countdown reaches zero.

use crate::config::Config;
use crate::error::AppError;
use std::process::Command;
use tracing::debug;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxDesktopAlert;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsDesktopAlert;

const DISABLE_ENV_VAR: &str = "TODO_TIMER_DISABLE_ALERTS";

pub trait Alert: Send + Sync {
    /// May block until the alert finishes; the engine calls it off the tick loop.
    fn play(&self) -> Result<(), AppError>;
}

pub struct NoopAlert;

impl Alert for NoopAlert {
    fn play(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Runs an external player on a sound file and waits for it to exit.
pub struct SoundAlert {
    player: String,
    sound: String,
}

impl SoundAlert {
    pub fn new<P: Into<String>, S: Into<String>>(player: P, sound: S) -> Self {
        Self {
            player: player.into(),
            sound: sound.into(),
        }
    }
}

impl Alert for SoundAlert {
    fn play(&self) -> Result<(), AppError> {
        debug!(player = %self.player, sound = %self.sound, "playing alert sound");
        let status = Command::new(&self.player)
            .arg(&self.sound)
            .status()
            .map_err(|err| AppError::io(format!("{}: {}", self.player, err)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AppError::io(format!("{} exited with {}", self.player, status)))
        }
    }
}

/// Plays every inner alert; the first failure is reported after all have run.
pub struct CompositeAlert {
    alerts: Vec<Box<dyn Alert>>,
}

impl CompositeAlert {
    pub fn new(alerts: Vec<Box<dyn Alert>>) -> Self {
        Self { alerts }
    }
}

impl Alert for CompositeAlert {
    fn play(&self) -> Result<(), AppError> {
        let mut first_error = None;
        for alert in &self.alerts {
            if let Err(err) = alert.play()
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn alert_from_config(config: &Config) -> Box<dyn Alert> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Box::new(NoopAlert);
    }

    let mut alerts: Vec<Box<dyn Alert>> = Vec::new();
    if !config.alert_player.trim().is_empty() {
        alerts.push(Box::new(SoundAlert::new(
            config.alert_player.trim(),
            config.alert_sound.clone(),
        )));
    }
    if config.desktop_notifications
        && let Some(desktop) = platform_alert()
    {
        alerts.push(desktop);
    }

    if alerts.is_empty() {
        Box::new(NoopAlert)
    } else {
        Box::new(CompositeAlert::new(alerts))
    }
}

#[cfg(target_os = "linux")]
fn platform_alert() -> Option<Box<dyn Alert>> {
    Some(Box::new(LinuxDesktopAlert))
}

#[cfg(windows)]
fn platform_alert() -> Option<Box<dyn Alert>> {
    Some(Box::new(WindowsDesktopAlert))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_alert() -> Option<Box<dyn Alert>> {
    None
}

#[cfg(test)]
mod tests {
    use super::{Alert, CompositeAlert, NoopAlert, SoundAlert};
    use crate::error::AppError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Alert for Counting {
        fn play(&self) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::io("speaker unplugged"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn noop_alert_succeeds() {
        assert!(NoopAlert.play().is_ok());
    }

    #[test]
    fn composite_runs_every_alert_and_reports_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let composite = CompositeAlert::new(vec![
            Box::new(Counting {
                calls: calls.clone(),
                fail: true,
            }),
            Box::new(Counting {
                calls: calls.clone(),
                fail: false,
            }),
        ]);

        let err = composite.play().unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn sound_alert_reports_missing_player() {
        let alert = SoundAlert::new("todo-timer-no-such-player", "finished.wav");
        let err = alert.play().unwrap_err();
        assert_eq!(err.code(), "io_error");
    }
}
