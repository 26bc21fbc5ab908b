use crate::alert::Alert;
use crate::error::AppError;
use notify_rust::Notification;

pub struct LinuxDesktopAlert;

impl Alert for LinuxDesktopAlert {
    fn play(&self) -> Result<(), AppError> {
        Notification::new()
            .summary("todo-timer")
            .body("Countdown finished")
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
