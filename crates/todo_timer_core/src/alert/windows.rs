use crate::alert::Alert;
use crate::error::AppError;
use tauri_winrt_notification::Toast;

pub struct WindowsDesktopAlert;

impl Alert for WindowsDesktopAlert {
    fn play(&self) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("todo-timer")
            .text1("Countdown finished")
            .show()
            .map_err(|err| AppError::io(err.to_string()))
    }
}
