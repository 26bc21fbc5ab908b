//! Durable task records.
//!
//! Every call is synchronous and independently atomic: when a method returns
//! `Ok` the change is on disk.

use crate::error::AppError;
use crate::model::Task;
use std::path::PathBuf;
use std::time::Duration;

pub mod sqlite_store;

pub use sqlite_store::SqliteTaskStore;

const STORE_FILE_NAME: &str = "todos.db";
const STORE_ENV_VAR: &str = "TODO_TIMER_STORE_PATH";

pub trait TaskStore: Send + Sync {
    fn insert(&self, task: &Task) -> Result<(), AppError>;

    /// Every stored task in creation order.
    fn load_all(&self) -> Result<Vec<Task>, AppError>;

    /// Absent ids are not an error.
    fn delete(&self, id: &str) -> Result<(), AppError>;

    fn update_remaining_time(&self, id: &str, remaining: Duration) -> Result<(), AppError>;

    fn update_completed(&self, id: &str, completed: bool) -> Result<(), AppError>;
}

/// Resolves the database location: env var, then the configured path, then the
/// per-user default.
pub fn store_path(configured: Option<&str>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path.trim()));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("todo-timer")
            .join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todo-timer")
            .join(STORE_FILE_NAME))
    }
}
