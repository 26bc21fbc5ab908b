use crate::duration::{format_stored, parse_duration};
use crate::error::AppError;
use crate::model::Task;
use crate::storage::TaskStore;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS todos (
    id             TEXT PRIMARY KEY,
    task           TEXT NOT NULL,
    duration       TEXT NOT NULL,
    remaining_time TEXT NOT NULL,
    completed      INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);
"#;

/// SQLite backed [`TaskStore`]. One connection shared behind a mutex; each
/// method runs a single statement.
pub struct SqliteTaskStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Opens or creates the database file and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let conn = Connection::open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if path.is_file() {
                let permissions = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(path, permissions)
                    .map_err(|err| AppError::io(err.to_string()))?;
            }
        }

        let store = Self::with_connection(conn, Some(path.to_path_buf()))?;
        info!(path = %path.display(), "task store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, AppError> {
        apply_schema(&conn)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let raw: String = row.get(0)?;
                let version = raw
                    .parse::<u32>()
                    .map_err(|_| AppError::invalid_data("schema_version must be an integer"))?;
                Ok(Some(version))
            }
            None => Ok(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|err| AppError::storage(format!("connection lock poisoned: {err}")))
    }
}

fn apply_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

struct StoredRow {
    id: String,
    description: String,
    duration: String,
    remaining_time: String,
    completed: bool,
    created_at: String,
}

impl StoredRow {
    fn into_task(self) -> Result<Task, AppError> {
        let planned_duration = parse_duration(&self.duration).map_err(|err| {
            AppError::invalid_data(format!("task {}: bad duration: {}", self.id, err.message()))
        })?;
        let remaining = parse_duration(&self.remaining_time).map_err(|err| {
            AppError::invalid_data(format!(
                "task {}: bad remaining_time: {}",
                self.id,
                err.message()
            ))
        })?;

        Ok(Task {
            id: self.id,
            description: self.description,
            planned_duration,
            remaining,
            completed: self.completed,
            created_at: self.created_at,
        })
    }
}

impl TaskStore for SqliteTaskStore {
    fn insert(&self, task: &Task) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO todos (id, task, duration, remaining_time, completed, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.description,
                format_stored(task.planned_duration),
                format_stored(task.remaining),
                task.completed,
                task.created_at,
            ],
        )?;
        debug!(task_id = %task.id, "task inserted");
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Task>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, task, duration, remaining_time, completed, created_at \
             FROM todos ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                description: row.get(1)?,
                duration: row.get(2)?,
                remaining_time: row.get(3)?,
                completed: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn delete(&self, id: &str) -> Result<(), AppError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        debug!(task_id = id, affected, "task deleted");
        Ok(())
    }

    fn update_remaining_time(&self, id: &str, remaining: Duration) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE todos SET remaining_time = ?1 WHERE id = ?2",
            params![format_stored(remaining), id],
        )?;
        debug!(task_id = id, remaining = remaining.as_secs(), "remaining time saved");
        Ok(())
    }

    fn update_completed(&self, id: &str, completed: bool) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE todos SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        Ok(())
    }
}
