//! In-memory task list kept in step with the store.
//!
//! Store writes happen before the in-memory list changes, so a failed write
//! leaves the registry untouched. Timer transitions persist through the
//! engine.

use crate::duration::parse_duration;
use crate::error::AppError;
use crate::model::{Task, TaskView};
use crate::timer::{DisplayEvent, TaskTimer, TimerEngine};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use uuid::Uuid;

struct TaskEntry {
    task: Task,
    timer: TaskTimer,
}

impl TaskEntry {
    fn view(&self) -> TaskView {
        TaskView {
            id: self.task.id.clone(),
            description: self.task.description.clone(),
            planned_duration: self.task.planned_duration,
            remaining: self.timer.remaining(),
            state: self.timer.state(),
            completed: self.task.completed,
            created_at: self.task.created_at.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ClearOutcome {
    pub removed: Vec<TaskView>,
    pub failures: Vec<ClearFailure>,
}

#[derive(Debug)]
pub struct ClearFailure {
    pub task_id: String,
    pub error: AppError,
}

pub struct TaskRegistry {
    engine: TimerEngine,
    entries: Vec<TaskEntry>,
}

impl TaskRegistry {
    pub fn new(engine: TimerEngine) -> Self {
        Self {
            engine,
            entries: Vec::new(),
        }
    }

    /// Replaces the list with the stored tasks. Every task comes back stopped.
    pub fn load_from_store(&mut self) -> Result<usize, AppError> {
        for entry in &self.entries {
            if let Err(err) = entry.timer.stop() {
                warn!(task_id = %entry.task.id, error = %err, "failed to stop timer before reload");
            }
        }
        let tasks = self.engine.store().load_all()?;

        self.entries = tasks
            .into_iter()
            .map(|task| TaskEntry {
                timer: self.engine.timer_for(&task),
                task,
            })
            .collect();

        info!(count = self.entries.len(), "tasks loaded");
        self.engine.notify(DisplayEvent::ListChanged);
        Ok(self.entries.len())
    }

    pub fn add_task(&mut self, description: &str, duration: &str) -> Result<TaskView, AppError> {
        let planned = parse_duration(duration)?;
        self.add_task_with_duration(description, planned)
    }

    pub fn add_task_with_duration(
        &mut self,
        description: &str,
        planned: Duration,
    ) -> Result<TaskView, AppError> {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("description is required"));
        }
        if planned.is_zero() {
            return Err(AppError::invalid_input("duration must be greater than zero"));
        }

        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;

        let task = Task {
            id: Uuid::new_v4().to_string(),
            description: trimmed.to_string(),
            planned_duration: planned,
            remaining: planned,
            completed: false,
            created_at,
        };

        self.engine.store().insert(&task)?;
        info!(task_id = %task.id, "task added");

        let entry = TaskEntry {
            timer: self.engine.timer_for(&task),
            task,
        };
        let view = entry.view();
        self.entries.push(entry);
        self.engine.notify(DisplayEvent::ListChanged);

        Ok(view)
    }

    /// Starting a running task is a logged no-op.
    pub fn start(&self, key: &str) -> Result<TaskView, AppError> {
        let entry = &self.entries[self.resolve(key)?];
        entry.timer.start();
        Ok(entry.view())
    }

    pub fn stop(&self, key: &str) -> Result<TaskView, AppError> {
        let entry = &self.entries[self.resolve(key)?];
        entry.timer.stop()?;
        Ok(entry.view())
    }

    pub fn reset(&self, key: &str) -> Result<TaskView, AppError> {
        let entry = &self.entries[self.resolve(key)?];
        entry.timer.reset()?;
        Ok(entry.view())
    }

    pub fn toggle_completed(&mut self, key: &str) -> Result<TaskView, AppError> {
        let index = self.resolve(key)?;
        let completed = !self.entries[index].task.completed;
        self.update_completed(index, completed)
    }

    pub fn set_completed(&mut self, key: &str, completed: bool) -> Result<TaskView, AppError> {
        let index = self.resolve(key)?;
        self.update_completed(index, completed)
    }

    fn update_completed(&mut self, index: usize, completed: bool) -> Result<TaskView, AppError> {
        let entry = &mut self.entries[index];
        self.engine
            .store()
            .update_completed(&entry.task.id, completed)?;
        entry.task.completed = completed;
        let view = entry.view();
        self.engine.notify(DisplayEvent::ListChanged);
        Ok(view)
    }

    /// Drops completed tasks from the store and the list, stopping their timers
    /// first. A task whose delete fails stays listed and is reported.
    pub fn clear_completed(&mut self) -> ClearOutcome {
        let store = self.engine.store().clone();
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut removed = Vec::new();
        let mut failures = Vec::new();

        for entry in self.entries.drain(..) {
            if !entry.task.completed {
                kept.push(entry);
                continue;
            }

            if let Err(err) = entry.timer.stop() {
                warn!(task_id = %entry.task.id, error = %err, "failed to save timer before delete");
            }

            match store.delete(&entry.task.id) {
                Ok(()) => removed.push(entry.view()),
                Err(err) => {
                    warn!(task_id = %entry.task.id, error = %err, "failed to delete completed task");
                    failures.push(ClearFailure {
                        task_id: entry.task.id.clone(),
                        error: err,
                    });
                    kept.push(entry);
                }
            }
        }

        self.entries = kept;
        info!(removed = removed.len(), failed = failures.len(), "completed tasks cleared");
        self.engine.notify(DisplayEvent::ListChanged);

        ClearOutcome { removed, failures }
    }

    pub fn list(&self) -> Vec<TaskView> {
        self.entries.iter().map(TaskEntry::view).collect()
    }

    pub fn get(&self, key: &str) -> Result<TaskView, AppError> {
        Ok(self.entries[self.resolve(key)?].view())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches a full id first, then a unique id prefix.
    fn resolve(&self, key: &str) -> Result<usize, AppError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("id is required"));
        }

        if let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.task.id == trimmed)
        {
            return Ok(index);
        }

        let mut matches = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.task.id.starts_with(trimmed))
            .map(|(index, _)| index);

        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(AppError::invalid_input(format!(
                "id prefix '{trimmed}' matches more than one task"
            ))),
            (None, _) => Err(AppError::invalid_input("task not found")),
        }
    }
}
