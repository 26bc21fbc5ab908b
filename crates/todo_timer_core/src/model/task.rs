use crate::duration::format_clock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One todo entry and its countdown budget.
///
/// `remaining` is the value last written to the store; while a timer runs the
/// live value is owned by the engine and read through [`TaskView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub planned_duration: Duration,
    pub remaining: Duration,
    pub completed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Expired,
}

impl TimerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Expired => "expired",
        }
    }
}

/// What the display needs to draw one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    pub description: String,
    pub planned_duration: Duration,
    pub remaining: Duration,
    pub state: TimerState,
    pub completed: bool,
    pub created_at: String,
}

impl TaskView {
    pub fn remaining_display(&self) -> String {
        format_clock(self.remaining)
    }

    pub fn planned_display(&self) -> String {
        crate::duration::format_stored(self.planned_duration)
    }
}
