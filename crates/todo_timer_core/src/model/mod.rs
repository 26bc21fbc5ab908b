mod task;

pub use task::{Task, TaskView, TimerState};
