//! Per-task countdown timers.
//!
//! Each running task owns one spawned tick loop and one [`CancellationToken`].
//! A token is created on every start and consumed by the stop, reset or expiry
//! that ends that run, so a restarted timer never shares a token with an
//! earlier loop. Ticks only touch memory; the store is written on stop, reset
//! and expiry.
//!
//! ```rust,ignore
//! let engine = TimerEngine::new(store, alert).with_events(tx);
//! let timer = engine.timer_for(&task);
//! timer.start();
//! ```

use crate::alert::Alert;
use crate::duration::format_clock;
use crate::error::AppError;
use crate::model::{Task, TimerState};
use crate::storage::TaskStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Period of one tick, and the amount removed from the countdown by each.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Notifications pushed to the display. Sending never blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Tick { task_id: String, remaining: Duration },
    Stopped { task_id: String, remaining: Duration },
    Reset { task_id: String, remaining: Duration },
    Expired { task_id: String },
    ListChanged,
}

impl DisplayEvent {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Tick { task_id, .. }
            | Self::Stopped { task_id, .. }
            | Self::Reset { task_id, .. }
            | Self::Expired { task_id } => Some(task_id),
            Self::ListChanged => None,
        }
    }

    /// `HH:MM:SS` text for events that carry a remaining time.
    pub fn clock(&self) -> Option<String> {
        match self {
            Self::Tick { remaining, .. }
            | Self::Stopped { remaining, .. }
            | Self::Reset { remaining, .. } => Some(format_clock(*remaining)),
            Self::Expired { .. } => Some(format_clock(Duration::ZERO)),
            Self::ListChanged => None,
        }
    }
}

/// Shared collaborators for every task timer.
#[derive(Clone)]
pub struct TimerEngine {
    store: Arc<dyn TaskStore>,
    alert: Arc<dyn Alert>,
    events: Option<UnboundedSender<DisplayEvent>>,
}

impl TimerEngine {
    pub fn new(store: Arc<dyn TaskStore>, alert: Arc<dyn Alert>) -> Self {
        Self {
            store,
            alert,
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<DisplayEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub(crate) fn notify(&self, event: DisplayEvent) {
        if let Some(events) = self.events.as_ref() {
            // A closed display is not an error for the engine.
            let _ = events.send(event);
        }
    }

    /// Builds an idle timer from a task's stored remaining time.
    pub fn timer_for(&self, task: &Task) -> TaskTimer {
        let state = if task.remaining.is_zero() {
            TimerState::Expired
        } else {
            TimerState::Idle
        };

        TaskTimer {
            task_id: task.id.clone(),
            planned: task.planned_duration,
            engine: self.clone(),
            shared: Arc::new(Mutex::new(TimerShared {
                remaining: task.remaining,
                state,
                cancel: None,
            })),
        }
    }

    fn fire_alert(&self, task_id: &str) {
        let alert = self.alert.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = alert.play() {
                warn!(task_id = %task_id, error = %err, "alert failed");
            }
        });
    }
}

#[derive(Debug)]
struct TimerShared {
    remaining: Duration,
    state: TimerState,
    cancel: Option<CancellationToken>,
}

/// Countdown state machine for one task.
///
/// `start`, `stop` and `reset` are expected from a single control thread; the
/// only concurrency handled here is the tick loop racing those calls.
pub struct TaskTimer {
    task_id: String,
    planned: Duration,
    engine: TimerEngine,
    shared: Arc<Mutex<TimerShared>>,
}

impl TaskTimer {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn remaining(&self) -> Duration {
        self.lock().remaining
    }

    pub fn state(&self) -> TimerState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerState::Running
    }

    /// Spawns the tick loop. Returns `false` when the timer was already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let token = {
            let mut shared = self.lock();
            if shared.state == TimerState::Running {
                warn!(task_id = %self.task_id, "timer already running");
                return false;
            }
            if shared.remaining.is_zero() {
                shared.remaining = self.planned;
            }

            let token = CancellationToken::new();
            shared.cancel = Some(token.clone());
            shared.state = TimerState::Running;
            token
        };

        info!(task_id = %self.task_id, remaining = self.remaining().as_secs(), "timer started");
        let ticks = TickLoop {
            task_id: self.task_id.clone(),
            engine: self.engine.clone(),
            shared: self.shared.clone(),
            token,
        };
        tokio::spawn(ticks.run());
        true
    }

    /// Cancels the tick loop and saves the remaining time. Returns `Ok(false)`
    /// when the timer was not running.
    ///
    /// A store failure is returned after the in-memory stop has happened.
    pub fn stop(&self) -> Result<bool, AppError> {
        let mut shared = self.lock();
        if shared.state != TimerState::Running {
            debug!(task_id = %self.task_id, "stop ignored, timer not running");
            return Ok(false);
        }
        shared.cancel.take().unwrap_or_default().cancel();
        shared.state = TimerState::Idle;
        let remaining = shared.remaining;

        info!(task_id = %self.task_id, remaining = remaining.as_secs(), "timer stopped");
        // Written under the lock so an expiry or reset cannot land in between.
        let saved = self.save_remaining(remaining);
        self.engine.notify(DisplayEvent::Stopped {
            task_id: self.task_id.clone(),
            remaining,
        });
        saved.map(|_| true)
    }

    /// Returns to idle with the full planned duration, whatever the prior state.
    pub fn reset(&self) -> Result<(), AppError> {
        let mut shared = self.lock();
        if let Some(token) = shared.cancel.take() {
            token.cancel();
        }
        shared.state = TimerState::Idle;
        shared.remaining = self.planned;

        info!(task_id = %self.task_id, "timer reset");
        let saved = self.save_remaining(self.planned);
        self.engine.notify(DisplayEvent::Reset {
            task_id: self.task_id.clone(),
            remaining: self.planned,
        });
        saved
    }

    fn save_remaining(&self, remaining: Duration) -> Result<(), AppError> {
        self.engine
            .store
            .update_remaining_time(&self.task_id, remaining)
            .inspect_err(|err| {
                warn!(task_id = %self.task_id, error = %err, "failed to save remaining time");
            })
    }

    fn lock(&self) -> MutexGuard<'_, TimerShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum TickOutcome {
    Cancelled,
    Running,
    Expired,
}

struct TickLoop {
    task_id: String,
    engine: TimerEngine,
    shared: Arc<Mutex<TimerShared>>,
    token: CancellationToken,
}

impl TickLoop {
    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!(task_id = %self.task_id, "tick loop cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    match self.advance() {
                        TickOutcome::Cancelled => return,
                        TickOutcome::Running => {}
                        TickOutcome::Expired => {
                            self.engine.fire_alert(&self.task_id);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One tick. Stop and reset take the same lock for their own write and
    /// event, so store writes and display events follow the state order.
    fn advance(&self) -> TickOutcome {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() || shared.state != TimerState::Running {
            return TickOutcome::Cancelled;
        }

        shared.remaining = shared.remaining.saturating_sub(TICK_INTERVAL);
        if !shared.remaining.is_zero() {
            debug!(task_id = %self.task_id, remaining = shared.remaining.as_secs(), "tick");
            self.engine.notify(DisplayEvent::Tick {
                task_id: self.task_id.clone(),
                remaining: shared.remaining,
            });
            return TickOutcome::Running;
        }

        shared.state = TimerState::Expired;
        shared.cancel = None;
        info!(task_id = %self.task_id, "countdown expired");
        if let Err(err) = self
            .engine
            .store
            .update_remaining_time(&self.task_id, Duration::ZERO)
        {
            warn!(task_id = %self.task_id, error = %err, "failed to save expired timer");
        }
        self.engine.notify(DisplayEvent::Expired {
            task_id: self.task_id.clone(),
        });
        TickOutcome::Expired
    }
}
