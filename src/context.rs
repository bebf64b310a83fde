//! Task Runtime Context
//!
//! Per-attempt handle injected into executors: abort signal, progress
//! reporting, and the cooperative yield check against the frame budget.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::time::Instant;

use crate::model::TaskId;
use crate::scheduler::Inner;
use crate::signal::AbortSignal;

/// Shared view of the current frame's start time.
///
/// The dispatcher stamps it at the top of every tick; contexts read it so
/// `should_yield` always measures against the frame in progress.
#[derive(Debug)]
pub(crate) struct FrameClock {
    start: Mutex<Instant>,
}

impl FrameClock {
    pub fn new(start: Instant) -> Self {
        Self {
            start: Mutex::new(start),
        }
    }

    pub fn begin(&self, at: Instant) {
        *self.start.lock().unwrap() = at;
    }

    pub fn frame_start(&self) -> Instant {
        *self.start.lock().unwrap()
    }
}

/// Handle given to an executor for the duration of one attempt.
#[derive(Clone)]
pub struct TaskContext {
    task_id: TaskId,
    signal: AbortSignal,
    frame: Arc<FrameClock>,
    frame_budget: Duration,
    started_at: Instant,
    scheduler: Weak<Inner>,
}

impl TaskContext {
    pub(crate) fn new(
        task_id: TaskId,
        signal: AbortSignal,
        frame: Arc<FrameClock>,
        frame_budget: Duration,
        started_at: Instant,
        scheduler: Weak<Inner>,
    ) -> Self {
        Self {
            task_id,
            signal,
            frame,
            frame_budget,
            started_at,
            scheduler,
        }
    }

    /// Context not attached to any scheduler; progress reports are dropped.
    #[cfg(test)]
    pub(crate) fn detached(task_id: impl Into<TaskId>) -> Self {
        Self::new(
            task_id.into(),
            AbortSignal::new(),
            Arc::new(FrameClock::new(Instant::now())),
            Duration::from_millis(16),
            Instant::now(),
            Weak::new(),
        )
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Cooperative abort signal for this attempt
    #[must_use]
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// When this attempt was dispatched
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// True once the current frame has spent its time budget.
    ///
    /// Executors consult this to voluntarily break long loops; the scheduler
    /// itself never acts on it.
    #[must_use]
    pub fn should_yield(&self) -> bool {
        self.frame.frame_start().elapsed() >= self.frame_budget
    }

    /// Record progress for this task.
    ///
    /// Updates the task record, emits a progress event, and invokes the
    /// task's own progress callback, if any. Monotonicity is the caller's
    /// contract and is not enforced.
    pub fn report_progress(&self, value: f64) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.report_progress(&self.task_id, value);
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task_id", &self.task_id)
            .field("aborted", &self.signal.is_aborted())
            .finish()
    }
}
