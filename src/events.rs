//! Lifecycle Events
//!
//! Synchronous fan-out of task lifecycle events to registered listeners.
//! Listeners run in registration order; a panicking listener is isolated and
//! logged, and never unwinds into the scheduler.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::TaskFailure;
use crate::model::TaskId;

/// Task lifecycle event.
///
/// Per task, events form the path `Added → (Started → Progress*)+ →
/// (Completed | Failed | Cancelled)`, with `Retry` strictly between two
/// `Started` entries.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task was accepted by `add_task`
    Added { id: TaskId },
    /// An attempt began executing
    Started { id: TaskId, attempt: u32 },
    /// The executor reported progress
    Progress { id: TaskId, progress: f64 },
    /// The task completed with a result
    Completed { id: TaskId, result: Value },
    /// The task reached the failed terminal state
    Failed { id: TaskId, error: TaskFailure },
    /// The task was cancelled
    Cancelled { id: TaskId },
    /// A failed attempt will be retried after a delay
    Retry {
        id: TaskId,
        attempt: u32,
        delay: Duration,
    },
}

impl TaskEvent {
    #[must_use]
    pub fn kind(&self) -> TaskEventKind {
        match self {
            TaskEvent::Added { .. } => TaskEventKind::Added,
            TaskEvent::Started { .. } => TaskEventKind::Started,
            TaskEvent::Progress { .. } => TaskEventKind::Progress,
            TaskEvent::Completed { .. } => TaskEventKind::Completed,
            TaskEvent::Failed { .. } => TaskEventKind::Failed,
            TaskEvent::Cancelled { .. } => TaskEventKind::Cancelled,
            TaskEvent::Retry { .. } => TaskEventKind::Retry,
        }
    }

    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        match self {
            TaskEvent::Added { id }
            | TaskEvent::Started { id, .. }
            | TaskEvent::Progress { id, .. }
            | TaskEvent::Completed { id, .. }
            | TaskEvent::Failed { id, .. }
            | TaskEvent::Cancelled { id }
            | TaskEvent::Retry { id, .. } => id,
        }
    }
}

/// Discriminant used to subscribe to one class of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEventKind {
    Added,
    Started,
    Progress,
    Completed,
    Failed,
    Cancelled,
    Retry,
}

impl TaskEventKind {
    /// Every event kind, in lifecycle order.
    pub const ALL: [TaskEventKind; 7] = [
        TaskEventKind::Added,
        TaskEventKind::Started,
        TaskEventKind::Progress,
        TaskEventKind::Completed,
        TaskEventKind::Failed,
        TaskEventKind::Cancelled,
        TaskEventKind::Retry,
    ];
}

/// Handle returned by `on`, used to unsubscribe via `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&TaskEvent) + Send + Sync>;

/// Listener registry with synchronous, ordered delivery.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<TaskEventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventBus {
    pub fn on<F>(&self, kind: TaskEventKind, listener: F) -> ListenerId
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock().unwrap();
        listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn off(&self, kind: TaskEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() < before
    }

    /// Deliver an event to every listener of its kind, in registration order.
    ///
    /// The registry lock is released before invocation so listeners may
    /// reentrantly subscribe or unsubscribe.
    pub fn emit(&self, event: &TaskEvent) {
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .get(&event.kind())
                .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(task_id = %event.task_id(), kind = ?event.kind(), "event listener panicked");
            }
        }
    }
}
