//! Task Model
//!
//! Core data structures for task management.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::TaskFailure;
use crate::executor::ExecutorFn;
use crate::signal::AbortSignal;

/// Task identifier, unique within a scheduler instance.
///
/// Client-supplied via [`TaskSpec::with_id`], otherwise generated.
pub type TaskId = String;

/// Scheduling priority with total order `Low < Normal < High`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting for dependencies, a free dispatch slot, or a retry delay
    Pending,
    /// An attempt is currently executing
    Running,
    /// Completed successfully
    Completed,
    /// Failed after exhausting retries, timing out, or losing a dependency
    Failed,
    /// Cancelled via `cancel_task`
    Cancelled,
}

impl TaskStatus {
    /// Check if the status is terminal; terminal statuses are sticky.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Check if the task may still be dispatched
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }
}

/// Delay policy between a failed attempt and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RetryStrategy {
    /// Re-queue with no delay
    Immediate,
    /// Wait the base delay between every pair of attempts
    #[default]
    Fixed,
    /// Wait `base * 2^(attempts - 1)`, saturating; successive delays are
    /// strictly increasing
    Exponential,
}

impl RetryStrategy {
    /// Delay before the attempt following attempt number `attempts` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempts: u32, base: Duration) -> Duration {
        match self {
            RetryStrategy::Immediate => Duration::ZERO,
            RetryStrategy::Fixed => base,
            RetryStrategy::Exponential => {
                let exp = attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exp)
            }
        }
    }
}

/// Per-task progress callback
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Descriptor accepted by `add_task`
pub struct TaskSpec {
    /// Client-supplied id; generated when absent
    pub id: Option<TaskId>,
    /// Tag selecting a registered executor
    pub task_type: String,
    /// Opaque payload handed to the executor
    pub data: Value,
    /// Requested priority; may be raised (never lowered) by inheritance
    pub priority: TaskPriority,
    /// Ids of tasks that must complete before this one becomes ready
    pub dependencies: Vec<TaskId>,
    /// Additional attempts allowed after the first failure
    pub retry_count: u32,
    /// Delay policy between attempts
    pub retry_strategy: RetryStrategy,
    /// Per-attempt wall-clock limit
    pub timeout: Option<Duration>,
    /// Whether `cancel_task` may interrupt a running attempt
    pub interruptible: bool,
    /// Progress callback invoked alongside the progress event
    pub on_progress: Option<ProgressFn>,
}

impl TaskSpec {
    /// Create a descriptor for the given task type with defaults
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            id: None,
            task_type: task_type.into(),
            data: Value::Null,
            priority: TaskPriority::Normal,
            dependencies: Vec::new(),
            retry_count: 0,
            retry_strategy: RetryStrategy::Fixed,
            timeout: None,
            interruptible: true,
            on_progress: None,
        }
    }

    /// Builder: set an explicit task id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: set the payload
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Builder: set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: add a dependency
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<TaskId>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Builder: add several dependencies
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Builder: allow `count` retries with the given delay strategy
    #[must_use]
    pub fn with_retries(mut self, count: u32, strategy: RetryStrategy) -> Self {
        self.retry_count = count;
        self.retry_strategy = strategy;
        self
    }

    /// Builder: set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: control whether a running attempt can be cancelled
    #[must_use]
    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Builder: set the progress callback
    pub fn with_on_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// Registry-owned record for a submitted task.
///
/// Lives as a node weight in the dependency graph from `add_task` until the
/// retention sweeper or `clear` removes it.
pub(crate) struct TaskRecord {
    pub id: TaskId,
    pub task_type: String,
    pub data: Value,
    pub original_priority: TaskPriority,
    /// Only ever raised, never lowered; `>= original_priority` at all times
    pub effective_priority: TaskPriority,
    pub retry_count: u32,
    pub retry_strategy: RetryStrategy,
    pub timeout: Option<Duration>,
    pub interruptible: bool,
    pub on_progress: Option<ProgressFn>,
    /// Executor bound at insertion time
    pub executor: ExecutorFn,
    pub status: TaskStatus,
    pub attempts: u32,
    pub progress: Option<f64>,
    pub result: Option<Value>,
    pub error: Option<TaskFailure>,
    /// Insertion sequence; breaks priority ties deterministically
    pub seq: u64,
    /// Run epoch; settle paths and retry timers compare it to discard stale work
    pub epoch: u64,
    /// Whether a fresh entry for this task sits in the ready queue
    pub in_ready: bool,
    /// Abort signal of the in-flight attempt
    pub signal: Option<AbortSignal>,
    pub created_at: DateTime<Utc>,
    pub enqueued_at: Instant,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl TaskRecord {
    pub fn from_spec(id: TaskId, spec: TaskSpec, executor: ExecutorFn, seq: u64, epoch: u64) -> Self {
        Self {
            id,
            task_type: spec.task_type,
            data: spec.data,
            original_priority: spec.priority,
            effective_priority: spec.priority,
            retry_count: spec.retry_count,
            retry_strategy: spec.retry_strategy,
            timeout: spec.timeout,
            interruptible: spec.interruptible,
            on_progress: spec.on_progress,
            executor,
            status: TaskStatus::Pending,
            attempts: 0,
            progress: None,
            result: None,
            error: None,
            seq,
            epoch,
            in_ready: false,
            signal: None,
            created_at: Utc::now(),
            enqueued_at: Instant::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn snapshot(&self, dependencies: Vec<TaskId>) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            task_type: self.task_type.clone(),
            status: self.status,
            original_priority: self.original_priority,
            effective_priority: self.effective_priority,
            attempts: self.attempts,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            dependencies,
            interruptible: self.interruptible,
            created_at: self.created_at,
            enqueued_at: self.enqueued_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Point-in-time view of a task, for introspection
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub task_type: String,
    pub status: TaskStatus,
    pub original_priority: TaskPriority,
    pub effective_priority: TaskPriority,
    pub attempts: u32,
    pub progress: Option<f64>,
    pub result: Option<Value>,
    pub error: Option<TaskFailure>,
    pub dependencies: Vec<TaskId>,
    pub interruptible: bool,
    pub created_at: DateTime<Utc>,
    /// Monotonic insertion time
    pub enqueued_at: Instant,
    /// Monotonic dispatch time of the latest attempt
    pub started_at: Option<Instant>,
    /// Monotonic terminal-transition time
    pub finished_at: Option<Instant>,
}
