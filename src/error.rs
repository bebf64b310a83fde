//! Cadence Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.

use thiserror::Error;

use crate::model::TaskId;

/// Validation errors raised synchronously by [`FrameScheduler::add_task`].
///
/// Nothing is mutated when one of these is returned.
///
/// [`FrameScheduler::add_task`]: crate::scheduler::FrameScheduler::add_task
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Queue size limit reached (limit: {limit})")]
    QueueFull { limit: usize },

    #[error("Task '{id}' already exists")]
    DuplicateId { id: TaskId },

    #[error("Unknown dependency '{dep_id}' for task '{task_id}'")]
    UnknownDependency { task_id: TaskId, dep_id: TaskId },

    #[error("Circular dependency detected: {cycle:?}")]
    CircularDependency { cycle: Vec<TaskId> },

    #[error("No executor registered for task type '{task_type}'")]
    NoExecutor { task_type: String },
}

/// Why a task reached a failure or cancellation terminal state.
///
/// Execution errors are never returned to the caller; they materialize as the
/// task's terminal status and ride on [`TaskEvent::Failed`] /
/// [`TaskEvent::Cancelled`].
///
/// [`TaskEvent::Failed`]: crate::events::TaskEvent::Failed
/// [`TaskEvent::Cancelled`]: crate::events::TaskEvent::Cancelled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The executor returned or threw an error.
    #[error("{message}")]
    Executor { message: String },

    /// The per-attempt timeout elapsed before the executor settled.
    #[error("Task timeout")]
    Timeout,

    /// The task was cancelled via `cancel_task`.
    #[error("Task cancelled")]
    Cancelled,

    /// A dependency terminated in a failed or cancelled state.
    #[error("Dependency '{dep_id}' failed")]
    DependencyFailed { dep_id: TaskId },
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
