//! Cadence
//!
//! A cooperative, priority-aware task scheduler for event-loop hosts where
//! long-running work must be sliced against a per-frame time budget:
//! - Priority ordering with transitive priority inheritance across the
//!   dependency DAG
//! - A frame loop honoring a time budget, a per-frame dispatch cap, and a
//!   concurrency cap
//! - Cooperative cancellation, per-attempt timeouts, retries with backoff
//! - Lifecycle events, progress reporting, and retention cleanup
//!
//! ```no_run
//! use cadence::{FrameScheduler, SchedulerConfig, TaskSpec};
//! use serde_json::json;
//!
//! # async fn demo() -> cadence::Result<()> {
//! let scheduler = FrameScheduler::new(SchedulerConfig::default());
//! scheduler.register_executor("thumbnail", |data, _ctx| async move {
//!     Ok(json!({ "thumbnailed": data }))
//! });
//!
//! let id = scheduler.add_task(TaskSpec::new("thumbnail").with_data(json!({ "src": "a.png" })))?;
//! scheduler.start();
//! assert!(scheduler.task_status(&id).is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod model;
pub mod scheduler;
pub mod signal;

mod graph;
mod queue;

pub use config::SchedulerConfig;
pub use context::TaskContext;
pub use error::{Result, SchedulerError, TaskFailure};
pub use events::{ListenerId, TaskEvent, TaskEventKind};
pub use executor::{ExecutorError, ExecutorFn, ExecutorFuture};
pub use model::{
    ProgressFn, RetryStrategy, TaskId, TaskPriority, TaskSnapshot, TaskSpec, TaskStatus,
};
pub use scheduler::{FrameScheduler, SchedulerStats};
pub use signal::AbortSignal;
