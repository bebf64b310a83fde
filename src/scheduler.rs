//! Frame Scheduler
//!
//! Cooperative, priority-aware dispatcher. Tasks are ordered by effective
//! priority and a dependency DAG, dispatched on a recurring frame tick under
//! a concurrency cap and a per-frame time budget, and carried through
//! retries, timeouts, cancellation, and retention cleanup.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::context::{FrameClock, TaskContext};
use crate::error::{Result, SchedulerError, TaskFailure};
use crate::events::{EventBus, ListenerId, TaskEvent, TaskEventKind};
use crate::executor::{ExecutorError, ExecutorFn, ExecutorRegistry};
use crate::graph::TaskGraph;
use crate::model::{TaskId, TaskRecord, TaskSnapshot, TaskSpec, TaskStatus};
use crate::queue::ReadyQueue;
use crate::signal::AbortSignal;

const TIMEOUT_REASON: &str = "Task timeout";
const CANCEL_REASON: &str = "Task cancelled";
const CLEAR_REASON: &str = "Scheduler cleared";

/// Per-status task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Cooperative frame-paced task scheduler.
///
/// Cheap to clone; every clone is a handle onto the same instance. All state
/// mutations happen behind one lock, and events are emitted only after it is
/// released, so listeners may reentrantly call back into the scheduler.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Arc<Inner>,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: config.normalized(),
                state: Mutex::new(State::default()),
                events: EventBus::default(),
                frame: Arc::new(FrameClock::new(Instant::now())),
                loops: Mutex::new(LoopHandles::default()),
            }),
        }
    }

    /// Register the executor for a task type, replacing any prior mapping.
    ///
    /// Tasks bind their executor at insertion, so re-registering affects
    /// tasks added afterwards.
    pub fn register_executor<F, Fut>(&self, task_type: impl Into<String>, executor: F)
    where
        F: Fn(Value, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, ExecutorError>> + Send + 'static,
    {
        let mut state = self.inner.state.lock().unwrap();
        state.executors.register(task_type, executor);
    }

    /// Submit a task and return its id.
    ///
    /// Validation happens synchronously, in order: queue limit, duplicate id,
    /// missing executor, unknown dependency, dependency cycle. Nothing is
    /// mutated when an error is returned.
    pub fn add_task(&self, spec: TaskSpec) -> Result<TaskId> {
        let mut events = Vec::new();
        let id = {
            let mut state = self.inner.state.lock().unwrap();

            if let Some(limit) = self.inner.config.queue_size_limit {
                if state.graph.len() >= limit {
                    return Err(SchedulerError::QueueFull { limit });
                }
            }

            let id = spec
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            if state.graph.contains(&id) {
                return Err(SchedulerError::DuplicateId { id });
            }
            let Some(executor) = state.executors.get(&spec.task_type) else {
                return Err(SchedulerError::NoExecutor {
                    task_type: spec.task_type,
                });
            };
            for dep in &spec.dependencies {
                if !state.graph.contains(dep) {
                    return Err(SchedulerError::UnknownDependency {
                        task_id: id.clone(),
                        dep_id: dep.clone(),
                    });
                }
            }

            let deps = spec.dependencies.clone();
            let priority = spec.priority;
            let State {
                graph,
                ready,
                seq,
                epoch,
                ..
            } = &mut *state;
            *seq += 1;
            *epoch += 1;
            graph.insert(TaskRecord::from_spec(id.clone(), spec, executor, *seq, *epoch));
            if let Err(error) = graph.link_dependencies(&id, &deps) {
                graph.remove(&id);
                return Err(error);
            }

            // Ancestors inherit the new task's priority, transitively.
            let raised = graph.raise_priority(&deps, priority);
            for (raised_id, new_priority) in &raised {
                if let Some(record) = graph.get(raised_id) {
                    if record.status == TaskStatus::Pending && record.in_ready {
                        ready.push(*new_priority, record.seq, raised_id.clone());
                    }
                }
            }
            if !raised.is_empty() {
                debug!(task_id = %id, count = raised.len(), "raised ancestor priorities");
            }

            events.push(TaskEvent::Added { id: id.clone() });

            let failed_dep = deps
                .iter()
                .find(|dep| {
                    graph.get(dep).is_some_and(|record| {
                        matches!(record.status, TaskStatus::Failed | TaskStatus::Cancelled)
                    })
                })
                .cloned();
            if let Some(dep_id) = failed_dep {
                // The dependency already terminated badly; the task never runs.
                let failure = TaskFailure::DependencyFailed { dep_id };
                if let Some(record) = graph.get_mut(&id) {
                    record.status = TaskStatus::Failed;
                    record.error = Some(failure.clone());
                    record.finished_at = Some(Instant::now());
                }
                events.push(TaskEvent::Failed {
                    id: id.clone(),
                    error: failure,
                });
            } else if graph.dependencies_satisfied(&id) {
                if let Some(record) = graph.get_mut(&id) {
                    record.in_ready = true;
                    ready.push(record.effective_priority, record.seq, id.clone());
                }
            }

            debug!(task_id = %id, "task added");
            id
        };
        self.inner.emit_all(events);
        Ok(id)
    }

    /// Cancel a task.
    ///
    /// Pending tasks are cancelled unconditionally. A running task is
    /// cancelled only if interruptible: its status flips immediately, its
    /// abort signal trips, and whatever the executor eventually resolves to
    /// is discarded. A running non-interruptible task ignores the request and
    /// runs to completion. Returns whether the task was cancelled.
    pub fn cancel_task(&self, id: &str) -> bool {
        let mut events = Vec::new();
        let cancelled = {
            let mut state = self.inner.state.lock().unwrap();
            let State {
                graph,
                running,
                epoch,
                ..
            } = &mut *state;
            let Some(record) = graph.get_mut(id) else {
                return false;
            };
            match record.status {
                TaskStatus::Pending => {
                    record.status = TaskStatus::Cancelled;
                    record.error = Some(TaskFailure::Cancelled);
                    record.finished_at = Some(Instant::now());
                    record.in_ready = false;
                    *epoch += 1;
                    record.epoch = *epoch;
                    events.push(TaskEvent::Cancelled { id: id.to_string() });
                    cascade_failure(graph, id, &mut events);
                    true
                }
                TaskStatus::Running if record.interruptible => {
                    record.status = TaskStatus::Cancelled;
                    record.error = Some(TaskFailure::Cancelled);
                    record.finished_at = Some(Instant::now());
                    *running -= 1;
                    *epoch += 1;
                    record.epoch = *epoch;
                    if let Some(signal) = record.signal.take() {
                        signal.abort(CANCEL_REASON);
                    }
                    events.push(TaskEvent::Cancelled { id: id.to_string() });
                    cascade_failure(graph, id, &mut events);
                    true
                }
                TaskStatus::Running => {
                    trace!(task_id = %id, "cancel ignored for non-interruptible running task");
                    false
                }
                _ => false,
            }
        };
        self.inner.emit_all(events);
        if cancelled {
            debug!(task_id = %id, "task cancelled");
        }
        cancelled
    }

    /// Current status, or `None` once the task has been swept or cleared.
    #[must_use]
    pub fn task_status(&self, id: &str) -> Option<TaskStatus> {
        let state = self.inner.state.lock().unwrap();
        state.graph.get(id).map(|record| record.status)
    }

    /// Point-in-time view of a task
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<TaskSnapshot> {
        let state = self.inner.state.lock().unwrap();
        let record = state.graph.get(id)?;
        Some(record.snapshot(state.graph.dependencies(id)))
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock().unwrap();
        let mut stats = SchedulerStats::default();
        for record in state.graph.iter() {
            stats.total += 1;
            match record.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Subscribe to one class of lifecycle events
    pub fn on<F>(&self, kind: TaskEventKind, listener: F) -> ListenerId
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, listener)
    }

    /// Unsubscribe; returns whether the listener was registered
    pub fn off(&self, kind: TaskEventKind, id: ListenerId) -> bool {
        self.inner.events.off(kind, id)
    }

    /// Arm the frame loop and the retention sweeper.
    ///
    /// Idempotent. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut loops = self.inner.loops.lock().unwrap();
        if loops.frame.is_some() {
            return;
        }

        let frame_interval = self.inner.config.frame_interval;
        let scheduler = Arc::downgrade(&self.inner);
        loops.frame = Some(tokio::spawn(async move {
            let mut ticker = time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                scheduler.run_frame();
            }
        }));

        let sweep_interval = self.inner.config.sweep_interval;
        let scheduler = Arc::downgrade(&self.inner);
        loops.sweeper = Some(tokio::spawn(async move {
            let mut ticker = time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(scheduler) = scheduler.upgrade() else {
                    break;
                };
                scheduler.sweep();
            }
        }));
        debug!("scheduler started");
    }

    /// Disarm the frame loop and sweeper. Running attempts are unaffected.
    pub fn stop(&self) {
        let mut loops = self.inner.loops.lock().unwrap();
        if let Some(handle) = loops.frame.take() {
            handle.abort();
        }
        if let Some(handle) = loops.sweeper.take() {
            handle.abort();
        }
        debug!("scheduler stopped");
    }

    /// Gate dispatch without stopping the frame loop
    pub fn pause(&self) {
        self.inner.state.lock().unwrap().paused = true;
    }

    /// Lift the dispatch gate; ready tasks resume on the next frame
    pub fn resume(&self) {
        self.inner.state.lock().unwrap().paused = false;
    }

    /// Remove every task regardless of status.
    ///
    /// Signals of running tasks are aborted so in-flight attempts are
    /// discarded when they settle.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock().unwrap();
        for record in state.graph.iter_mut() {
            if let Some(signal) = record.signal.take() {
                signal.abort(CLEAR_REASON);
            }
        }
        state.graph.clear();
        state.ready.clear();
        state.running = 0;
        debug!("scheduler cleared");
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[derive(Default)]
struct LoopHandles {
    frame: Option<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    graph: TaskGraph,
    executors: ExecutorRegistry,
    ready: ReadyQueue,
    running: usize,
    paused: bool,
    /// Monotonic insertion counter; breaks priority ties
    seq: u64,
    /// Monotonic run-epoch counter; stale settles and timers compare it
    epoch: u64,
}

pub(crate) struct Inner {
    config: SchedulerConfig,
    state: Mutex<State>,
    events: EventBus,
    frame: Arc<FrameClock>,
    loops: Mutex<LoopHandles>,
}

/// Everything needed to launch one attempt outside the state lock
struct Dispatch {
    id: TaskId,
    epoch: u64,
    executor: ExecutorFn,
    data: Value,
    timeout: Option<Duration>,
    ctx: TaskContext,
}

enum AttemptOutcome {
    Completed(Value),
    Failed(String),
    TimedOut,
}

impl AttemptOutcome {
    fn from_result(result: std::result::Result<Value, ExecutorError>) -> Self {
        match result {
            Ok(value) => AttemptOutcome::Completed(value),
            Err(error) => AttemptOutcome::Failed(error.to_string()),
        }
    }
}

impl Inner {
    /// One frame tick: drain the ready queue up to the per-frame cap, the
    /// concurrency cap, and the time budget, then launch the popped tasks.
    ///
    /// The budget gates only dispatch; executors spanning many frames never
    /// consume it.
    fn run_frame(self: &Arc<Self>) {
        let frame_start = Instant::now();
        self.frame.begin(frame_start);

        let mut dispatches = Vec::new();
        let mut events = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let State {
                graph,
                ready,
                running,
                epoch,
                paused,
                ..
            } = &mut *state;
            if *paused {
                return;
            }

            while dispatches.len() < self.config.max_tasks_per_frame
                && *running < self.config.max_concurrent_tasks
                && frame_start.elapsed() < self.config.frame_time_budget
            {
                let Some(id) = ready.pop_where(|id, priority, seq| {
                    graph.get(id).is_some_and(|record| {
                        record.status == TaskStatus::Pending
                            && record.in_ready
                            && record.effective_priority == priority
                            && record.seq == seq
                    })
                }) else {
                    break;
                };
                let Some(record) = graph.get_mut(&id) else {
                    continue;
                };

                record.in_ready = false;
                record.status = TaskStatus::Running;
                record.attempts += 1;
                record.started_at = Some(Instant::now());
                *epoch += 1;
                record.epoch = *epoch;
                *running += 1;

                let signal = AbortSignal::new();
                record.signal = Some(signal.clone());
                let ctx = TaskContext::new(
                    id.clone(),
                    signal,
                    Arc::clone(&self.frame),
                    self.config.frame_time_budget,
                    Instant::now(),
                    Arc::downgrade(self),
                );

                events.push(TaskEvent::Started {
                    id: id.clone(),
                    attempt: record.attempts,
                });
                dispatches.push(Dispatch {
                    id,
                    epoch: record.epoch,
                    executor: record.executor.clone(),
                    data: record.data.clone(),
                    timeout: record.timeout,
                    ctx,
                });
            }
        }

        if !dispatches.is_empty() {
            trace!(count = dispatches.len(), "dispatching ready tasks");
        }
        self.emit_all(events);
        for dispatch in dispatches {
            self.spawn_attempt(dispatch);
        }
    }

    /// Drive one attempt to a settled outcome on its own tokio task.
    ///
    /// The timeout timer aborts the signal with the timeout reason and wins
    /// the race; an aborted executor that keeps running settles later and is
    /// discarded by the epoch check.
    fn spawn_attempt(self: &Arc<Self>, dispatch: Dispatch) {
        let Dispatch {
            id,
            epoch,
            executor,
            data,
            timeout,
            ctx,
        } = dispatch;
        let scheduler = Arc::downgrade(self);

        tokio::spawn(async move {
            let signal = ctx.signal().clone();
            let mut attempt = (executor)(data, ctx);
            let outcome = if let Some(limit) = timeout {
                tokio::select! {
                    result = &mut attempt => AttemptOutcome::from_result(result),
                    () = time::sleep(limit) => {
                        signal.abort(TIMEOUT_REASON);
                        AttemptOutcome::TimedOut
                    }
                }
            } else {
                AttemptOutcome::from_result(attempt.await)
            };

            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.settle_attempt(&id, epoch, outcome);
            }
        });
    }

    /// Apply the terminal transition (or schedule a retry) for one attempt.
    ///
    /// Resolutions arriving after cancel, clear, or sweep fail the
    /// status/epoch revalidation and are dropped.
    fn settle_attempt(self: &Arc<Self>, id: &TaskId, epoch: u64, outcome: AttemptOutcome) {
        let mut events = Vec::new();
        let mut retry: Option<(u64, Duration)> = None;
        {
            let mut state = self.state.lock().unwrap();
            let State {
                graph,
                ready,
                running,
                epoch: epoch_counter,
                ..
            } = &mut *state;
            let Some(record) = graph.get_mut(id) else {
                return;
            };
            if record.status != TaskStatus::Running || record.epoch != epoch {
                trace!(task_id = %id, "discarding stale attempt resolution");
                return;
            }

            *running -= 1;
            record.signal = None;
            *epoch_counter += 1;
            record.epoch = *epoch_counter;

            let outcome: std::result::Result<Value, TaskFailure> = match outcome {
                AttemptOutcome::Completed(value) => Ok(value),
                AttemptOutcome::Failed(message) => Err(TaskFailure::Executor { message }),
                AttemptOutcome::TimedOut => Err(TaskFailure::Timeout),
            };
            match outcome {
                Ok(value) => {
                    record.status = TaskStatus::Completed;
                    record.result = Some(value.clone());
                    record.finished_at = Some(Instant::now());
                    debug!(task_id = %id, "task completed");
                    events.push(TaskEvent::Completed {
                        id: id.clone(),
                        result: value,
                    });
                    promote_dependents(graph, ready, id);
                }
                Err(failure) => {
                    if record.attempts <= record.retry_count {
                        record.status = TaskStatus::Pending;
                        let delay = record
                            .retry_strategy
                            .delay_after(record.attempts, self.config.base_retry_delay);
                        debug!(
                            task_id = %id,
                            attempt = record.attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %failure,
                            "attempt failed, scheduling retry"
                        );
                        events.push(TaskEvent::Retry {
                            id: id.clone(),
                            attempt: record.attempts,
                            delay,
                        });
                        retry = Some((record.epoch, delay));
                    } else {
                        record.status = TaskStatus::Failed;
                        record.error = Some(failure.clone());
                        record.finished_at = Some(Instant::now());
                        debug!(task_id = %id, error = %failure, "task failed");
                        events.push(TaskEvent::Failed {
                            id: id.clone(),
                            error: failure,
                        });
                        cascade_failure(graph, id, &mut events);
                    }
                }
            }
        }

        self.emit_all(events);
        if let Some((epoch, delay)) = retry {
            self.schedule_retry(id.clone(), epoch, delay);
        }
    }

    /// Put a failed task back in the ready queue once its backoff elapses.
    fn schedule_retry(self: &Arc<Self>, id: TaskId, epoch: u64, delay: Duration) {
        let scheduler = Arc::downgrade(self);
        tokio::spawn(async move {
            time::sleep(delay).await;
            let Some(scheduler) = scheduler.upgrade() else {
                return;
            };
            let mut state = scheduler.state.lock().unwrap();
            let State { graph, ready, .. } = &mut *state;
            if let Some(record) = graph.get_mut(&id) {
                if record.status == TaskStatus::Pending
                    && record.epoch == epoch
                    && !record.in_ready
                {
                    record.in_ready = true;
                    ready.push(record.effective_priority, record.seq, id.clone());
                }
            }
        });
    }

    /// Record progress and fan it out to the event bus and the task's own
    /// callback.
    pub(crate) fn report_progress(&self, id: &str, value: f64) {
        let (event, callback) = {
            let mut state = self.state.lock().unwrap();
            let Some(record) = state.graph.get_mut(id) else {
                return;
            };
            if record.status != TaskStatus::Running {
                return;
            }
            record.progress = Some(value);
            (
                TaskEvent::Progress {
                    id: id.to_string(),
                    progress: value,
                },
                record.on_progress.clone(),
            )
        };
        self.events.emit(&event);
        if let Some(callback) = callback {
            callback(value);
        }
    }

    /// Drop terminal tasks older than the retention period.
    fn sweep(&self) {
        let retention = self.config.retention_period;
        let mut state = self.state.lock().unwrap();
        let expired: Vec<TaskId> = state
            .graph
            .iter()
            .filter(|record| {
                record.status.is_terminal()
                    && record.finished_at.is_some_and(|at| at.elapsed() > retention)
            })
            .map(|record| record.id.clone())
            .collect();
        for id in &expired {
            state.graph.remove(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired tasks");
        }
    }

    fn emit_all(&self, events: Vec<TaskEvent>) {
        for event in events {
            self.events.emit(&event);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(loops) = self.loops.get_mut() {
            if let Some(handle) = loops.frame.take() {
                handle.abort();
            }
            if let Some(handle) = loops.sweeper.take() {
                handle.abort();
            }
        }
    }
}

/// Move dependents whose last dependency just completed into the ready queue.
fn promote_dependents(graph: &mut TaskGraph, ready: &mut ReadyQueue, id: &str) {
    for dependent in graph.dependents(id) {
        if !graph.dependencies_satisfied(&dependent) {
            continue;
        }
        if let Some(record) = graph.get_mut(&dependent) {
            if record.status == TaskStatus::Pending && !record.in_ready {
                record.in_ready = true;
                ready.push(record.effective_priority, record.seq, dependent.clone());
            }
        }
    }
}

/// Fail every pending transitive dependent of a task that terminated in a
/// failed or cancelled state. Dependents never retry a dependency failure.
fn cascade_failure(graph: &mut TaskGraph, origin: &str, events: &mut Vec<TaskEvent>) {
    let mut stack: Vec<(TaskId, TaskId)> = graph
        .dependents(origin)
        .into_iter()
        .map(|dependent| (origin.to_string(), dependent))
        .collect();

    while let Some((dep_id, id)) = stack.pop() {
        let Some(record) = graph.get_mut(&id) else {
            continue;
        };
        if record.status != TaskStatus::Pending {
            continue;
        }

        let failure = TaskFailure::DependencyFailed { dep_id };
        record.status = TaskStatus::Failed;
        record.error = Some(failure.clone());
        record.finished_at = Some(Instant::now());
        record.in_ready = false;
        events.push(TaskEvent::Failed {
            id: id.clone(),
            error: failure,
        });

        for dependent in graph.dependents(&id) {
            stack.push((id.clone(), dependent));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskPriority;
    use serde_json::json;

    fn scheduler_with_noop(config: SchedulerConfig) -> FrameScheduler {
        let scheduler = FrameScheduler::new(config);
        scheduler.register_executor("noop", |_data, _ctx| async { Ok(Value::Null) });
        scheduler
    }

    #[test]
    fn test_queue_size_limit() {
        let scheduler = scheduler_with_noop(SchedulerConfig {
            queue_size_limit: Some(2),
            ..Default::default()
        });

        scheduler.add_task(TaskSpec::new("noop")).unwrap();
        scheduler.add_task(TaskSpec::new("noop")).unwrap();
        let err = scheduler.add_task(TaskSpec::new("noop")).unwrap_err();
        assert!(err.to_string().contains("Queue size limit reached"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        scheduler
            .add_task(TaskSpec::new("noop").with_id("once"))
            .unwrap();
        let err = scheduler
            .add_task(TaskSpec::new("noop").with_id("once"))
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_missing_executor_rejected() {
        let scheduler = FrameScheduler::default();
        let err = scheduler.add_task(TaskSpec::new("ghost")).unwrap_err();
        assert!(err.to_string().contains("No executor registered"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        let err = scheduler
            .add_task(TaskSpec::new("noop").with_dependency("ghost"))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownDependency { .. }));
        // Nothing was inserted.
        assert_eq!(scheduler.stats().total, 0);
    }

    #[test]
    fn test_cancel_pending_cascades_to_dependents() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        let a = scheduler
            .add_task(TaskSpec::new("noop").with_id("a"))
            .unwrap();
        let b = scheduler
            .add_task(TaskSpec::new("noop").with_id("b").with_dependency("a"))
            .unwrap();

        assert!(scheduler.cancel_task(&a));
        assert_eq!(scheduler.task_status(&a), Some(TaskStatus::Cancelled));
        assert_eq!(scheduler.task_status(&b), Some(TaskStatus::Failed));

        let snapshot = scheduler.snapshot(&b).unwrap();
        assert_eq!(
            snapshot.error,
            Some(TaskFailure::DependencyFailed { dep_id: a.clone() })
        );
        // Terminal statuses are sticky.
        assert!(!scheduler.cancel_task(&a));
        assert!(!scheduler.cancel_task(&b));
    }

    #[test]
    fn test_add_task_with_already_failed_dependency() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        scheduler
            .add_task(TaskSpec::new("noop").with_id("dead"))
            .unwrap();
        scheduler.cancel_task("dead");

        let id = scheduler
            .add_task(TaskSpec::new("noop").with_dependency("dead"))
            .unwrap();
        assert_eq!(scheduler.task_status(&id), Some(TaskStatus::Failed));
    }

    #[test]
    fn test_inheritance_raises_pending_ancestors() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        scheduler
            .add_task(
                TaskSpec::new("noop")
                    .with_id("ancestor")
                    .with_priority(TaskPriority::Low),
            )
            .unwrap();
        scheduler
            .add_task(
                TaskSpec::new("noop")
                    .with_id("leaf")
                    .with_priority(TaskPriority::High)
                    .with_dependency("ancestor"),
            )
            .unwrap();

        let snapshot = scheduler.snapshot("ancestor").unwrap();
        assert_eq!(snapshot.original_priority, TaskPriority::Low);
        assert_eq!(snapshot.effective_priority, TaskPriority::High);
    }

    #[test]
    fn test_stats_and_clear() {
        let scheduler = scheduler_with_noop(SchedulerConfig::default());
        let a = scheduler
            .add_task(TaskSpec::new("noop").with_data(json!(1)))
            .unwrap();
        scheduler.add_task(TaskSpec::new("noop")).unwrap();
        scheduler.cancel_task(&a);

        let stats = scheduler.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.cancelled, 1);

        scheduler.clear();
        assert_eq!(scheduler.stats(), SchedulerStats::default());
        assert!(scheduler.task_status(&a).is_none());
    }
}
