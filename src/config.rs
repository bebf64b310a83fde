//! Scheduler Configuration
//!
//! Tunables for the frame loop, concurrency caps, retries, and retention.

use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of new dispatches per frame tick
    pub max_tasks_per_frame: usize,
    /// Wall-clock budget a single tick may spend dispatching
    pub frame_time_budget: Duration,
    /// Maximum number of concurrently running tasks
    pub max_concurrent_tasks: usize,
    /// How long terminal tasks are retained before the sweeper removes them
    pub retention_period: Duration,
    /// Optional hard cap on the total number of tracked tasks
    pub queue_size_limit: Option<usize>,
    /// Base delay for the fixed and exponential retry strategies
    pub base_retry_delay: Duration,
    /// Period of the frame tick driving the dispatcher
    pub frame_interval: Duration,
    /// Period of the retention sweeper
    pub sweep_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 10,
            frame_time_budget: Duration::from_millis(16),
            max_concurrent_tasks: 5,
            retention_period: Duration::from_secs(60),
            queue_size_limit: None,
            base_retry_delay: Duration::from_millis(100),
            frame_interval: Duration::from_millis(16),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    /// Clamp the caps to their documented minimums.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_tasks_per_frame = self.max_tasks_per_frame.max(1);
        self.max_concurrent_tasks = self.max_concurrent_tasks.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_tasks_per_frame, 10);
        assert_eq!(config.frame_time_budget, Duration::from_millis(16));
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.retention_period, Duration::from_secs(60));
        assert!(config.queue_size_limit.is_none());
        assert_eq!(config.base_retry_delay, Duration::from_millis(100));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_normalized_clamps_minimums() {
        let config = SchedulerConfig {
            max_tasks_per_frame: 0,
            max_concurrent_tasks: 0,
            ..Default::default()
        };
        let config = config.normalized();
        assert_eq!(config.max_tasks_per_frame, 1);
        assert_eq!(config.max_concurrent_tasks, 1);
    }
}
