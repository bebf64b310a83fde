//! Executor Registry
//!
//! Maps a task type tag to the async function that performs the work.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::context::TaskContext;

/// Error type executors may return; wrapped into a task failure by the
/// scheduler.
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future produced by an executor for a single attempt.
pub type ExecutorFuture =
    Pin<Box<dyn Future<Output = std::result::Result<Value, ExecutorError>> + Send>>;

/// Boxed async function that executes one task attempt.
pub type ExecutorFn = Arc<dyn Fn(Value, TaskContext) -> ExecutorFuture + Send + Sync>;

/// One executor per task type; re-registering replaces the prior mapping.
#[derive(Default)]
pub(crate) struct ExecutorRegistry {
    map: HashMap<String, ExecutorFn>,
}

impl ExecutorRegistry {
    pub fn register<F, Fut>(&mut self, task_type: impl Into<String>, executor: F)
    where
        F: Fn(Value, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, ExecutorError>> + Send + 'static,
    {
        let executor: ExecutorFn = Arc::new(move |data, ctx| Box::pin(executor(data, ctx)));
        self.map.insert(task_type.into(), executor);
    }

    pub fn get(&self, task_type: &str) -> Option<ExecutorFn> {
        self.map.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.map.contains_key(task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ExecutorRegistry::default();
        assert!(!registry.contains("noop"));

        registry.register("noop", |_data, _ctx| async { Ok(Value::Null) });
        assert!(registry.contains("noop"));
        assert!(registry.get("noop").is_some());
        assert!(registry.get("other").is_none());
    }

    #[tokio::test]
    async fn test_reregister_replaces() {
        let mut registry = ExecutorRegistry::default();
        registry.register("echo", |_data, _ctx| async { Ok(json!("first")) });
        registry.register("echo", |data, _ctx| async move { Ok(data) });

        let executor = registry.get("echo").expect("registered");
        let ctx = TaskContext::detached("probe");
        let out = executor(json!("second"), ctx).await.expect("executes");
        assert_eq!(out, json!("second"));
    }
}
