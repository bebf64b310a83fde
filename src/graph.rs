//! Dependency Graph
//!
//! Registry of task records arranged as a DAG using petgraph. Edges run from
//! dependency to dependent; cycles are rejected when edges are linked, so
//! dispatch never encounters one. Also hosts the transitive
//! priority-inheritance walk.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::SchedulerError;
use crate::model::{TaskId, TaskPriority, TaskRecord, TaskStatus};

/// Task registry and dependency DAG.
///
/// A stable graph keeps node indices valid across sweeper removals.
#[derive(Default)]
pub(crate) struct TaskGraph {
    graph: StableDiGraph<TaskRecord, ()>,
    index: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn insert(&mut self, record: TaskRecord) {
        let id = record.id.clone();
        let node = self.graph.add_node(record);
        self.index.insert(id, node);
    }

    pub fn remove(&mut self, id: &str) -> Option<TaskRecord> {
        let node = self.index.remove(id)?;
        self.graph.remove_node(node)
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskRecord> {
        self.index
            .get(id)
            .and_then(|&node| self.graph.node_weight(node))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        let node = *self.index.get(id)?;
        self.graph.node_weight_mut(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.graph.node_weights()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaskRecord> {
        self.graph.node_weights_mut()
    }

    /// Link `dependent` to each of its dependencies.
    ///
    /// All ids must already be registered. An edge whose addition would close
    /// a cycle is removed again and the insertion rejected.
    pub fn link_dependencies(
        &mut self,
        dependent: &TaskId,
        dependencies: &[TaskId],
    ) -> Result<(), SchedulerError> {
        for dep in dependencies {
            let (Some(&from), Some(&to)) = (self.index.get(dep), self.index.get(dependent)) else {
                return Err(SchedulerError::UnknownDependency {
                    task_id: dependent.clone(),
                    dep_id: dep.clone(),
                });
            };

            self.graph.add_edge(from, to, ());
            if self.has_cycle() {
                if let Some(edge) = self.graph.find_edge(from, to) {
                    self.graph.remove_edge(edge);
                }
                return Err(SchedulerError::CircularDependency {
                    cycle: vec![dep.clone(), dependent.clone()],
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        toposort(&self.graph, None).is_err()
    }

    /// Direct dependencies of a task (tasks that must complete before it)
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependents of a task (tasks waiting on it)
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<TaskId> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(node, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                self.graph.node_weight(other).map(|record| record.id.clone())
            })
            .collect()
    }

    /// Check if every dependency of a task has completed.
    ///
    /// Swept dependencies drop their edges, so only the remaining ones count;
    /// a failed dependency can never linger here because failure cascades
    /// eagerly.
    #[must_use]
    pub fn dependencies_satisfied(&self, id: &str) -> bool {
        let Some(&node) = self.index.get(id) else {
            return false;
        };
        self.graph
            .edges_directed(node, Direction::Incoming)
            .all(|edge| {
                self.graph
                    .node_weight(edge.source())
                    .is_some_and(|record| record.status == TaskStatus::Completed)
            })
    }

    /// Raise the effective priority of every ancestor below `floor`.
    ///
    /// Walks dependency edges transitively, skipping terminal ancestors and
    /// pruning where the floor is already met; priorities only rise and the
    /// graph is acyclic, so the walk is bounded by O(V + E).
    pub fn raise_priority(
        &mut self,
        roots: &[TaskId],
        floor: TaskPriority,
    ) -> Vec<(TaskId, TaskPriority)> {
        let mut raised = Vec::new();
        let mut stack: Vec<TaskId> = roots.to_vec();

        while let Some(id) = stack.pop() {
            let Some(record) = self.get_mut(&id) else {
                continue;
            };
            if record.status.is_terminal() || record.effective_priority >= floor {
                continue;
            }
            record.effective_priority = floor;
            raised.push((id.clone(), floor));
            stack.extend(self.dependencies(&id));
        }

        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorFn;
    use crate::model::{TaskPriority, TaskSpec};
    use serde_json::Value;
    use std::sync::Arc;

    fn noop_executor() -> ExecutorFn {
        Arc::new(|_data, _ctx| Box::pin(async { Ok(Value::Null) }))
    }

    fn record(id: &str, priority: TaskPriority, seq: u64) -> TaskRecord {
        let spec = TaskSpec::new("noop").with_priority(priority);
        TaskRecord::from_spec(id.to_string(), spec, noop_executor(), seq, seq)
    }

    fn graph_of(ids: &[&str]) -> TaskGraph {
        let mut graph = TaskGraph::default();
        for (i, id) in ids.iter().enumerate() {
            graph.insert(record(id, TaskPriority::Normal, i as u64));
        }
        graph
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut graph = graph_of(&["a"]);
        assert_eq!(graph.len(), 1);
        assert!(graph.contains("a"));
        assert!(graph.get("a").is_some());
        assert!(graph.remove("a").is_some());
        assert!(!graph.contains("a"));
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let mut graph = graph_of(&["a", "b"]);
        graph
            .link_dependencies(&"b".to_string(), &["a".to_string()])
            .unwrap();

        assert_eq!(graph.dependencies("b"), vec!["a".to_string()]);
        assert_eq!(graph.dependents("a"), vec!["b".to_string()]);
        assert!(graph.dependencies("a").is_empty());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = graph_of(&["a", "b"]);
        graph
            .link_dependencies(&"b".to_string(), &["a".to_string()])
            .unwrap();

        let result = graph.link_dependencies(&"a".to_string(), &["b".to_string()]);
        assert!(matches!(
            result,
            Err(SchedulerError::CircularDependency { .. })
        ));
        // The offending edge was rolled back.
        assert!(!graph.has_cycle());
        assert!(graph.dependencies("a").is_empty());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let mut graph = graph_of(&["a"]);
        let result = graph.link_dependencies(&"a".to_string(), &["ghost".to_string()]);
        assert!(matches!(
            result,
            Err(SchedulerError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_dependencies_satisfied() {
        let mut graph = graph_of(&["a", "b"]);
        graph
            .link_dependencies(&"b".to_string(), &["a".to_string()])
            .unwrap();

        assert!(graph.dependencies_satisfied("a"));
        assert!(!graph.dependencies_satisfied("b"));

        graph.get_mut("a").unwrap().status = TaskStatus::Completed;
        assert!(graph.dependencies_satisfied("b"));
    }

    #[test]
    fn test_raise_priority_walks_transitively() {
        // c depends on b depends on a, all Low.
        let mut graph = TaskGraph::default();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            graph.insert(record(id, TaskPriority::Low, i as u64));
        }
        graph
            .link_dependencies(&"b".to_string(), &["a".to_string()])
            .unwrap();
        graph
            .link_dependencies(&"c".to_string(), &["b".to_string()])
            .unwrap();

        let raised = graph.raise_priority(&["b".to_string()], TaskPriority::High);
        assert_eq!(raised.len(), 2);
        assert_eq!(
            graph.get("a").unwrap().effective_priority,
            TaskPriority::High
        );
        assert_eq!(
            graph.get("b").unwrap().effective_priority,
            TaskPriority::High
        );
        // Originals are untouched.
        assert_eq!(graph.get("a").unwrap().original_priority, TaskPriority::Low);
    }

    #[test]
    fn test_raise_priority_skips_terminal_ancestors() {
        let mut graph = TaskGraph::default();
        graph.insert(record("done", TaskPriority::Low, 0));
        graph.insert(record("next", TaskPriority::Low, 1));
        graph
            .link_dependencies(&"next".to_string(), &["done".to_string()])
            .unwrap();
        graph.get_mut("done").unwrap().status = TaskStatus::Completed;

        let raised = graph.raise_priority(&["done".to_string()], TaskPriority::High);
        assert!(raised.is_empty());
        assert_eq!(
            graph.get("done").unwrap().effective_priority,
            TaskPriority::Low
        );
    }

    #[test]
    fn test_remove_keeps_other_indices_valid() {
        let mut graph = graph_of(&["a", "b", "c"]);
        graph.remove("a");
        assert_eq!(graph.get("b").unwrap().id, "b");
        assert_eq!(graph.get("c").unwrap().id, "c");
    }
}
