//! Task dependency graph with deterministic topological ordering.

use crate::errors::{CycleDetectedError, GraphError};
use std::collections::{HashMap, HashSet};

/// DFS marks: unvisited nodes are simply absent from the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// A directed graph of named tasks and the tasks they depend on.
///
/// Tasks keep their first insertion position; the order returned by
/// [`DependencyGraph::get_task_order`] is a deterministic function of
/// insertion order and declared dependency order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with the given dependencies.
    ///
    /// Re-adding a task replaces its dependency list. Repeated entries in
    /// `dependencies` are collapsed, keeping the first occurrence.
    pub fn add_task<I, S>(&mut self, name: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut seen = HashSet::new();
        let deps: Vec<String> = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|dep: &String| seen.insert(dep.clone()))
            .collect();

        if !self.dependencies.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.dependencies.insert(name, deps);
    }

    /// Removes a task and every edge pointing at it.
    ///
    /// Returns false if the task was not registered.
    pub fn remove_task(&mut self, name: &str) -> bool {
        if self.dependencies.remove(name).is_none() {
            return false;
        }
        self.order.retain(|task| task != name);
        for deps in self.dependencies.values_mut() {
            deps.retain(|dep| dep != name);
        }
        true
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns task names in insertion order.
    #[must_use]
    pub fn tasks(&self) -> &[String] {
        &self.order
    }

    /// Returns the direct dependencies of `name` (empty if unknown).
    #[must_use]
    pub fn get_task_dependencies(&self, name: &str) -> HashSet<String> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the tasks that depend directly on `name`.
    #[must_use]
    pub fn get_task_dependents(&self, name: &str) -> HashSet<String> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.iter().any(|dep| dep == name))
            .map(|(task, _)| task.clone())
            .collect()
    }

    /// Returns every task ordered so that dependencies come first.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] with the offending path if the graph is
    /// cyclic, and [`GraphError::UnknownDependency`] if a task depends on a
    /// name that was never added. No partial order is returned.
    pub fn get_task_order(&self) -> Result<Vec<String>, GraphError> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.order.len());
        let mut result = Vec::with_capacity(self.order.len());

        for task in &self.order {
            self.visit(task, &mut marks, &mut result)?;
        }
        Ok(result)
    }

    /// Depth-first post-order walk from `root` using an explicit stack of
    /// `(task, next dependency index)` frames. The stack doubles as the
    /// current path for cycle reporting.
    fn visit<'a>(
        &'a self,
        root: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        result: &mut Vec<String>,
    ) -> Result<(), GraphError> {
        if marks.contains_key(root) {
            return Ok(());
        }
        marks.insert(root, Mark::Visiting);
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (task, next) = *frame;
            let deps = self.dependencies.get(task).map_or(&[][..], Vec::as_slice);

            let Some(dep) = deps.get(next) else {
                stack.pop();
                marks.insert(task, Mark::Done);
                result.push(task.to_string());
                continue;
            };
            frame.1 += 1;

            if !self.dependencies.contains_key(dep) {
                return Err(GraphError::UnknownDependency {
                    task: task.to_string(),
                    dependency: dep.clone(),
                });
            }
            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|(t, _)| *t == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(t, _)| (*t).to_string()).collect();
                    cycle.push(dep.clone());
                    return Err(CycleDetectedError::new(cycle).into());
                }
                None => {
                    marks.insert(dep.as_str(), Mark::Visiting);
                    stack.push((dep.as_str(), 0));
                }
            }
        }
        Ok(())
    }
}
