//! Task registration table
//!
//! Each task the gateway accepts has an input schema, an output schema and two
//! pure producers used by the fallback resolver: a deterministic mock and a
//! conservative degraded placeholder.

pub mod builtin;

use aigate_kernel::ResultProducer;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use builtin::{ANALYZE, DEGRADED_NOTICE, GENERATE_QUESTION, SCORE, SUMMARIZE};

/// Schema id under which a task's input schema is registered.
pub fn input_schema_id(task: &str) -> String {
    format!("{task}/input")
}

/// Schema id under which a task's output schema is registered.
pub fn output_schema_id(task: &str) -> String {
    format!("{task}/output")
}

#[derive(Clone)]
pub struct TaskDefinition {
    pub name: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub mock: Arc<dyn ResultProducer>,
    pub degraded: Arc<dyn ResultProducer>,
}

impl std::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskDefinition {
    pub fn new(
        name: impl Into<String>,
        input_schema: Value,
        output_schema: Value,
        mock: Arc<dyn ResultProducer>,
        degraded: Arc<dyn ResultProducer>,
    ) -> Self {
        Self {
            name: name.into(),
            input_schema,
            output_schema,
            mock,
            degraded,
        }
    }
}

/// Tasks known to a gateway, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskDefinition>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `generate-question`, `score`, `summarize` and `analyze`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for definition in builtin::definitions() {
            registry.register(definition);
        }
        registry
    }

    /// Add or replace a task, returning the definition it replaced.
    pub fn register(&mut self, definition: TaskDefinition) -> Option<TaskDefinition> {
        self.tasks.insert(definition.name.clone(), definition)
    }

    pub fn get(&self, task: &str) -> Option<&TaskDefinition> {
        self.tasks.get(task)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.contains_key(task)
    }

    /// Task names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
