//! Task and output configuration

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{DrawConfig, OutputConfig, Surface};

/// How a task derives its effective [`OutputConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigMethod {
    /// Use the graph's root config.
    #[default]
    Parent,
    /// Use the resolved config of the task's output-chain predecessor,
    /// falling back to `Parent` when there is none.
    Input,
    /// Use the task's own config verbatim.
    Absolute,
}

/// Output and draw settings of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    pub output: OutputConfig,
    pub draw: DrawConfig,
}

impl TaskConfig {
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            draw: DrawConfig::default(),
        }
    }

    pub fn with_draw(mut self, draw: DrawConfig) -> Self {
        self.draw = draw;
        self
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new(OutputConfig::invalid())
    }
}

/// A named output declared on a graph.
#[derive(Debug, Clone, Default)]
pub struct OutputEntry {
    pub config: OutputConfig,
    pub config_method: ConfigMethod,
    pub surface: Option<Arc<Surface>>,
}

impl OutputEntry {
    pub fn new(config: OutputConfig, config_method: ConfigMethod) -> Self {
        Self {
            config,
            config_method,
            surface: None,
        }
    }
}

/// Remaps symbolic parameter names of one category to concrete shader names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterNameMap {
    names: HashMap<String, String>,
}

impl ParameterNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbolic: impl Into<String>, concrete: impl Into<String>) -> Self {
        self.insert(symbolic, concrete);
        self
    }

    pub fn insert(&mut self, symbolic: impl Into<String>, concrete: impl Into<String>) {
        self.names.insert(symbolic.into(), concrete.into());
    }

    pub fn get(&self, symbolic: &str) -> Option<&str> {
        self.names.get(symbolic).map(String::as_str)
    }

    /// Concrete name for `symbolic`, or `symbolic` itself when unmapped.
    pub fn get_or_default<'a>(&'a self, symbolic: &'a str) -> &'a str {
        self.get(symbolic).unwrap_or(symbolic)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
