//! Shader graph definition and execution

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{OutputConfig, Surface};
use crate::error::GraphError;

use super::config::{ConfigMethod, OutputEntry, ParameterNameMap};
use super::context::{create_output_surface, TaskContext};
use super::manager::GraphRuntime;
use super::task::{GraphTask, TaskId};

/// An ordered queue of tasks plus the named outputs they write to.
///
/// Tasks run in insertion order. [`execute_graph`](Graph::execute_graph)
/// first initializes every task, then executes and post-executes them one at
/// a time, assigning pooled surfaces to tasks that still lack an output.
pub struct Graph {
    output_config: OutputConfig,
    tasks: Vec<Box<dyn GraphTask>>,
    outputs: HashMap<String, OutputEntry>,
    parameter_names: HashMap<String, ParameterNameMap>,
    pub(crate) execution_in_progress: bool,
    pub(crate) type_name: Option<String>,
}

impl Graph {
    pub fn new(output_config: OutputConfig) -> Self {
        Self {
            output_config,
            tasks: Vec::new(),
            outputs: HashMap::new(),
            parameter_names: HashMap::new(),
            execution_in_progress: false,
            type_name: None,
        }
    }

    pub fn output_config(&self) -> &OutputConfig {
        &self.output_config
    }

    pub fn set_output_config(&mut self, config: OutputConfig) {
        self.output_config = config;
    }

    /// Name of the [`GraphType`](super::GraphType) this graph was built from
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn has_valid_dimension(&self) -> bool {
        self.output_config.is_valid()
    }

    pub fn is_execution_in_progress(&self) -> bool {
        self.execution_in_progress
    }

    /// Append a task to the queue.
    pub fn add_task<T: GraphTask + 'static>(&mut self, task: T) -> Result<TaskId, GraphError> {
        self.add_boxed_task(Box::new(task))
    }

    pub fn add_boxed_task(&mut self, mut task: Box<dyn GraphTask>) -> Result<TaskId, GraphError> {
        if self.execution_in_progress {
            log::warn!(
                "Graph: cannot add task `{}` while execution is in progress",
                task.name()
            );
            return Err(GraphError::ExecutionInProgress);
        }

        let id = TaskId(self.tasks.len());
        let core = task.core_mut();
        if core.output_task == Some(id) {
            log::warn!("Graph: task {:?} names itself as output task, clearing", id);
            core.output_task = None;
        }

        self.tasks.push(task);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Option<&dyn GraphTask> {
        self.tasks.get(id.0).map(|t| t.as_ref())
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut (dyn GraphTask + 'static)> {
        self.tasks.get_mut(id.0).map(|t| t.as_mut())
    }

    /// Get a task as its concrete type
    pub fn task_as<T: GraphTask + 'static>(&self, id: TaskId) -> Option<&T> {
        self.task(id).and_then(|t| t.as_any().downcast_ref::<T>())
    }

    pub fn task_as_mut<T: GraphTask + 'static>(&mut self, id: TaskId) -> Option<&mut T> {
        self.task_mut(id)
            .and_then(|t| t.as_any_mut().downcast_mut::<T>())
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &dyn GraphTask)> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (TaskId(i), t.as_ref()))
    }

    // ========================================================================
    // Named outputs
    // ========================================================================

    /// Declare a named output. Redeclaring keeps the bound surface.
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        config: OutputConfig,
        method: ConfigMethod,
    ) {
        let entry = self.outputs.entry(name.into()).or_default();
        entry.config = config;
        entry.config_method = method;
    }

    pub fn output_entry(&self, name: &str) -> Option<&OutputEntry> {
        self.outputs.get(name)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Surface bound to the named output, if one was created.
    pub fn output_render_target(&self, name: &str) -> Option<Arc<Surface>> {
        self.outputs.get(name).and_then(|e| e.surface.clone())
    }

    /// Allocate a dedicated surface for a declared named output.
    ///
    /// Returns `None` with a warning when `name` was never declared with
    /// [`add_output`](Graph::add_output) or `config` is invalid.
    pub fn create_output_render_target(
        &mut self,
        name: &str,
        config: &OutputConfig,
        runtime: &mut GraphRuntime,
    ) -> Option<Arc<Surface>> {
        let Some(entry) = self.outputs.get_mut(name) else {
            log::warn!("Graph: output `{}` is not declared", name);
            return None;
        };
        if !config.is_valid() {
            log::warn!(
                "Graph: output `{}` has invalid dimension {}x{}",
                name,
                config.width,
                config.height
            );
            return None;
        }

        create_output_surface(entry, name, config, runtime.backend_mut())
    }

    /// Drop every surface bound to a named output.
    pub fn clear_output_render_targets(&mut self) {
        for entry in self.outputs.values_mut() {
            entry.surface = None;
        }
    }

    // ========================================================================
    // Parameter names
    // ========================================================================

    pub fn set_parameter_name_map(&mut self, category: impl Into<String>, map: ParameterNameMap) {
        self.parameter_names.insert(category.into(), map);
    }

    pub fn parameter_name_map(&self, category: &str) -> Option<&ParameterNameMap> {
        self.parameter_names.get(category)
    }

    /// Concrete name of `key` within `category`.
    ///
    /// `default_category` is searched when no category is given. When the
    /// category has no map, `key` itself is returned if `use_key_as_default`
    /// is set and `None` otherwise.
    pub fn parameter_name_from_category<'a>(
        &'a self,
        category: Option<&str>,
        default_category: &str,
        key: &'a str,
        use_key_as_default: bool,
    ) -> Option<&'a str> {
        let category = category.unwrap_or(default_category);
        match self.parameter_names.get(category) {
            Some(map) => Some(map.get_or_default(key)),
            None if use_key_as_default => Some(key),
            None => None,
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Effective output config of `id`.
    ///
    /// Input chains are followed through their predecessors; a chain that
    /// loops back on itself falls back to the root config.
    pub fn resolve_output_config(&self, id: TaskId) -> OutputConfig {
        let mut current = id;
        let mut hops = 0;

        loop {
            let Some(task) = self.tasks.get(current.0) else {
                return self.output_config;
            };
            let core = task.core();
            match core.config_method {
                ConfigMethod::Absolute => return core.config.output,
                ConfigMethod::Parent => return self.output_config,
                ConfigMethod::Input => match core.output_task {
                    Some(predecessor) if hops < self.tasks.len() => {
                        current = predecessor;
                        hops += 1;
                    }
                    Some(_) => {
                        log::warn!(
                            "Graph: input config chain of task {:?} forms a cycle, using root config",
                            id
                        );
                        return self.output_config;
                    }
                    None => return self.output_config,
                },
            }
        }
    }

    /// Run every task once against `runtime`.
    pub fn execute_graph(&mut self, runtime: &mut GraphRuntime) -> Result<(), GraphError> {
        if !self.has_valid_dimension() {
            log::warn!(
                "Graph: invalid dimension {}x{}, skipping execution",
                self.output_config.width,
                self.output_config.height
            );
            return Err(GraphError::InvalidDimension {
                width: self.output_config.width,
                height: self.output_config.height,
            });
        }
        if self.execution_in_progress {
            log::warn!("Graph: execution already in progress");
            return Err(GraphError::ExecutionInProgress);
        }

        self.execution_in_progress = true;

        let root_config = self.output_config;

        log::debug!("Graph: initializing {} tasks", self.tasks.len());
        for index in 0..self.tasks.len() {
            let task = &mut self.tasks[index];
            task.core_mut().begin_initialize();
            let mut ctx = TaskContext {
                runtime: &mut *runtime,
                root_config,
                outputs: &mut self.outputs,
                parameter_names: &self.parameter_names,
                resolved: &[],
                task: TaskId(index),
            };
            task.initialize(&mut ctx);
        }

        // Tasks may change their config while initializing, so resolve only
        // once every task has run its initialize.
        let resolved: Vec<OutputConfig> = (0..self.tasks.len())
            .map(|i| self.resolve_output_config(TaskId(i)))
            .collect();
        let tasks = &mut self.tasks;
        let outputs = &mut self.outputs;
        let parameter_names = &self.parameter_names;

        for index in 0..tasks.len() {
            let links = tasks[index].core().output_links(TaskId(index), &resolved);
            for (upstream, target) in links {
                tasks[upstream.0].core_mut().link_output_dependency(target);
            }
        }

        log::debug!("Graph: executing {} tasks", tasks.len());
        for index in 0..tasks.len() {
            let id = TaskId(index);
            let handoff = {
                let task = &mut tasks[index];
                let mut ctx = TaskContext {
                    runtime: &mut *runtime,
                    root_config,
                    outputs: &mut *outputs,
                    parameter_names,
                    resolved: &resolved,
                    task: id,
                };

                let core = task.core_mut();
                if core.requires_output && core.output.is_empty() {
                    core.output = ctx.acquire_surface(&resolved[index]);
                }
                core.begin_execute();

                log::trace!(
                    "Graph: executing `{}` ({:?}) into {:?}",
                    task.name(),
                    id,
                    task.core().output().surface_id()
                );
                task.execute(&mut ctx);
                task.post_execute(&mut ctx);
                task.core_mut().post_execute()
            };

            for target in &handoff.targets {
                let downstream = target.task();
                assert!(
                    downstream.0 > index && downstream.0 < tasks.len(),
                    "task {:?} linked to {:?} which does not run after it",
                    id,
                    downstream
                );
                tasks[downstream.0]
                    .core_mut()
                    .receive(target, &handoff.output);
            }
        }

        self.execution_in_progress = false;
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}
