//! Context handed to tasks while a graph runs

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{OutputConfig, RenderBackend, Surface};

use super::config::{ConfigMethod, OutputEntry, ParameterNameMap};
use super::manager::GraphRuntime;
use super::material::{MaterialInstanceHandle, MaterialRef};
use super::slot::SurfaceSlot;
use super::task::TaskId;

/// Access to the runtime and graph state for the task currently running.
pub struct TaskContext<'a> {
    pub(crate) runtime: &'a mut GraphRuntime,
    pub(crate) root_config: OutputConfig,
    pub(crate) outputs: &'a mut HashMap<String, OutputEntry>,
    pub(crate) parameter_names: &'a HashMap<String, ParameterNameMap>,
    pub(crate) resolved: &'a [OutputConfig],
    pub(crate) task: TaskId,
}

impl<'a> TaskContext<'a> {
    /// Id of the task this context was created for
    pub fn task_id(&self) -> TaskId {
        self.task
    }

    pub fn root_config(&self) -> &OutputConfig {
        &self.root_config
    }

    /// Config `task` resolved to for this execution pass.
    ///
    /// Configs are resolved once every task has initialized; during
    /// `initialize` this is the root config.
    pub fn resolved_config(&self, task: TaskId) -> OutputConfig {
        self.resolved
            .get(task.0)
            .copied()
            .unwrap_or(self.root_config)
    }

    /// Config of the running task.
    pub fn output_config(&self) -> OutputConfig {
        self.resolved_config(self.task)
    }

    /// Apply the config cascade to a config that does not belong to a task,
    /// such as a named graph output fed by `predecessor`.
    pub fn resolve_config(
        &self,
        config: &OutputConfig,
        method: ConfigMethod,
        predecessor: Option<TaskId>,
    ) -> OutputConfig {
        match method {
            ConfigMethod::Absolute => *config,
            ConfigMethod::Parent => self.root_config,
            ConfigMethod::Input => match predecessor {
                Some(task) => self.resolved_config(task),
                None => self.root_config,
            },
        }
    }

    /// Acquire a pooled scratch surface.
    pub fn acquire_surface(&mut self, config: &OutputConfig) -> SurfaceSlot {
        self.runtime.acquire_surface(config)
    }

    /// Cached material instance for `material`; logged and `None` on failure.
    pub fn cached_material(
        &mut self,
        material: &MaterialRef,
        clear_parameters: bool,
    ) -> Option<MaterialInstanceHandle> {
        self.runtime.cached_material(material, clear_parameters)
    }

    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        self.runtime.backend_mut()
    }

    pub fn output_entry(&self, name: &str) -> Option<&OutputEntry> {
        self.outputs.get(name)
    }

    /// Allocate a dedicated surface for the named graph output.
    ///
    /// Reuses the bound surface when it already matches `config`.
    pub fn create_output_render_target(
        &mut self,
        name: &str,
        config: &OutputConfig,
    ) -> Option<Arc<Surface>> {
        let entry = match self.outputs.get_mut(name) {
            Some(entry) => entry,
            None => {
                log::warn!("Graph output `{}` is not declared", name);
                return None;
            }
        };
        create_output_surface(entry, name, config, self.runtime.backend_mut())
    }

    pub fn parameter_name_map(&self, category: &str) -> Option<&ParameterNameMap> {
        self.parameter_names.get(category)
    }
}

pub(crate) fn create_output_surface(
    entry: &mut OutputEntry,
    name: &str,
    config: &OutputConfig,
    backend: &mut dyn RenderBackend,
) -> Option<Arc<Surface>> {
    if let Some(surface) = &entry.surface {
        if surface.matches(config) {
            return Some(Arc::clone(surface));
        }
    }

    match backend.create_surface(config, Some(name)) {
        Ok(surface) => {
            log::debug!(
                "Graph output `{}` bound to {:?} ({}x{})",
                name,
                surface.id(),
                config.width,
                config.height
            );
            let surface = Arc::new(surface);
            entry.surface = Some(Arc::clone(&surface));
            Some(surface)
        }
        Err(err) => {
            log::warn!("Failed to create graph output `{}`: {}", name, err);
            None
        }
    }
}
