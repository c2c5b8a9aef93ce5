//! Copy a task's output into a caller-owned surface

use std::any::Any;
use std::sync::Arc;

use crate::backend::Surface;
use crate::shader_graph::context::TaskContext;
use crate::shader_graph::task::{GraphTask, TaskCore, TaskId};

use super::SOURCE_OUTPUT;

/// Writes the output of `source` into an external surface.
///
/// The task has no output of its own. Surfaces of a different config are
/// resampled instead of copied.
pub struct ResolveOutputTask {
    core: TaskCore,
    source: TaskId,
    destination: Arc<Surface>,
}

impl ResolveOutputTask {
    pub fn new(source: TaskId, destination: Arc<Surface>) -> Self {
        let mut core = TaskCore::new();
        core.requires_output = false;
        Self {
            core,
            source,
            destination,
        }
    }

    pub fn source(&self) -> TaskId {
        self.source
    }

    pub fn destination(&self) -> &Arc<Surface> {
        &self.destination
    }
}

impl GraphTask for ResolveOutputTask {
    fn name(&self) -> &str {
        self.core.label.as_deref().unwrap_or("ResolveOutput")
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn initialize(&mut self, _ctx: &mut TaskContext<'_>) {
        self.core.add_dependency(SOURCE_OUTPUT, self.source);
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        let Some(source) = self.core.dependency_output(SOURCE_OUTPUT).cloned() else {
            log::warn!("{}: {:?} produced no output, skipping", self.name(), self.source);
            return;
        };
        if source.id() == self.destination.id() {
            return;
        }

        let result = if source.matches(self.destination.config()) {
            ctx.backend().copy_surface(&source, &self.destination)
        } else {
            let draw = self.core.config.draw;
            ctx.backend()
                .resample_surface(&source, &self.destination, &draw)
        };
        if let Err(err) = result {
            log::warn!("{}: {}", self.name(), err);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
