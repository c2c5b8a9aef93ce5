//! Write a task's output into a named graph output

use std::any::Any;

use crate::shader_graph::context::TaskContext;
use crate::shader_graph::task::{GraphTask, TaskCore, TaskId};

use super::SOURCE_OUTPUT;

/// Publishes the output of `source` under a named graph output.
///
/// The output entry's config is resolved with `source` as its Input
/// predecessor. Matching configs are copied, anything else is resampled.
pub struct DrawTaskToOutputTask {
    core: TaskCore,
    source: TaskId,
    output_name: String,
}

impl DrawTaskToOutputTask {
    pub fn new(source: TaskId, output_name: impl Into<String>) -> Self {
        let mut core = TaskCore::new();
        core.requires_output = false;
        Self {
            core,
            source,
            output_name: output_name.into(),
        }
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl GraphTask for DrawTaskToOutputTask {
    fn name(&self) -> &str {
        self.core.label.as_deref().unwrap_or("DrawTaskToOutput")
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
        let Some(entry) = ctx.output_entry(&self.output_name) else {
            log::warn!(
                "{}: graph output `{}` is not declared",
                self.name(),
                self.output_name
            );
            return;
        };
        let config = ctx.resolve_config(&entry.config, entry.config_method, Some(self.source));

        let Some(source) = self.core.dependency_output(SOURCE_OUTPUT).cloned() else {
            log::warn!("{}: {:?} produced no output, skipping", self.name(), self.source);
            return;
        };
        let Some(destination) = ctx.create_output_render_target(&self.output_name, &config) else {
            return;
        };

        let result = if source.matches(destination.config()) {
            ctx.backend().copy_surface(&source, &destination)
        } else {
            let draw = self.core.config.draw;
            ctx.backend()
                .resample_surface(&source, &destination, &draw)
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
