//! Material application task

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec4;

use crate::backend::{Geometry, Surface};
use crate::shader_graph::config::ParameterNameMap;
use crate::shader_graph::context::TaskContext;
use crate::shader_graph::material::{MaterialInstance, MaterialRef};
use crate::shader_graph::task::{GraphTask, TaskCore, TextureInput};

/// What an [`ApplyMaterialTask`] draws with its material
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialFunction {
    /// One full-target draw
    Apply,
    /// `iterations` draws ping-ponging between the output and a pooled swap
    /// surface. From the second draw on, `feedback_parameter` is bound to the
    /// previous draw's result.
    Iterate {
        iterations: u32,
        feedback_parameter: String,
    },
    /// Rasterize geometry instead of a full-target quad
    DrawGeometry(Geometry),
}

/// Draws a material into the task output with scalar, vector and texture
/// parameters. Texture parameters may come from other tasks.
pub struct ApplyMaterialTask {
    core: TaskCore,
    material: MaterialRef,
    function: MaterialFunction,
    parameter_category: Option<String>,
    scalars: BTreeMap<String, f32>,
    vectors: BTreeMap<String, Vec4>,
    textures: BTreeMap<String, TextureInput>,
    resolved_textures: BTreeMap<String, Arc<Surface>>,
}

impl ApplyMaterialTask {
    pub fn new(material: impl Into<MaterialRef>) -> Self {
        Self {
            core: TaskCore::new(),
            material: material.into(),
            function: MaterialFunction::Apply,
            parameter_category: None,
            scalars: BTreeMap::new(),
            vectors: BTreeMap::new(),
            textures: BTreeMap::new(),
            resolved_textures: BTreeMap::new(),
        }
    }

    /// Task drawing the library material called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(MaterialRef::Named(name.into()))
    }

    pub fn with_function(mut self, function: MaterialFunction) -> Self {
        self.function = function;
        self
    }

    /// Remap parameter names through the graph's map for `category`.
    pub fn with_parameter_category(mut self, category: impl Into<String>) -> Self {
        self.parameter_category = Some(category.into());
        self
    }

    pub fn with_scalar(mut self, name: impl Into<String>, value: f32) -> Self {
        self.set_scalar(name, value);
        self
    }

    pub fn with_vector(mut self, name: impl Into<String>, value: Vec4) -> Self {
        self.set_vector(name, value);
        self
    }

    pub fn with_texture(mut self, name: impl Into<String>, input: impl Into<TextureInput>) -> Self {
        self.set_texture(name, input);
        self
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: f32) {
        self.scalars.insert(name.into(), value);
    }

    pub fn set_vector(&mut self, name: impl Into<String>, value: Vec4) {
        self.vectors.insert(name.into(), value);
    }

    pub fn set_texture(&mut self, name: impl Into<String>, input: impl Into<TextureInput>) {
        self.textures.insert(name.into(), input.into());
    }

    pub fn material(&self) -> &MaterialRef {
        &self.material
    }

    pub fn function(&self) -> &MaterialFunction {
        &self.function
    }

    fn bind_parameters(&self, instance: &mut MaterialInstance, names: Option<&ParameterNameMap>) {
        let map = |name: &str| -> String {
            names.map_or(name, |n| n.get_or_default(name)).to_string()
        };

        for (name, value) in &self.scalars {
            instance.set_scalar(map(name), *value);
        }
        for (name, value) in &self.vectors {
            instance.set_vector(map(name), *value);
        }
        for (name, surface) in &self.resolved_textures {
            instance.set_texture(map(name), Arc::clone(surface));
        }
    }

    fn iterate(
        &self,
        ctx: &mut TaskContext<'_>,
        instance: &mut MaterialInstance,
        target: &Arc<Surface>,
        iterations: u32,
        feedback_parameter: &str,
    ) {
        if iterations == 0 {
            return;
        }

        let swap = if iterations > 1 {
            let slot = ctx.acquire_surface(target.config());
            if slot.is_empty() {
                log::warn!(
                    "{}: no swap surface for {} iterations, skipping",
                    self.name(),
                    iterations
                );
                return;
            }
            Some(slot)
        } else {
            None
        };

        let draw = self.core.config.draw;
        let mut previous: Option<Arc<Surface>> = None;

        // The last iteration always lands in the output.
        for k in 0..iterations {
            let destination = if (iterations - 1 - k) % 2 == 0 {
                Arc::clone(target)
            } else {
                match swap.as_ref().and_then(|s| s.surface()) {
                    Some(surface) => Arc::clone(surface),
                    None => return,
                }
            };

            if let Some(previous) = previous.take() {
                instance.set_texture(feedback_parameter, previous);
            }
            if let Err(err) = ctx.backend().apply_material(instance, &destination, &draw) {
                log::warn!("{}: iteration {} failed: {}", self.name(), k, err);
                return;
            }
            previous = Some(destination);
        }
    }
}

impl GraphTask for ApplyMaterialTask {
    fn name(&self) -> &str {
        self.core.label.as_deref().unwrap_or("ApplyMaterial")
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn initialize(&mut self, _ctx: &mut TaskContext<'_>) {
        for (name, input) in &self.textures {
            if let TextureInput::Task(task) = input {
                self.core.add_dependency(name.clone(), *task);
            }
        }
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        let Some(target) = self.core.output_surface().cloned() else {
            log::warn!("{}: no output surface, skipping", self.name());
            return;
        };

        self.resolved_textures.clear();
        for (name, input) in &self.textures {
            let surface = match input {
                TextureInput::Surface(surface) => Some(Arc::clone(surface)),
                TextureInput::Task(_) => self.core.dependency_output(name).cloned(),
            };
            match surface {
                Some(surface) => {
                    self.resolved_textures.insert(name.clone(), surface);
                }
                None => log::debug!("{}: input `{}` has no surface", self.name(), name),
            }
        }

        let Some(handle) = ctx.cached_material(&self.material, true) else {
            log::warn!("{}: material {:?} unavailable, skipping", self.name(), self.material);
            return;
        };
        let mut instance = handle.lock();

        let names = self
            .parameter_category
            .as_deref()
            .and_then(|category| ctx.parameter_name_map(category))
            .cloned();
        self.bind_parameters(&mut instance, names.as_ref());

        let draw = self.core.config.draw;
        let result = match &self.function {
            MaterialFunction::Apply => ctx.backend().apply_material(&instance, &target, &draw),
            MaterialFunction::DrawGeometry(geometry) => {
                ctx.backend()
                    .draw_geometry(&instance, geometry, &target, &draw)
            }
            MaterialFunction::Iterate {
                iterations,
                feedback_parameter,
            } => {
                let feedback = names
                    .as_ref()
                    .map_or(feedback_parameter.as_str(), |n| {
                        n.get_or_default(feedback_parameter)
                    })
                    .to_string();
                self.iterate(ctx, &mut instance, &target, *iterations, &feedback);
                Ok(())
            }
        };

        if let Err(err) = result {
            log::warn!("{}: draw failed: {}", self.name(), err);
        }
    }

    fn post_execute(&mut self, _ctx: &mut TaskContext<'_>) {
        self.resolved_textures.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
