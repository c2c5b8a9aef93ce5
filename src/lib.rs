//! Shader Graph - deferred image-processing passes on pooled GPU surfaces
//!
//! A caller builds an ordered list of tasks, each optionally consuming the
//! output of earlier tasks, and the graph executes them in submission order
//! while allocating and reusing scratch surfaces.
//!
//! # Features
//! - Two-phase execution (initialize all tasks, then execute each in order)
//! - Output configs inherited from the graph (Parent), an upstream task
//!   (Input) or set explicitly (Absolute)
//! - Refcounted surface pool that reuses released surfaces
//! - Write-through output sharing between tasks with identical configs
//! - Material instance cache keyed by base material and library name
//!
//! Pixels are produced by a host-provided [`RenderBackend`]. [`DummyBackend`]
//! records commands instead and is what the tests run against.

pub mod backend;
pub mod error;
pub mod settings;
pub mod shader_graph;

pub use backend::{
    BackendError, BackendResult, BlendType, DrawConfig, DummyBackend, DummyCommand, Geometry,
    OutputConfig, PixelFormat, RenderBackend, Surface, SurfaceId,
};
pub use error::{GraphError, MaterialError};
pub use settings::GraphSettings;
pub use shader_graph::{
    ApplyMaterialTask, ConfigMethod, DrawTaskToOutputTask, Graph, GraphManager, GraphRuntime,
    GraphTask, GraphType, Material, MaterialFunction, MaterialInstance, MaterialLibrary,
    MaterialRef, ParameterNameMap, ResolveOutputTask, SurfacePool, SurfaceSlot, TaskBuilderExt,
    TaskConfig, TaskContext, TaskCore, TaskId, TaskLifecycle, TextureInput,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version. Call once after installing a logger.
pub fn init() {
    log::info!("Shader Graph v{}", VERSION);
}
