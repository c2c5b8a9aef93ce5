//! Built-in tasks

mod apply_material;
mod draw_task_to_output;
mod resolve_output;

pub use apply_material::{ApplyMaterialTask, MaterialFunction};
pub use draw_task_to_output::DrawTaskToOutputTask;
pub use resolve_output::ResolveOutputTask;

/// Dependency name under which single-input tasks receive their source
pub const SOURCE_OUTPUT: &str = "SourceOutput";
