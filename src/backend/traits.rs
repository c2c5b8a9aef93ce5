//! Core backend abstraction traits
//!
//! The graph never talks to a GPU API directly. Everything that touches pixels
//! goes through [`RenderBackend`], which a host implements on top of its own
//! renderer.

use std::any::Any;

use crate::backend::types::*;
use crate::shader_graph::material::MaterialInstance;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Invalid surface config {width}x{height}")]
    InvalidSurfaceConfig { width: u32, height: u32 },
    #[error("Backend command failed: {0}")]
    CommandFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Surface factory and draw-command sink used by graph tasks.
///
/// Implementations only need to be correct for a single thread at a time; the
/// graph calls them sequentially from [`Graph::execute_graph`](crate::Graph::execute_graph).
pub trait RenderBackend: Send + Sync {
    /// Human readable backend name, used in log output
    fn name(&self) -> &'static str;

    /// Create a render target matching `config`.
    fn create_surface(
        &mut self,
        config: &OutputConfig,
        label: Option<&str>,
    ) -> BackendResult<Surface>;

    /// Draw a full-target quad with `material` into `target`.
    fn apply_material(
        &mut self,
        material: &MaterialInstance,
        target: &Surface,
        draw: &DrawConfig,
    ) -> BackendResult<()>;

    /// Rasterize `geometry` into `target` using `material`.
    fn draw_geometry(
        &mut self,
        material: &MaterialInstance,
        geometry: &Geometry,
        target: &Surface,
        draw: &DrawConfig,
    ) -> BackendResult<()>;

    /// Copy `src` into `dst`. Both surfaces share the same config.
    fn copy_surface(&mut self, src: &Surface, dst: &Surface) -> BackendResult<()>;

    /// Scale and convert `src` into `dst`.
    fn resample_surface(
        &mut self,
        src: &Surface,
        dst: &Surface,
        draw: &DrawConfig,
    ) -> BackendResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::SurfaceCreationFailed("out of handles".to_string());
        assert_eq!(err.to_string(), "Failed to create surface: out of handles");

        let err = BackendError::InvalidSurfaceConfig {
            width: 0,
            height: 16,
        };
        assert_eq!(err.to_string(), "Invalid surface config 0x16");
    }
}
