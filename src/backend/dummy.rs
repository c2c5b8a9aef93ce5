//! Dummy render backend for testing and headless use.
//!
//! This backend doesn't touch a GPU. It hands out surfaces with increasing
//! ids and records every command it receives so callers can inspect what a
//! graph run asked for.

use std::any::Any;

use super::traits::{BackendError, BackendResult, RenderBackend};
use super::types::{DrawConfig, Geometry, OutputConfig, Surface, SurfaceId};
use crate::shader_graph::material::{MaterialId, MaterialInstance};

/// A command recorded by [`DummyBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCommand {
    CreateSurface {
        surface: SurfaceId,
        config: OutputConfig,
    },
    ApplyMaterial {
        material: MaterialId,
        target: SurfaceId,
        /// Texture bindings at the time of the draw, sorted by parameter name
        textures: Vec<(String, SurfaceId)>,
        draw: DrawConfig,
    },
    DrawGeometry {
        material: MaterialId,
        target: SurfaceId,
        triangles: usize,
        draw: DrawConfig,
    },
    Copy {
        src: SurfaceId,
        dst: SurfaceId,
    },
    Resample {
        src: SurfaceId,
        dst: SurfaceId,
    },
}

/// Dummy render backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_surface: u64,
    commands: Vec<DummyCommand>,
    fail_surface_creation: bool,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `create_surface` call fail.
    pub fn set_fail_surface_creation(&mut self, fail: bool) {
        self.fail_surface_creation = fail;
    }

    /// Number of surfaces successfully created so far.
    pub fn surfaces_created(&self) -> u64 {
        self.next_surface
    }

    /// All commands recorded so far, in submission order.
    pub fn commands(&self) -> &[DummyCommand] {
        &self.commands
    }

    /// Recorded commands excluding surface creation.
    pub fn draw_commands(&self) -> impl Iterator<Item = &DummyCommand> {
        self.commands
            .iter()
            .filter(|c| !matches!(c, DummyCommand::CreateSurface { .. }))
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl RenderBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_surface(
        &mut self,
        config: &OutputConfig,
        label: Option<&str>,
    ) -> BackendResult<Surface> {
        if !config.is_valid() {
            return Err(BackendError::InvalidSurfaceConfig {
                width: config.width,
                height: config.height,
            });
        }
        if self.fail_surface_creation {
            return Err(BackendError::SurfaceCreationFailed(
                "simulated allocation failure".to_string(),
            ));
        }

        let id = SurfaceId::new(self.next_surface);
        self.next_surface += 1;

        log::trace!(
            "DummyBackend: creating surface {:?} {:?} ({}x{} {:?})",
            id,
            label,
            config.width,
            config.height,
            config.format
        );
        self.commands.push(DummyCommand::CreateSurface {
            surface: id,
            config: *config,
        });

        Ok(Surface::new(id, *config, label.map(str::to_owned)))
    }

    fn apply_material(
        &mut self,
        material: &MaterialInstance,
        target: &Surface,
        draw: &DrawConfig,
    ) -> BackendResult<()> {
        log::trace!(
            "DummyBackend: apply {:?} -> {:?}",
            material.material().label(),
            target.id()
        );
        self.commands.push(DummyCommand::ApplyMaterial {
            material: material.material().id(),
            target: target.id(),
            textures: material
                .textures()
                .map(|(name, surface)| (name.to_owned(), surface.id()))
                .collect(),
            draw: *draw,
        });
        Ok(())
    }

    fn draw_geometry(
        &mut self,
        material: &MaterialInstance,
        geometry: &Geometry,
        target: &Surface,
        draw: &DrawConfig,
    ) -> BackendResult<()> {
        log::trace!(
            "DummyBackend: draw {} triangles -> {:?}",
            geometry.triangle_count(),
            target.id()
        );
        self.commands.push(DummyCommand::DrawGeometry {
            material: material.material().id(),
            target: target.id(),
            triangles: geometry.triangle_count(),
            draw: *draw,
        });
        Ok(())
    }

    fn copy_surface(&mut self, src: &Surface, dst: &Surface) -> BackendResult<()> {
        log::trace!("DummyBackend: copy {:?} -> {:?}", src.id(), dst.id());
        self.commands.push(DummyCommand::Copy {
            src: src.id(),
            dst: dst.id(),
        });
        Ok(())
    }

    fn resample_surface(
        &mut self,
        src: &Surface,
        dst: &Surface,
        _draw: &DrawConfig,
    ) -> BackendResult<()> {
        log::trace!("DummyBackend: resample {:?} -> {:?}", src.id(), dst.id());
        self.commands.push(DummyCommand::Resample {
            src: src.id(),
            dst: dst.id(),
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PixelFormat;

    #[test]
    fn test_surface_ids_increase() {
        let mut backend = DummyBackend::new();
        let config = OutputConfig::new(32, 32, PixelFormat::Rgba8Unorm);

        let a = backend.create_surface(&config, Some("a")).unwrap();
        let b = backend.create_surface(&config, None).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.label(), Some("a"));
        assert_eq!(backend.surfaces_created(), 2);
        assert_eq!(backend.commands().len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut backend = DummyBackend::new();
        let result = backend.create_surface(&OutputConfig::invalid(), None);
        assert!(matches!(
            result,
            Err(BackendError::InvalidSurfaceConfig { width: 0, height: 0 })
        ));
        assert_eq!(backend.surfaces_created(), 0);
    }

    #[test]
    fn test_simulated_failure() {
        let mut backend = DummyBackend::new();
        backend.set_fail_surface_creation(true);
        assert!(backend
            .create_surface(&OutputConfig::default(), None)
            .is_err());
        assert!(backend.commands().is_empty());

        backend.set_fail_surface_creation(false);
        assert!(backend.create_surface(&OutputConfig::default(), None).is_ok());
    }

    #[test]
    fn test_copy_recorded() {
        let mut backend = DummyBackend::new();
        let config = OutputConfig::default();
        let a = backend.create_surface(&config, None).unwrap();
        let b = backend.create_surface(&config, None).unwrap();

        backend.copy_surface(&a, &b).unwrap();

        let draws: Vec<_> = backend.draw_commands().collect();
        assert_eq!(
            draws,
            vec![&DummyCommand::Copy {
                src: a.id(),
                dst: b.id()
            }]
        );
    }
}
