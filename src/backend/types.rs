//! Common types shared between the graph and rendering backends

use glam::{Vec2, Vec3};

/// Pixel format of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    R16Float,
    Rg16Float,
    #[default]
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::R8Unorm => 1,
            PixelFormat::Rg8Unorm | PixelFormat::R16Float => 2,
            PixelFormat::Rgba8Unorm | PixelFormat::Rg16Float | PixelFormat::R32Float => 4,
            PixelFormat::Rgba16Float | PixelFormat::Rg32Float => 8,
            PixelFormat::Rgba32Float => 16,
        }
    }

    pub fn is_float(&self) -> bool {
        !matches!(
            self,
            PixelFormat::R8Unorm | PixelFormat::Rg8Unorm | PixelFormat::Rgba8Unorm
        )
    }
}

/// Dimensions and format of a surface produced by a task or graph output.
///
/// A config with a zero width or height is invalid: graphs with an invalid
/// root config refuse to execute and the pool refuses to allocate for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub linear_gamma: bool,
}

impl OutputConfig {
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            linear_gamma: false,
        }
    }

    /// Zero-sized config, used as the "unset" value of task configs.
    pub const fn invalid() -> Self {
        Self::new(0, 0, PixelFormat::Rgba16Float)
    }

    pub fn with_linear_gamma(mut self, linear_gamma: bool) -> Self {
        self.linear_gamma = linear_gamma;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(256, 256, PixelFormat::Rgba16Float)
    }
}

/// How a draw combines with the existing contents of its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendType {
    #[default]
    Opaque,
    AlphaComposite,
    Translucent,
    Additive,
    Modulate,
}

/// Per-draw settings passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawConfig {
    pub blend: BlendType,
    pub clear_target: bool,
}

impl DrawConfig {
    pub fn with_blend(mut self, blend: BlendType) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_clear(mut self, clear_target: bool) -> Self {
        self.clear_target = clear_target;
        self
    }
}

/// Unique identifier of a backend surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A GPU-addressable 2D render target created by a [`RenderBackend`](super::RenderBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    id: SurfaceId,
    config: OutputConfig,
    label: Option<String>,
}

impl Surface {
    pub fn new(id: SurfaceId, config: OutputConfig, label: Option<String>) -> Self {
        Self { id, config, label }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn format(&self) -> PixelFormat {
        self.config.format
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Check whether this surface can stand in for a surface of `config`
    pub fn matches(&self, config: &OutputConfig) -> bool {
        self.config == *config
    }
}

/// Vertex with a position and an RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryVertex {
    pub position: Vec3,
    pub color: [u8; 4],
}

/// Indexed geometry drawn by geometry tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<GeometryVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Build geometry from 2D points, one color per point (white when missing).
    pub fn from_points(points: &[Vec2], colors: &[[u8; 4]], indices: &[u32]) -> Self {
        let vertices = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeometryVertex {
                position: p.extend(0.0),
                color: colors.get(i).copied().unwrap_or([255; 4]),
            })
            .collect();

        Self {
            vertices,
            indices: indices.to_vec(),
        }
    }

    /// Build geometry from 3D vertices, one color per vertex (white when missing).
    pub fn from_vertices(positions: &[Vec3], colors: &[[u8; 4]], indices: &[u32]) -> Self {
        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, p)| GeometryVertex {
                position: *p,
                color: colors.get(i).copied().unwrap_or([255; 4]),
            })
            .collect();

        Self {
            vertices,
            indices: indices.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of triangles described by the index list
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_config() {
        let config = OutputConfig::default();
        assert_eq!(config.size(), (256, 256));
        assert_eq!(config.format, PixelFormat::Rgba16Float);
        assert!(!config.linear_gamma);
        assert!(config.is_valid());
    }

    #[test]
    fn test_invalid_output_config() {
        assert!(!OutputConfig::invalid().is_valid());
        assert!(!OutputConfig::new(0, 64, PixelFormat::R8Unorm).is_valid());
        assert!(!OutputConfig::new(64, 0, PixelFormat::R8Unorm).is_valid());
    }

    #[test]
    fn test_output_config_equality_includes_gamma() {
        let a = OutputConfig::new(64, 64, PixelFormat::Rgba8Unorm);
        let b = a.with_linear_gamma(true);
        assert_ne!(a, b);
        assert_eq!(a, OutputConfig::new(64, 64, PixelFormat::Rgba8Unorm));
    }

    #[test]
    fn test_byte_size() {
        let config = OutputConfig::new(4, 2, PixelFormat::Rgba32Float);
        assert_eq!(config.byte_size(), 4 * 2 * 16);
    }

    #[test]
    fn test_geometry_from_points_fills_missing_colors() {
        let geometry = Geometry::from_points(
            &[Vec2::ZERO, Vec2::X, Vec2::Y],
            &[[255, 0, 0, 255]],
            &[0, 1, 2],
        );
        assert_eq!(geometry.vertices.len(), 3);
        assert_eq!(geometry.vertices[0].color, [255, 0, 0, 255]);
        assert_eq!(geometry.vertices[2].color, [255; 4]);
        assert_eq!(geometry.triangle_count(), 1);
    }
}
