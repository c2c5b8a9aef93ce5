//! Materials, material instances and the instance cache.
//!
//! A [`Material`] stands for a compiled shader program owned by the host. A
//! [`MaterialInstance`] binds parameter values to one material and is what
//! tasks hand to the backend. Instances are reused across tasks and runs
//! through [`MaterialInstanceCache`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec4;
use parking_lot::Mutex;

use crate::backend::Surface;
use crate::error::MaterialError;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a base material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

impl MaterialId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A base shader program that instances are created from.
#[derive(Debug)]
pub struct Material {
    id: MaterialId,
    label: Option<String>,
}

impl Material {
    pub fn new() -> Self {
        Self {
            id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Material instance
// ============================================================================

/// Parameter values bound to a [`Material`].
pub struct MaterialInstance {
    material: Arc<Material>,
    scalars: BTreeMap<String, f32>,
    vectors: BTreeMap<String, Vec4>,
    textures: BTreeMap<String, Arc<Surface>>,
    label: Option<String>,
}

impl MaterialInstance {
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            material,
            scalars: BTreeMap::new(),
            vectors: BTreeMap::new(),
            textures: BTreeMap::new(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: f32) {
        self.scalars.insert(name.into(), value);
    }

    pub fn set_vector(&mut self, name: impl Into<String>, value: Vec4) {
        self.vectors.insert(name.into(), value);
    }

    pub fn set_texture(&mut self, name: impl Into<String>, surface: Arc<Surface>) {
        self.textures.insert(name.into(), surface);
    }

    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.scalars.get(name).copied()
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        self.vectors.get(name).copied()
    }

    pub fn texture(&self, name: &str) -> Option<&Arc<Surface>> {
        self.textures.get(name)
    }

    /// Texture bindings sorted by parameter name.
    pub fn textures(&self) -> impl Iterator<Item = (&str, &Arc<Surface>)> {
        self.textures.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reset every parameter binding, releasing bound surfaces.
    pub fn clear_parameter_values(&mut self) {
        self.scalars.clear();
        self.vectors.clear();
        self.textures.clear();
    }

    pub fn parameter_count(&self) -> usize {
        self.scalars.len() + self.vectors.len() + self.textures.len()
    }
}

impl fmt::Debug for MaterialInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialInstance")
            .field("material", &self.material.label())
            .field("label", &self.label)
            .field("scalars", &self.scalars.len())
            .field("vectors", &self.vectors.len())
            .field("textures", &self.textures.len())
            .finish()
    }
}

// ============================================================================
// Library
// ============================================================================

/// Name to material lookup provided by the host.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Arc<Material>>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_material(mut self, name: impl Into<String>, material: Arc<Material>) -> Self {
        self.insert(name, material);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, material: Arc<Material>) {
        self.materials.insert(name.into(), material);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Material>> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

// ============================================================================
// Instance cache
// ============================================================================

/// How a task refers to the material it draws with
#[derive(Debug, Clone)]
pub enum MaterialRef {
    Base(Arc<Material>),
    Named(String),
}

impl MaterialRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<Arc<Material>> for MaterialRef {
    fn from(material: Arc<Material>) -> Self {
        Self::Base(material)
    }
}

/// Shared handle to a cached instance
pub type MaterialInstanceHandle = Arc<Mutex<MaterialInstance>>;

/// Reusable material instances, keyed by base material and by library name.
#[derive(Default)]
pub struct MaterialInstanceCache {
    by_base: HashMap<MaterialId, MaterialInstanceHandle>,
    by_name: HashMap<String, MaterialInstanceHandle>,
}

impl MaterialInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance of `base`, created on first use.
    pub fn get_or_create_based(
        &mut self,
        base: &Arc<Material>,
        clear_parameters: bool,
    ) -> MaterialInstanceHandle {
        let handle = self.by_base.entry(base.id()).or_insert_with(|| {
            log::debug!("MaterialInstanceCache: instancing {:?}", base.label());
            Arc::new(Mutex::new(MaterialInstance::new(Arc::clone(base))))
        });
        if clear_parameters {
            handle.lock().clear_parameter_values();
        }
        Arc::clone(handle)
    }

    /// Cached instance of the library material called `name`.
    pub fn try_get_or_create_named(
        &mut self,
        name: &str,
        library: Option<&MaterialLibrary>,
        clear_parameters: bool,
    ) -> Result<MaterialInstanceHandle, MaterialError> {
        if let Some(handle) = self.by_name.get(name) {
            if clear_parameters {
                handle.lock().clear_parameter_values();
            }
            return Ok(Arc::clone(handle));
        }

        let library = library.ok_or(MaterialError::LibraryNotConfigured)?;
        let material = library
            .get(name)
            .ok_or_else(|| MaterialError::MaterialNotFound(name.to_string()))?;

        log::debug!("MaterialInstanceCache: instancing `{}`", name);
        let handle = Arc::new(Mutex::new(
            MaterialInstance::new(Arc::clone(material)).with_label(name),
        ));
        self.by_name.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Like [`try_get_or_create_named`](Self::try_get_or_create_named), but
    /// logs the failure and returns `None`.
    pub fn get_or_create_named(
        &mut self,
        name: &str,
        library: Option<&MaterialLibrary>,
        clear_parameters: bool,
    ) -> Option<MaterialInstanceHandle> {
        match self.try_get_or_create_named(name, library, clear_parameters) {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::warn!("MaterialInstanceCache: {}", err);
                None
            }
        }
    }

    pub fn get_or_create(
        &mut self,
        material: &MaterialRef,
        library: Option<&MaterialLibrary>,
        clear_parameters: bool,
    ) -> Option<MaterialInstanceHandle> {
        match material {
            MaterialRef::Base(base) => Some(self.get_or_create_based(base, clear_parameters)),
            MaterialRef::Named(name) => self.get_or_create_named(name, library, clear_parameters),
        }
    }

    pub fn len(&self) -> usize {
        self.by_base.len() + self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_base.clear();
        self.by_name.clear();
    }
}

impl fmt::Debug for MaterialInstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialInstanceCache")
            .field("by_base", &self.by_base.len())
            .field("by_name", &self.by_name.len())
            .finish()
    }
}
