//! Process-wide graph settings

use std::sync::Arc;

use crate::shader_graph::material::MaterialLibrary;

/// Settings shared by every graph a [`GraphManager`](crate::GraphManager) runs.
#[derive(Debug, Clone, Default)]
pub struct GraphSettings {
    /// Library used to resolve materials referenced by name. Lookups by name
    /// fail with a warning while this is `None`.
    pub material_library: Option<Arc<MaterialLibrary>>,
}

impl GraphSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_material_library(mut self, library: Arc<MaterialLibrary>) -> Self {
        self.material_library = Some(library);
        self
    }

    pub fn material_library(&self) -> Option<&MaterialLibrary> {
        self.material_library.as_deref()
    }
}
