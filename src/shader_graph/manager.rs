//! Graph manager and the runtime state shared with tasks

use std::fmt;
use std::sync::Arc;

use crate::backend::{OutputConfig, RenderBackend, Surface};
use crate::error::GraphError;
use crate::settings::GraphSettings;

use super::graph::Graph;
use super::material::{MaterialInstanceCache, MaterialInstanceHandle, MaterialRef};
use super::pool::SurfacePool;
use super::slot::SurfaceSlot;

/// Backend, surface pool and material cache owned by one manager.
///
/// Borrowed mutably by a [`Graph`] for the duration of one run.
pub struct GraphRuntime {
    backend: Box<dyn RenderBackend>,
    surface_pool: SurfacePool,
    material_cache: MaterialInstanceCache,
    settings: GraphSettings,
}

impl GraphRuntime {
    pub fn new(backend: Box<dyn RenderBackend>, settings: GraphSettings) -> Self {
        Self {
            backend,
            surface_pool: SurfacePool::new(),
            material_cache: MaterialInstanceCache::new(),
            settings,
        }
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Get the backend as its concrete type
    pub fn backend_as<B: RenderBackend + 'static>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    pub fn backend_as_mut<B: RenderBackend + 'static>(&mut self) -> Option<&mut B> {
        self.backend.as_any_mut().downcast_mut::<B>()
    }

    pub fn surface_pool(&self) -> &SurfacePool {
        &self.surface_pool
    }

    pub fn material_cache(&self) -> &MaterialInstanceCache {
        &self.material_cache
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: GraphSettings) {
        self.settings = settings;
    }

    pub fn acquire_surface(&mut self, config: &OutputConfig) -> SurfaceSlot {
        self.surface_pool.acquire(config, self.backend.as_mut())
    }

    pub fn cached_material(
        &mut self,
        material: &MaterialRef,
        clear_parameters: bool,
    ) -> Option<MaterialInstanceHandle> {
        self.material_cache.get_or_create(
            material,
            self.settings.material_library(),
            clear_parameters,
        )
    }

    pub(crate) fn clear_pool(&mut self) {
        self.surface_pool.clear();
    }
}

impl fmt::Debug for GraphRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRuntime")
            .field("backend", &self.backend.name())
            .field("surface_pool", &self.surface_pool)
            .field("material_cache", &self.material_cache)
            .finish()
    }
}

/// A named graph factory the manager can instantiate on demand.
#[derive(Clone)]
pub struct GraphType {
    name: String,
    build: Arc<dyn Fn() -> Graph + Send + Sync>,
}

impl GraphType {
    pub fn new(name: impl Into<String>, build: impl Fn() -> Graph + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Graph {
        let mut graph = (self.build)();
        graph.type_name = Some(self.name.clone());
        graph
    }
}

impl fmt::Debug for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphType").field("name", &self.name).finish()
    }
}

/// Runs one graph at a time against an owned [`GraphRuntime`].
///
/// # Example
///
/// ```
/// use shader_graph::{DummyBackend, Graph, GraphManager, GraphSettings};
///
/// let mut manager = GraphManager::new(Box::new(DummyBackend::new()), GraphSettings::new());
/// manager.initialize(Some(Graph::default())).unwrap();
/// manager.execute().unwrap();
/// assert!(manager.graph_output("Color").is_none());
/// ```
pub struct GraphManager {
    graph: Option<Graph>,
    graph_type: Option<GraphType>,
    runtime: GraphRuntime,
}

impl GraphManager {
    pub fn new(backend: Box<dyn RenderBackend>, settings: GraphSettings) -> Self {
        Self {
            graph: None,
            graph_type: None,
            runtime: GraphRuntime::new(backend, settings),
        }
    }

    pub fn with_graph_type(mut self, graph_type: GraphType) -> Self {
        self.graph_type = Some(graph_type);
        self
    }

    pub fn set_graph_type(&mut self, graph_type: Option<GraphType>) {
        self.graph_type = graph_type;
    }

    pub fn graph_type(&self) -> Option<&GraphType> {
        self.graph_type.as_ref()
    }

    /// Bind a graph to this manager.
    ///
    /// With `None`, the registered graph type is instantiated, unless the
    /// bound graph was already built from it.
    pub fn initialize(&mut self, graph: Option<Graph>) -> Result<(), GraphError> {
        if self.is_executing() {
            log::warn!("GraphManager: cannot initialize while a graph is executing");
            return Err(GraphError::ExecutionInProgress);
        }

        match graph {
            Some(graph) => {
                log::debug!("GraphManager: binding graph with {} tasks", graph.len());
                self.graph = Some(graph);
            }
            None => {
                let Some(graph_type) = &self.graph_type else {
                    log::warn!("GraphManager: no graph given and no graph type set");
                    return Err(GraphError::NoGraphType);
                };
                let current = self.graph.as_ref().and_then(Graph::type_name);
                if current != Some(graph_type.name()) {
                    log::debug!("GraphManager: instantiating graph type `{}`", graph_type.name());
                    self.graph = Some(graph_type.instantiate());
                }
            }
        }
        Ok(())
    }

    /// Run the bound graph once.
    pub fn execute(&mut self) -> Result<(), GraphError> {
        let Some(graph) = self.graph.as_mut() else {
            log::warn!("GraphManager: no graph to execute");
            return Err(GraphError::NoGraph);
        };
        graph.execute_graph(&mut self.runtime)
    }

    /// Bind `graph` and run it.
    pub fn execute_graph(&mut self, graph: Graph) -> Result<(), GraphError> {
        self.initialize(Some(graph))?;
        self.execute()
    }

    /// Surface bound to the named output of the current graph.
    pub fn graph_output(&self, name: &str) -> Option<Arc<Surface>> {
        self.graph.as_ref()?.output_render_target(name)
    }

    /// Release every pooled surface.
    ///
    /// Named graph outputs are dedicated surfaces and stay bound.
    pub fn clear_outputs(&mut self) {
        if self.is_executing() {
            log::warn!("GraphManager: cannot clear outputs while a graph is executing");
            return;
        }
        self.runtime.clear_pool();
    }

    /// Drop the bound graph and every pooled surface.
    pub fn reset(&mut self) {
        self.graph = None;
        self.runtime.clear_pool();
    }

    pub fn is_executing(&self) -> bool {
        self.graph
            .as_ref()
            .map_or(false, Graph::is_execution_in_progress)
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut Graph> {
        self.graph.as_mut()
    }

    pub fn take_graph(&mut self) -> Option<Graph> {
        self.graph.take()
    }

    pub fn runtime(&self) -> &GraphRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut GraphRuntime {
        &mut self.runtime
    }

    /// Allocate the surface of a declared named output on the bound graph.
    pub fn create_output_render_target(
        &mut self,
        name: &str,
        config: &OutputConfig,
    ) -> Option<Arc<Surface>> {
        let Some(graph) = self.graph.as_mut() else {
            log::warn!("GraphManager: no graph to create output `{}` on", name);
            return None;
        };
        graph.create_output_render_target(name, config, &mut self.runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, PixelFormat};
    use crate::shader_graph::config::ConfigMethod;

    fn manager() -> GraphManager {
        GraphManager::new(Box::new(DummyBackend::new()), GraphSettings::new())
    }

    #[test]
    fn test_execute_without_graph() {
        let mut manager = manager();
        assert_eq!(manager.execute(), Err(GraphError::NoGraph));
    }

    #[test]
    fn test_initialize_without_type() {
        let mut manager = manager();
        assert_eq!(manager.initialize(None), Err(GraphError::NoGraphType));
        assert!(manager.graph().is_none());
    }

    #[test]
    fn test_graph_type_instantiated_once() {
        let graph_type = GraphType::new("Small", || {
            Graph::new(OutputConfig::new(64, 64, PixelFormat::Rgba8Unorm))
        });
        let mut manager = manager().with_graph_type(graph_type);

        manager.initialize(None).unwrap();
        assert_eq!(manager.graph().unwrap().type_name(), Some("Small"));
        manager
            .graph_mut()
            .unwrap()
            .set_output_config(OutputConfig::new(8, 8, PixelFormat::Rgba8Unorm));

        // Same type: the bound graph is kept.
        manager.initialize(None).unwrap();
        assert_eq!(manager.graph().unwrap().output_config().width, 8);
    }

    #[test]
    fn test_backend_downcast() {
        let manager = manager();
        assert!(manager.runtime().backend_as::<DummyBackend>().is_some());
        assert_eq!(manager.runtime().backend().name(), "Dummy Backend");
    }

    #[test]
    fn test_reset_drops_graph_and_pool() {
        let mut manager = manager();
        manager.execute_graph(Graph::default()).unwrap();
        manager
            .runtime_mut()
            .acquire_surface(&OutputConfig::default());
        assert_eq!(manager.runtime().surface_pool().len(), 1);

        manager.reset();
        assert!(manager.graph().is_none());
        assert!(manager.runtime().surface_pool().is_empty());
    }

    #[test]
    fn test_graph_output_through_manager() {
        let mut manager = manager();
        let mut graph = Graph::default();
        graph.add_output("Color", OutputConfig::default(), ConfigMethod::Absolute);
        manager.initialize(Some(graph)).unwrap();
        let surface = manager
            .create_output_render_target("Color", &OutputConfig::default())
            .unwrap();

        manager.clear_outputs();
        assert_eq!(manager.graph_output("Color").unwrap().id(), surface.id());
    }
}
