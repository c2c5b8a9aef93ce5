//! Shared helpers for shader graph integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use shader_graph::{
    ConfigMethod, DummyBackend, DummyCommand, GraphManager, GraphSettings, GraphTask,
    OutputConfig, PixelFormat, SurfaceId, TaskConfig, TaskContext, TaskCore, TaskId,
};

pub const ROOT: OutputConfig = OutputConfig::new(256, 256, PixelFormat::Rgba16Float);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn manager() -> GraphManager {
    init_logger();
    GraphManager::new(Box::new(DummyBackend::new()), GraphSettings::new())
}

pub fn manager_with(settings: GraphSettings) -> GraphManager {
    init_logger();
    GraphManager::new(Box::new(DummyBackend::new()), settings)
}

pub fn dummy(manager: &GraphManager) -> &DummyBackend {
    manager
        .runtime()
        .backend_as::<DummyBackend>()
        .expect("manager runs on the dummy backend")
}

pub fn dummy_mut(manager: &mut GraphManager) -> &mut DummyBackend {
    manager
        .runtime_mut()
        .backend_as_mut::<DummyBackend>()
        .expect("manager runs on the dummy backend")
}

/// Targets of every recorded `ApplyMaterial` command, in order.
pub fn apply_targets(manager: &GraphManager) -> Vec<SurfaceId> {
    dummy(manager)
        .commands()
        .iter()
        .filter_map(|c| match c {
            DummyCommand::ApplyMaterial { target, .. } => Some(*target),
            _ => None,
        })
        .collect()
}

pub fn absolute(width: u32, height: u32) -> TaskConfig {
    TaskConfig::new(OutputConfig::new(width, height, PixelFormat::Rgba16Float))
}

// ============================================================================
// Probe task
// ============================================================================

/// What a [`ProbeTask`] observed while executing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    pub task: TaskId,
    pub output: Option<SurfaceId>,
    pub config: OutputConfig,
    pub inputs: Vec<(String, Option<SurfaceId>)>,
}

pub type ProbeLog = Arc<Mutex<Vec<ProbeRecord>>>;

pub fn probe_log() -> ProbeLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Find the record of `task` in `log`.
pub fn record(log: &ProbeLog, task: TaskId) -> ProbeRecord {
    log.lock()
        .iter()
        .rev()
        .find(|r| r.task == task)
        .cloned()
        .expect("task was executed")
}

/// Task that draws nothing and records its slots.
pub struct ProbeTask {
    core: TaskCore,
    inputs: Vec<(String, TaskId)>,
    log: ProbeLog,
}

impl ProbeTask {
    pub fn new(log: &ProbeLog) -> Self {
        Self {
            core: TaskCore::new(),
            inputs: Vec::new(),
            log: Arc::clone(log),
        }
    }

    pub fn with_input(mut self, name: &str, task: TaskId) -> Self {
        self.inputs.push((name.to_string(), task));
        self
    }

    pub fn without_output(mut self) -> Self {
        self.core.requires_output = false;
        self
    }

    pub fn input(log: &ProbeLog, method: ConfigMethod, config: TaskConfig) -> Self {
        let mut task = Self::new(log);
        task.core.config = config;
        task.core.config_method = method;
        task
    }
}

impl GraphTask for ProbeTask {
    fn name(&self) -> &str {
        "Probe"
    }

    fn core(&self) -> &TaskCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TaskCore {
        &mut self.core
    }

    fn initialize(&mut self, _ctx: &mut TaskContext<'_>) {
        for (name, task) in &self.inputs {
            self.core.add_dependency(name.clone(), *task);
        }
    }

    fn execute(&mut self, ctx: &mut TaskContext<'_>) {
        let inputs = self
            .inputs
            .iter()
            .map(|(name, _)| {
                let surface = self.core.dependency_output(name).map(|s| s.id());
                (name.clone(), surface)
            })
            .collect();

        self.log.lock().push(ProbeRecord {
            task: ctx.task_id(),
            output: self.core.output().surface_id(),
            config: ctx.output_config(),
            inputs,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
