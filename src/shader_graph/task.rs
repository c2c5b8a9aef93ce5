//! Task definitions for the shader graph

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::{OutputConfig, Surface};

use super::config::{ConfigMethod, TaskConfig};
use super::context::TaskContext;
use super::slot::SurfaceSlot;

/// Position of a task in its graph's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Id of the task at `index` in the queue, e.g. to reference a task
    /// that has not been added yet.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where a task is in the current execution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskLifecycle {
    #[default]
    Unbound,
    Initialized,
    Executing,
    Completed,
}

/// An upstream task output a task reads under a symbolic input name.
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub task: TaskId,
    /// Filled in when the upstream task finishes; empty until then.
    pub output: SurfaceSlot,
}

/// A slot on a downstream task that receives an upstream task's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTarget {
    /// The downstream task's own output slot
    Output(TaskId),
    /// The dependency registered under `input` on the downstream task
    Dependency { task: TaskId, input: String },
}

impl SlotTarget {
    pub fn task(&self) -> TaskId {
        match self {
            SlotTarget::Output(task) => *task,
            SlotTarget::Dependency { task, .. } => *task,
        }
    }
}

/// A texture parameter: either a fixed surface or another task's output.
#[derive(Debug, Clone)]
pub enum TextureInput {
    Surface(Arc<Surface>),
    Task(TaskId),
}

impl From<Arc<Surface>> for TextureInput {
    fn from(surface: Arc<Surface>) -> Self {
        Self::Surface(surface)
    }
}

impl From<TaskId> for TextureInput {
    fn from(task: TaskId) -> Self {
        Self::Task(task)
    }
}

/// What a finished task hands over to the graph
#[derive(Debug)]
pub struct OutputHandoff {
    pub output: SurfaceSlot,
    pub targets: Vec<SlotTarget>,
}

/// State shared by every task: config inheritance, slots and links.
#[derive(Debug)]
pub struct TaskCore {
    pub label: Option<String>,
    pub config: TaskConfig,
    pub config_method: ConfigMethod,
    pub requires_output: bool,
    /// Task this one inherits its config from under [`ConfigMethod::Input`],
    /// and whose output it takes over when both resolve to the same config.
    pub output_task: Option<TaskId>,
    pub(crate) output: SurfaceSlot,
    pub(crate) dependencies: BTreeMap<String, DependencyEntry>,
    pub(crate) linked_targets: Vec<SlotTarget>,
    pub(crate) lifecycle: TaskLifecycle,
}

impl Default for TaskCore {
    fn default() -> Self {
        Self {
            label: None,
            config: TaskConfig::default(),
            config_method: ConfigMethod::Parent,
            requires_output: true,
            output_task: None,
            output: SurfaceSlot::default(),
            dependencies: BTreeMap::new(),
            linked_targets: Vec::new(),
            lifecycle: TaskLifecycle::Unbound,
        }
    }
}

impl TaskCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &SurfaceSlot {
        &self.output
    }

    pub fn output_surface(&self) -> Option<&Arc<Surface>> {
        self.output.surface()
    }

    pub fn lifecycle(&self) -> TaskLifecycle {
        self.lifecycle
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &DependencyEntry)> {
        self.dependencies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn linked_targets(&self) -> &[SlotTarget] {
        &self.linked_targets
    }

    /// Register `task`'s output as the input called `name`.
    pub fn add_dependency(&mut self, name: impl Into<String>, task: TaskId) {
        self.dependencies.insert(
            name.into(),
            DependencyEntry {
                task,
                output: SurfaceSlot::default(),
            },
        );
    }

    /// Surface delivered for the input called `name`, if any.
    pub fn dependency_output(&self, name: &str) -> Option<&Arc<Surface>> {
        self.dependencies.get(name).and_then(|d| d.output.surface())
    }

    /// Ask this task to alias its output into `target` once it completes.
    pub fn link_output_dependency(&mut self, target: SlotTarget) {
        if !self.linked_targets.contains(&target) {
            self.linked_targets.push(target);
        }
    }

    /// Links this task requests on upstream tasks, as `(upstream, target)`.
    ///
    /// Every dependency asks its upstream task for the output. The output-chain
    /// task additionally writes straight into this task's output slot when
    /// both resolve to the same config. Links to this task or to later tasks
    /// are dropped, since those complete after this task has released its slots.
    pub fn output_links(
        &self,
        self_id: TaskId,
        resolved: &[OutputConfig],
    ) -> Vec<(TaskId, SlotTarget)> {
        let mut links = Vec::with_capacity(self.dependencies.len() + 1);

        for (name, entry) in &self.dependencies {
            if entry.task >= self_id {
                log::warn!(
                    "Task {:?}: dependency `{}` on {:?} is not an earlier task, ignoring",
                    self_id,
                    name,
                    entry.task
                );
                continue;
            }
            links.push((
                entry.task,
                SlotTarget::Dependency {
                    task: self_id,
                    input: name.clone(),
                },
            ));
        }

        if let Some(upstream) = self.output_task {
            if upstream >= self_id {
                log::warn!(
                    "Task {:?}: output task {:?} is not an earlier task, ignoring",
                    self_id,
                    upstream
                );
            } else if self.requires_output
                && resolved.get(upstream.0) == resolved.get(self_id.0)
            {
                links.push((upstream, SlotTarget::Output(self_id)));
            }
        }

        links
    }

    pub(crate) fn begin_initialize(&mut self) {
        self.dependencies.clear();
        self.linked_targets.clear();
        self.output.release();
        self.lifecycle = TaskLifecycle::Initialized;
    }

    pub(crate) fn begin_execute(&mut self) {
        assert_eq!(
            self.lifecycle,
            TaskLifecycle::Initialized,
            "task executed without being initialized"
        );
        self.lifecycle = TaskLifecycle::Executing;
    }

    /// Release everything this task holds and return its output with the
    /// targets it must be aliased into.
    pub(crate) fn post_execute(&mut self) -> OutputHandoff {
        assert_eq!(
            self.lifecycle,
            TaskLifecycle::Executing,
            "post_execute called on a task that is not executing"
        );
        self.dependencies.clear();
        self.lifecycle = TaskLifecycle::Completed;

        OutputHandoff {
            output: self.output.take(),
            targets: std::mem::take(&mut self.linked_targets),
        }
    }

    /// Store a slot handed over by an upstream task.
    pub(crate) fn receive(&mut self, target: &SlotTarget, slot: &SurfaceSlot) {
        match target {
            SlotTarget::Output(_) => self.output = slot.clone(),
            SlotTarget::Dependency { input, .. } => {
                if let Some(entry) = self.dependencies.get_mut(input) {
                    entry.output = slot.clone();
                }
            }
        }
    }
}

/// A unit of work scheduled on a [`Graph`](super::Graph).
///
/// The graph drives every task through `initialize`, then `execute` and
/// `post_execute` in queue order. Slot handling lives in [`TaskCore`]; tasks
/// only register their inputs and issue backend commands.
pub trait GraphTask: Send + Sync {
    /// Get the task name for debugging
    fn name(&self) -> &str;

    fn core(&self) -> &TaskCore;
    fn core_mut(&mut self) -> &mut TaskCore;

    /// Register upstream inputs with [`TaskCore::add_dependency`].
    fn initialize(&mut self, _ctx: &mut TaskContext<'_>) {}

    /// Produce this task's output. A missing input or resource skips the
    /// effect; it never aborts the graph.
    fn execute(&mut self, ctx: &mut TaskContext<'_>);

    /// Release task-specific state after `execute`.
    fn post_execute(&mut self, _ctx: &mut TaskContext<'_>) {}

    /// Allow downcasting
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Builder-style setters for anything exposing a [`TaskCore`].
pub trait TaskBuilderExt: GraphTask + Sized {
    fn with_config(mut self, config: TaskConfig, method: ConfigMethod) -> Self {
        let core = self.core_mut();
        core.config = config;
        core.config_method = method;
        self
    }

    fn with_config_method(mut self, method: ConfigMethod) -> Self {
        self.core_mut().config_method = method;
        self
    }

    fn with_output_task(mut self, task: TaskId) -> Self {
        self.core_mut().output_task = Some(task);
        self
    }

    fn with_label(mut self, label: impl Into<String>) -> Self {
        self.core_mut().label = Some(label.into());
        self
    }
}

impl<T: GraphTask + Sized> TaskBuilderExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SurfaceId;

    fn slot(id: u64) -> SurfaceSlot {
        SurfaceSlot::new(Surface::new(
            SurfaceId::new(id),
            OutputConfig::default(),
            None,
        ))
    }

    #[test]
    fn test_output_links_skip_later_tasks() {
        let mut core = TaskCore::new();
        core.add_dependency("Early", TaskId(0));
        core.add_dependency("Late", TaskId(3));
        core.output_task = Some(TaskId(2));

        let resolved = vec![OutputConfig::default(); 4];
        let links = core.output_links(TaskId(2), &resolved);

        assert_eq!(
            links,
            vec![(
                TaskId(0),
                SlotTarget::Dependency {
                    task: TaskId(2),
                    input: "Early".to_string()
                }
            )]
        );
    }

    #[test]
    fn test_output_link_requires_equal_config() {
        let mut core = TaskCore::new();
        core.output_task = Some(TaskId(0));

        let same = vec![OutputConfig::default(); 2];
        assert_eq!(
            core.output_links(TaskId(1), &same),
            vec![(TaskId(0), SlotTarget::Output(TaskId(1)))]
        );

        let different = vec![
            OutputConfig::default(),
            OutputConfig::default().with_linear_gamma(true),
        ];
        assert!(core.output_links(TaskId(1), &different).is_empty());

        core.requires_output = false;
        assert!(core.output_links(TaskId(1), &same).is_empty());
    }

    #[test]
    fn test_post_execute_releases_everything() {
        let pooled = slot(1);
        let mut core = TaskCore::new();
        core.begin_initialize();
        core.add_dependency("Source", TaskId(0));
        core.receive(
            &SlotTarget::Dependency {
                task: TaskId(1),
                input: "Source".to_string(),
            },
            &pooled,
        );
        core.link_output_dependency(SlotTarget::Output(TaskId(2)));
        core.begin_execute();
        core.output = pooled.clone();
        assert_eq!(pooled.reference_count(), 3);

        let handoff = core.post_execute();
        assert_eq!(core.lifecycle(), TaskLifecycle::Completed);
        assert!(core.output().is_empty());
        assert!(core.linked_targets().is_empty());
        assert_eq!(handoff.targets, vec![SlotTarget::Output(TaskId(2))]);

        drop(handoff);
        assert!(pooled.is_free());
    }

    #[test]
    #[should_panic(expected = "not executing")]
    fn test_post_execute_requires_execution() {
        let mut core = TaskCore::new();
        core.begin_initialize();
        core.post_execute();
    }

    #[test]
    fn test_link_output_dependency_deduplicates() {
        let mut core = TaskCore::new();
        core.link_output_dependency(SlotTarget::Output(TaskId(4)));
        core.link_output_dependency(SlotTarget::Output(TaskId(4)));
        assert_eq!(core.linked_targets().len(), 1);
        assert_eq!(core.linked_targets()[0].task(), TaskId(4));
    }
}
