//! The graph: owns every exec record and resource record, and exposes the
//! registration, scheduling, and reset API described in SPEC_FULL.md §4.5.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex, RwLock};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::exec::{ExecRecord, NodeFlags};
use crate::resource::{InputHandle, OutputHandle, ResourceFlags, ResourceRecord, ResourceRef};

/// Callback invoked once per transition of a node to the scheduled state.
/// This is the pluggable strategy object that lets one graph model serve
/// both the serial queue and the pool push (SPEC_FULL.md §9).
pub(crate) type OnSchedule = Box<dyn Fn(Arc<ExecRecord>) + Send + Sync>;

pub(crate) struct GraphInner {
    nodes: RwLock<Vec<Arc<ExecRecord>>>,
    resources: RwLock<HashMap<String, Arc<ResourceRecord>>>,
    num_running: AtomicUsize,
    num_to_execute: AtomicUsize,
    on_schedule: RwLock<Option<OnSchedule>>,
    config: EngineConfig,
    idle_lock: Mutex<()>,
    idle_cv: Condvar,
    last_error: Mutex<Option<EngineError>>,
}

impl GraphInner {
    pub(crate) fn schedule(&self, node: Arc<ExecRecord>) {
        self.num_to_execute.fetch_add(1, Ordering::AcqRel);
        if self.config.log_schedule_events {
            tracing::trace!(node = %node.name(), "scheduled");
        }
        let hook = self.on_schedule.read();
        if let Some(f) = hook.as_ref() {
            f(node);
        }
    }

    pub(crate) fn inc_running(&self) {
        self.num_running.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn dec_running(&self) {
        self.num_running.fetch_sub(1, Ordering::AcqRel);
        self.maybe_notify_idle();
    }

    pub(crate) fn dec_to_execute(&self) {
        self.num_to_execute.fetch_sub(1, Ordering::AcqRel);
        self.maybe_notify_idle();
    }

    fn maybe_notify_idle(&self) {
        if self.num_to_execute.load(Ordering::Acquire) == 0
            && self.num_running.load(Ordering::Acquire) == 0
        {
            let _guard = self.idle_lock.lock();
            self.idle_cv.notify_all();
        }
    }

    pub(crate) fn wait_until_idle(&self) {
        let mut guard = self.idle_lock.lock();
        while self.num_to_execute.load(Ordering::Acquire) != 0
            || self.num_running.load(Ordering::Acquire) != 0
        {
            self.idle_cv.wait_for(&mut guard, self.config.wait_poll_interval);
        }
    }

    pub(crate) fn record_error(&self, err: EngineError) {
        tracing::warn!(error = %err, "node execution failed");
        let mut slot = self.last_error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// A directed bipartite graph of compute nodes and typed resources.
///
/// Construction and `reset` are not safe to call concurrently with
/// execution; callers must quiesce the executor first (see
/// [`crate::executor::PoolExecutor::wait`]).
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Arc<GraphInner>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph with default [`EngineConfig`].
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an empty graph with the given executor configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                nodes: RwLock::new(Vec::new()),
                resources: RwLock::new(HashMap::new()),
                num_running: AtomicUsize::new(0),
                num_to_execute: AtomicUsize::new(0),
                on_schedule: RwLock::new(None),
                config,
                idle_lock: Mutex::new(()),
                idle_cv: Condvar::new(),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Adds a node that may run on every subsequent run (the common case).
    ///
    /// `ctor` receives a [`Registry`] scoped to the new node and must
    /// return the node's body: an `FnMut() + Send` closure invoked with no
    /// arguments and no return value, which reads its inputs and writes its
    /// outputs through the handles it captured while registering them.
    pub fn add_node<Body, F>(&self, ctor: F) -> EngineResult<NodeRef>
    where
        Body: FnMut() + Send + 'static,
        F: FnOnce(&Registry<'_>) -> EngineResult<Body>,
    {
        self.add_node_with_flags(NodeFlags::ExecuteMultiple, ctor)
    }

    /// Adds a node that runs at most once, ever. Every resource it
    /// produces must be registered with [`ResourceFlags::Permanent`];
    /// otherwise this returns [`EngineError::OneshotWithResetable`].
    pub fn add_oneshot_node<Body, F>(&self, ctor: F) -> EngineResult<NodeRef>
    where
        Body: FnMut() + Send + 'static,
        F: FnOnce(&Registry<'_>) -> EngineResult<Body>,
    {
        self.add_node_with_flags(NodeFlags::ExecuteOnce, ctor)
    }

    fn add_node_with_flags<Body, F>(&self, flags: NodeFlags, ctor: F) -> EngineResult<NodeRef>
    where
        Body: FnMut() + Send + 'static,
        F: FnOnce(&Registry<'_>) -> EngineResult<Body>,
    {
        let default_name = std::any::type_name::<Body>().to_string();
        let node = ExecRecord::new(default_name, flags, Arc::downgrade(&self.inner));

        let registry = Registry {
            graph: &self.inner,
            node: &node,
        };
        let mut body = ctor(&registry)?;

        if flags == NodeFlags::ExecuteOnce {
            for weak in node.produced_snapshot() {
                if let Some(resource) = weak.upgrade() {
                    if resource.flags() != ResourceFlags::Permanent {
                        return Err(EngineError::OneshotWithResetable {
                            node: node.name(),
                            resource: resource.name().to_string(),
                        });
                    }
                }
            }
        }

        node.set_body(Box::new(move || body()));
        tracing::debug!(node = %node.name(), ?flags, "node added");
        self.inner.nodes.write().push(node.clone());
        Ok(NodeRef { node })
    }

    /// Looks up a resource by name. `None` if nothing has ever registered
    /// it as an input or output.
    pub fn get_resource(&self, name: &str) -> Option<ResourceHandle> {
        self.inner
            .resources
            .read()
            .get(name)
            .cloned()
            .map(|record| ResourceHandle { record })
    }

    /// Implements the inter-run protocol (SPEC_FULL.md §4.5):
    /// - every exec record's `executed`/`scheduled` latches are cleared;
    ///   `execute_once` records that have already run are dropped from the
    ///   active set.
    /// - every non-`permanent` resource goes back to `available = false`
    ///   (and, if `destroy_resources` is set, the whole resource map is
    ///   cleared instead, dropping even `permanent` values).
    ///
    /// Not safe to call while an executor has work in flight.
    pub fn reset(&self, destroy_resources: bool) {
        {
            let mut nodes = self.inner.nodes.write();
            nodes.retain(|n| {
                let drop_after_reset = n.flags() == NodeFlags::ExecuteOnce && n.is_executed();
                n.clear_latches();
                !drop_after_reset
            });
        }

        if destroy_resources {
            self.inner.resources.write().clear();
        } else {
            let resources = self.inner.resources.read();
            for resource in resources.values() {
                if resource.flags() != ResourceFlags::Permanent {
                    resource.reset_availability();
                }
            }
        }
        *self.inner.last_error.lock() = None;
    }

    /// Number of nodes currently in the active set.
    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    /// Number of nodes scheduled but not yet run-to-completion. Used by
    /// the pool executor's `wait`.
    pub fn num_to_execute(&self) -> usize {
        self.inner.num_to_execute.load(Ordering::Acquire)
    }

    /// Number of node bodies currently executing on some thread. Used by
    /// the pool executor's `wait`.
    pub fn num_running(&self) -> usize {
        self.inner.num_running.load(Ordering::Acquire)
    }

    /// The first error recorded since the last `reset`, if any node failed
    /// (missing producer, panic, ...). Executors that run bodies off the
    /// calling thread surface failures here since the run closure itself
    /// returns `()` to the pool.
    pub fn last_error(&self) -> Option<EngineError> {
        self.inner.last_error.lock().clone()
    }

    pub(crate) fn set_on_schedule<F>(&self, f: F)
    where
        F: Fn(Arc<ExecRecord>) + Send + Sync + 'static,
    {
        *self.inner.on_schedule.write() = Some(Box::new(f));
    }

    pub(crate) fn inner_handle(&self) -> Weak<GraphInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn nodes_snapshot(&self) -> Vec<Arc<ExecRecord>> {
        self.inner.nodes.read().clone()
    }

    /// Count of active nodes that never ran this pass. Nonzero only if a
    /// node's requirements never all became available — a cycle, or a
    /// required resource with no producer in this graph
    /// (SPEC_FULL.md §7, `CycleDetected`).
    pub(crate) fn stalled_count(&self) -> usize {
        self.inner
            .nodes
            .read()
            .iter()
            .filter(|n| !n.is_executed())
            .count()
    }

    pub(crate) fn schedule(&self, node: Arc<ExecRecord>) {
        self.inner.schedule(node);
    }

    pub(crate) fn wait_until_idle(&self) {
        self.inner.wait_until_idle();
    }

    pub(crate) fn record_error(&self, err: EngineError) {
        self.inner.record_error(err);
    }

    /// Renders the graph as a DOT digraph: exec records as boxes, resource
    /// records as circles, edges in the producer/consumer direction. A
    /// diagnostic convenience only (SPEC_FULL.md §4.5).
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph G {\n");
        for node in self.inner.nodes.read().iter() {
            out.push_str(&format!("  \"{}\" [shape=box];\n", node.name()));
        }
        for name in self.inner.resources.read().keys() {
            out.push_str(&format!("  \"{name}\" [shape=circle];\n"));
        }
        for node in self.inner.nodes.read().iter() {
            for weak in node.required_snapshot() {
                if let Some(resource) = weak.upgrade() {
                    out.push_str(&format!(
                        "  \"{}\" -> \"{}\";\n",
                        resource.name(),
                        node.name()
                    ));
                }
            }
            for weak in node.produced_snapshot() {
                if let Some(resource) = weak.upgrade() {
                    out.push_str(&format!(
                        "  \"{}\" -> \"{}\";\n",
                        node.name(),
                        resource.name()
                    ));
                }
            }
        }
        out.push_str("}\n");
        out
    }

    /// Prints [`Graph::to_dot`] to standard output.
    pub fn print(&self) {
        println!("{}", self.to_dot());
    }
}

/// A handle to one node, returned by `add_node`/`add_oneshot_node`.
#[derive(Clone)]
pub struct NodeRef {
    node: Arc<ExecRecord>,
}

impl NodeRef {
    /// Overrides the node's default name (the body type's name).
    pub fn set_name(&self, name: impl Into<String>) -> &Self {
        self.node.set_name(name.into());
        self
    }

    /// The node's current name.
    pub fn name(&self) -> String {
        self.node.name()
    }

    /// Whether this node's body has run (since the last `reset`).
    pub fn is_executed(&self) -> bool {
        self.node.is_executed()
    }
}

/// A handle to one resource, returned by [`Graph::get_resource`].
#[derive(Clone)]
pub struct ResourceHandle {
    record: Arc<ResourceRecord>,
}

impl ResourceHandle {
    /// The resource's name.
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// The resource's lifecycle flags.
    pub fn flags(&self) -> ResourceFlags {
        self.record.flags()
    }

    /// Whether the resource currently holds an available value.
    pub fn is_available(&self) -> bool {
        self.record.is_available()
    }

    /// Reads the resource's value as `T`, failing if it is not available
    /// or was registered under a different type.
    pub fn value<T: Any + Send + Sync + 'static>(&self) -> EngineResult<ResourceRef<T>> {
        self.record.get_value::<T>().map(ResourceRef::new)
    }
}

/// The per-node view into the graph's resource registry, passed to each
/// node constructor (SPEC_FULL.md §4.2).
pub struct Registry<'g> {
    graph: &'g GraphInner,
    node: &'g Arc<ExecRecord>,
}

impl<'g> Registry<'g> {
    /// Registers (or attaches to an existing) output resource with
    /// [`ResourceFlags::Resetable`].
    pub fn register_output_resource<T: Any + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> EngineResult<OutputHandle<T>> {
        self.register_output_resource_with_flags(name, ResourceFlags::Resetable)
    }

    /// Registers (or attaches to an existing) output resource with
    /// explicit lifecycle flags.
    pub fn register_output_resource_with_flags<T: Any + Send + Sync + 'static>(
        &self,
        name: &str,
        flags: ResourceFlags,
    ) -> EngineResult<OutputHandle<T>> {
        let record = self.resolve_resource::<T>(name, flags)?;
        record.check_type::<T>()?;
        record.check_flags(flags)?;
        record.bind_producer(self.node)?;
        self.node.add_produced(Arc::downgrade(&record));
        Ok(OutputHandle::new(Arc::downgrade(&record), name.to_string()))
    }

    /// Registers (or attaches to an existing) input resource with
    /// [`ResourceFlags::Resetable`].
    pub fn register_input_resource<T: Any + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> EngineResult<InputHandle<T>> {
        self.register_input_resource_with_flags(name, ResourceFlags::Resetable)
    }

    /// Registers (or attaches to an existing) input resource with explicit
    /// lifecycle flags.
    pub fn register_input_resource_with_flags<T: Any + Send + Sync + 'static>(
        &self,
        name: &str,
        flags: ResourceFlags,
    ) -> EngineResult<InputHandle<T>> {
        let record = self.resolve_resource::<T>(name, flags)?;
        record.check_type::<T>()?;
        record.check_flags(flags)?;
        record.add_consumer(self.node);
        self.node.add_required(Arc::downgrade(&record));
        Ok(InputHandle::new(Arc::downgrade(&record), name.to_string()))
    }

    /// Creates the resource record on first registration of `name` under
    /// any type/flags; subsequent calls return the existing record
    /// unchanged (flags/type are validated by the caller right after).
    fn resolve_resource<T: Any + Send + Sync + 'static>(
        &self,
        name: &str,
        flags: ResourceFlags,
    ) -> EngineResult<Arc<ResourceRecord>> {
        let mut resources = self.graph.resources.write();
        if let Some(existing) = resources.get(name) {
            return Ok(existing.clone());
        }
        let record = Arc::new(ResourceRecord::new(name.to_string(), TypeId::of::<T>(), flags));
        resources.insert(name.to_string(), record.clone());
        Ok(record)
    }
}
