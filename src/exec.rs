//! Exec records: the per-node bookkeeping the graph owns.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::graph::GraphInner;
use crate::resource::ResourceRecord;

/// Whether a node runs once ever, or once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFlags {
    /// Removed from the active node set the first `reset` after it runs.
    /// Every resource it produces must be `Permanent`.
    ExecuteOnce,
    /// Runs again on every subsequent run after a `reset`.
    ExecuteMultiple,
}

type Body = Box<dyn FnMut() + Send + 'static>;

/// One compute node: an opaque body plus the edges that gate it.
pub(crate) struct ExecRecord {
    name: Mutex<String>,
    flags: NodeFlags,
    required: Mutex<Vec<Weak<ResourceRecord>>>,
    produced: Mutex<Vec<Weak<ResourceRecord>>>,
    scheduled: AtomicBool,
    executed: AtomicBool,
    exec_mutex: Mutex<()>,
    body: Mutex<Option<Body>>,
    graph: Weak<GraphInner>,
    start_time: Mutex<Option<Instant>>,
}

impl ExecRecord {
    pub(crate) fn new(default_name: String, flags: NodeFlags, graph: Weak<GraphInner>) -> Arc<Self> {
        Arc::new(Self {
            name: Mutex::new(default_name),
            flags,
            required: Mutex::new(Vec::new()),
            produced: Mutex::new(Vec::new()),
            scheduled: AtomicBool::new(false),
            executed: AtomicBool::new(false),
            exec_mutex: Mutex::new(()),
            body: Mutex::new(None),
            graph,
            start_time: Mutex::new(None),
        })
    }

    pub(crate) fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock() = name;
    }

    pub(crate) fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub(crate) fn set_body(&self, body: Body) {
        *self.body.lock() = Some(body);
    }

    pub(crate) fn add_required(&self, resource: Weak<ResourceRecord>) {
        self.required.lock().push(resource);
    }

    pub(crate) fn add_produced(&self, resource: Weak<ResourceRecord>) {
        self.produced.lock().push(resource);
    }

    pub(crate) fn produced_snapshot(&self) -> Vec<Weak<ResourceRecord>> {
        self.produced.lock().clone()
    }

    pub(crate) fn required_snapshot(&self) -> Vec<Weak<ResourceRecord>> {
        self.required.lock().clone()
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    pub(crate) fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub(crate) fn start_time(&self) -> Option<Instant> {
        *self.start_time.lock()
    }

    /// A node is ready iff every required resource still exists and is
    /// available. A resource whose exec record has been dropped (e.g. its
    /// producer was an oneshot node removed by a prior `reset`, yet this
    /// node somehow still references it) can never become available again,
    /// so a dangling requirement also reports not-ready.
    pub(crate) fn can_execute(&self) -> bool {
        self.required
            .lock()
            .iter()
            .all(|w| w.upgrade().map(|r| r.is_available()).unwrap_or(false))
    }

    /// Re-evaluates readiness; on the first transition to ready, latches
    /// `scheduled` and asks the graph to schedule this node. Called
    /// synchronously from the producer's `make_available`, possibly on a
    /// worker thread already running another node's body.
    pub(crate) fn trigger(self: &Arc<Self>) {
        if !self.can_execute() {
            return;
        }
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Some(graph) = self.graph.upgrade() {
                graph.schedule(self.clone());
            }
        }
    }

    /// Clears the run-scoped latches. Called by `reset`; never called
    /// concurrently with execution.
    pub(crate) fn clear_latches(&self) {
        self.executed.store(false, Ordering::Release);
        self.scheduled.store(false, Ordering::Release);
        *self.start_time.lock() = None;
    }

    /// Runs the body at most once, guarded by the `executed` flag and a
    /// try-locked mutex (two layers, per the engine's at-most-once
    /// discipline). Returns an error if the body panicked or left a
    /// declared output unavailable.
    pub(crate) fn run(self: &Arc<Self>) -> EngineResult<()> {
        if self.executed.load(Ordering::Acquire) {
            return Ok(());
        }
        let Some(_guard) = self.exec_mutex.try_lock() else {
            return Ok(());
        };
        if self.executed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.executed.store(true, Ordering::Release);
        *self.start_time.lock() = Some(Instant::now());

        if let Some(graph) = self.graph.upgrade() {
            graph.inc_running();
        }

        let mut body_slot = self.body.lock();
        let panic_result = body_slot
            .as_mut()
            .map(|f| panic::catch_unwind(AssertUnwindSafe(|| f())));
        drop(body_slot);

        if let Some(graph) = self.graph.upgrade() {
            graph.dec_running();
            graph.dec_to_execute();
        }

        if let Some(Err(payload)) = panic_result {
            return Err(EngineError::NodePanicked {
                node: self.name(),
                message: panic_message(&payload),
            });
        }

        for weak in self.produced.lock().iter() {
            if let Some(resource) = weak.upgrade() {
                if !resource.is_available() {
                    return Err(EngineError::MissingProducer {
                        node: self.name(),
                        resource: resource.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
