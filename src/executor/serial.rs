use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::exec::ExecRecord;
use crate::graph::Graph;

/// Runs every ready node on the calling thread, one at a time, in the
/// order each became ready. Grounded on the source's `serial_executor`:
/// a FIFO queue fed by the scheduling hook and drained to empty.
///
/// Because scheduling and running happen on the same thread, a node's
/// body can make a sibling ready and have that sibling queued and run
/// before `execute()` returns — there is no separate "settle" pass.
pub struct SerialExecutor {
    graph: Graph,
    queue: Arc<Mutex<VecDeque<Arc<ExecRecord>>>>,
}

impl SerialExecutor {
    /// Installs this executor's scheduling hook on `graph`. A graph
    /// should have at most one live executor at a time; installing a
    /// second overwrites the first's hook.
    pub fn new(graph: Graph) -> Self {
        let queue: Arc<Mutex<VecDeque<Arc<ExecRecord>>>> = Arc::new(Mutex::new(VecDeque::new()));
        let queue_handle = queue.clone();
        graph.set_on_schedule(move |node| queue_handle.lock().push_back(node));
        Self { graph, queue }
    }

    /// Triggers every node with no unmet requirements, then drains the
    /// resulting queue to empty, running each node's body in turn. A node
    /// whose body fails (panic, or a declared output left unavailable)
    /// does not stop the drain; the first such error is returned once the
    /// queue empties, matching [`crate::graph::Graph::last_error`].
    pub fn execute(&self) -> EngineResult<()> {
        let node_count = self.graph.node_count();
        tracing::info!(node_count, "serial executor: starting execute");

        for node in self.graph.nodes_snapshot() {
            node.trigger();
        }
        loop {
            let next = self.queue.lock().pop_front();
            let Some(node) = next else {
                break;
            };
            if let Err(err) = node.run() {
                self.graph.record_error(err);
            }
        }

        let result = if let Some(err) = self.graph.last_error() {
            Err(err)
        } else {
            let remaining = self.graph.stalled_count();
            if remaining > 0 {
                Err(EngineError::CycleDetected { remaining })
            } else {
                Ok(())
            }
        };
        tracing::info!(node_count, ok = result.is_ok(), "serial executor: execute finished");
        result
    }

    /// The graph this executor drives.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}
