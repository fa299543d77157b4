use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::graph::Graph;

/// A place to hand off a unit of work. Implemented so callers can plug in
/// their own pool (a `tokio` runtime's `spawn_blocking`, an application's
/// existing worker threads, ...) instead of [`RayonPool`]; grounded on the
/// source's `threaded_executor<ThreadPool_t>` template, which is generic
/// over any type exposing a `push`.
pub trait WorkPool: Send + Sync {
    /// Submits `job` to run on some worker. Must not block the caller
    /// waiting for `job` to finish.
    fn submit(&self, job: Box<dyn FnOnce() + Send + 'static>);
}

/// The engine's default [`WorkPool`], backed by a dedicated `rayon`
/// thread pool (not the global one, so an embedding application's own
/// rayon usage is unaffected).
pub struct RayonPool {
    pool: rayon::ThreadPool,
}

impl RayonPool {
    /// Builds a pool with `num_threads` workers.
    pub fn new(num_threads: usize) -> EngineResult<Self> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("dataflow-engine-{i}"))
            .build()
            .map(|pool| Self { pool })
            .map_err(|e| EngineError::Internal(e.to_string()))
    }
}

impl WorkPool for RayonPool {
    fn submit(&self, job: Box<dyn FnOnce() + Send + 'static>) {
        self.pool.spawn(job);
    }
}

/// Drives a graph by submitting each ready node's body to a [`WorkPool`]
/// as it becomes ready, rather than running it on the calling thread.
/// Grounded on the source's `threaded_executor`.
pub struct PoolExecutor<P: WorkPool> {
    graph: Graph,
    pool: Arc<P>,
}

impl<P: WorkPool + 'static> PoolExecutor<P> {
    /// Installs this executor's scheduling hook on `graph`, routing every
    /// node that becomes ready to `pool`.
    pub fn new(graph: Graph, pool: P) -> Self {
        let pool = Arc::new(pool);
        let pool_handle = pool.clone();
        let graph_handle = graph.clone();
        graph.set_on_schedule(move |node| {
            let graph_for_job = graph_handle.clone();
            pool_handle.submit(Box::new(move || {
                if let Err(err) = node.run() {
                    graph_for_job.record_error(err);
                }
            }));
        });
        Self { graph, pool }
    }

    /// Triggers every node with no unmet requirements; their bodies (and
    /// anything they make ready in turn) run asynchronously on the pool.
    /// Returns immediately. Call [`PoolExecutor::wait`] to block until the
    /// graph quiesces.
    pub fn execute(&self) {
        let node_count = self.graph.node_count();
        tracing::info!(node_count, "pool executor: starting execute");
        for node in self.graph.nodes_snapshot() {
            node.trigger();
        }
    }

    /// Blocks until no node is scheduled or running, then returns the
    /// first error recorded during this run, if any.
    pub fn wait(&self) -> EngineResult<()> {
        self.graph.wait_until_idle();

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
        tracing::info!(
            node_count = self.graph.node_count(),
            ok = result.is_ok(),
            "pool executor: wait finished"
        );
        result
    }

    /// The underlying pool, e.g. to submit unrelated work on the same
    /// threads.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// The graph this executor drives.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}
