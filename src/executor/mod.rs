//! Pluggable drivers that turn a [`crate::graph::Graph`]'s readiness
//! latches into actual execution (SPEC_FULL.md §4.6–§4.8).
//!
//! A node becomes runnable the moment every resource it requires is
//! available; the graph itself only decides *that* a node is runnable
//! (`ExecRecord::trigger`) and hands the decision of *where* to run it to
//! whichever executor installed the scheduling hook. [`SerialExecutor`]
//! runs that node on the calling thread in FIFO order; [`PoolExecutor`]
//! hands it to a [`WorkPool`].

mod pool;
mod serial;

pub use pool::{PoolExecutor, RayonPool, WorkPool};
pub use serial::SerialExecutor;
