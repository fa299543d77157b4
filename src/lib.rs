//! An in-process dataflow execution engine.
//!
//! A [`Graph`] is a directed bipartite graph of compute nodes (exec
//! records) and typed value slots (resources). Nodes declare the
//! resources they require and the resources they produce; the moment
//! every resource a node requires is available, the node becomes
//! runnable and is handed to whichever [`executor`] drives the graph.
//! Running a node may make more resources available, which in turn makes
//! more nodes runnable, propagating readiness through the graph without
//! any central scheduling pass.
//!
//! ```
//! # fn main() -> dataflow_engine::EngineResult<()> {
//! use dataflow_engine::{Graph, executor::SerialExecutor};
//!
//! let graph = Graph::new();
//! graph.add_node(|reg| {
//!     let out = reg.register_output_resource::<i32>("answer")?;
//!     Ok(move || {
//!         let _ = out.set(42);
//!         let _ = out.make_available();
//!     })
//! })?;
//!
//! let executor = SerialExecutor::new(graph);
//! executor.execute()?;
//! let resource = executor.graph().get_resource("answer").ok_or_else(|| {
//!     dataflow_engine::EngineError::UnknownResource { name: "answer".into() }
//! })?;
//! assert_eq!(*resource.value::<i32>()?, 42);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub(crate) mod exec;
pub mod executor;
pub mod graph;
pub mod resource;

pub mod error;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{EngineError, EngineResult};
pub use exec::NodeFlags;
pub use graph::{Graph, NodeRef, Registry, ResourceHandle};
pub use resource::{InputHandle, OutputHandle, ResourceFlags, ResourceRef};
