//! A -> {B, C} -> D, run on the pool executor.
//!
//! Mirrors the classic diamond from the engine's design notes: B and C
//! both depend on A's output and can run concurrently once it lands; D
//! waits on both.

use dataflow_engine::executor::{PoolExecutor, RayonPool};
use dataflow_engine::{EngineResult, Graph};

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt::init();

    let graph = Graph::new();

    graph
        .add_node(|reg| {
            let b = reg.register_output_resource::<i32>("b")?;
            let c = reg.register_output_resource::<i32>("c")?;
            Ok(move || {
                println!("A: producing b and c");
                let _ = b.set(3);
                let _ = b.make_available();
                let _ = c.set(10);
                let _ = c.make_available();
            })
        })?
        .set_name("A");

    graph
        .add_node(|reg| {
            let b = reg.register_input_resource::<i32>("b")?;
            Ok(move || {
                if let Ok(v) = b.get() {
                    println!("B: b = {}", *v);
                }
            })
        })?
        .set_name("B");

    graph
        .add_node(|reg| {
            let c = reg.register_input_resource::<i32>("c")?;
            Ok(move || {
                if let Ok(v) = c.get() {
                    println!("C: c = {}", *v);
                }
            })
        })?
        .set_name("C");

    graph
        .add_node(|reg| {
            let b = reg.register_input_resource::<i32>("b")?;
            let c = reg.register_input_resource::<i32>("c")?;
            Ok(move || {
                let b = b.get().map(|v| *v).unwrap_or(0);
                let c = c.get().map(|v| *v).unwrap_or(0);
                println!("D: b + c = {}", b + c);
            })
        })?
        .set_name("D");

    let pool = RayonPool::new(4)?;
    let executor = PoolExecutor::new(graph, pool);
    executor.execute();
    executor.wait()?;
    Ok(())
}
