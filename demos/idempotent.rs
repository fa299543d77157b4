//! A oneshot node seeds a permanent resource; the graph is reset and run
//! three times, but the seed only ever runs once.

use dataflow_engine::executor::SerialExecutor;
use dataflow_engine::{EngineResult, Graph, ResourceFlags};

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt::init();

    let graph = Graph::new();

    graph
        .add_oneshot_node(|reg| {
            let out =
                reg.register_output_resource_with_flags::<i32>("config", ResourceFlags::Permanent)?;
            Ok(move || {
                println!("seed: running (should only print once)");
                let _ = out.set(100);
                let _ = out.make_available();
            })
        })?
        .set_name("seed");

    graph
        .add_node(|reg| {
            let config =
                reg.register_input_resource_with_flags::<i32>("config", ResourceFlags::Permanent)?;
            Ok(move || {
                if let Ok(v) = config.get() {
                    println!("consumer: config = {}", *v);
                }
            })
        })?
        .set_name("consumer");

    let executor = SerialExecutor::new(graph);
    for run in 0..3 {
        println!("--- run {run} ---");
        executor.execute()?;
        executor.graph().reset(false);
    }
    Ok(())
}
