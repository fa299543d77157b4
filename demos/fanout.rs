//! One producer, several independent consumers of the same resource,
//! run on the pool executor so the consumers can genuinely overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dataflow_engine::executor::{PoolExecutor, RayonPool};
use dataflow_engine::{EngineResult, Graph};

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt::init();

    let graph = Graph::new();
    let total = Arc::new(AtomicI64::new(0));

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("seed")?;
            Ok(move || {
                println!("producer: seeding 7");
                let _ = out.set(7);
                let _ = out.make_available();
            })
        })?
        .set_name("producer");

    for id in 0i64..4 {
        let total = total.clone();
        graph
            .add_node(move |reg| {
                let seed = reg.register_input_resource::<i32>("seed")?;
                Ok(move || {
                    if let Ok(v) = seed.get() {
                        let contribution = *v as i64 * (id + 1);
                        total.fetch_add(contribution, Ordering::AcqRel);
                        println!("consumer-{id}: contributed {contribution}");
                    }
                })
            })?
            .set_name(format!("consumer-{id}"));
    }

    let pool = RayonPool::new(4)?;
    let executor = PoolExecutor::new(graph, pool);
    executor.execute();
    executor.wait()?;

    println!("total = {}", total.load(Ordering::Acquire));
    Ok(())
}
