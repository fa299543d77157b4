//! End-to-end behavior of the graph against both executors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dataflow_engine::executor::{PoolExecutor, RayonPool, SerialExecutor, WorkPool};
use dataflow_engine::{EngineError, Graph, ResourceFlags};

/// S1: a diamond (A -> {B, C} -> D) runs every node exactly once and D
/// only sees both of its inputs after A has produced them.
#[test]
fn diamond_runs_every_node_once_in_dependency_order() {
    let graph = Graph::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    {
        let order = order.clone();
        graph
            .add_node(move |reg| {
                let b = reg.register_output_resource::<i32>("b")?;
                let c = reg.register_output_resource::<i32>("c")?;
                Ok(move || {
                    order.lock().push("a");
                    let _ = b.set(2);
                    let _ = b.make_available();
                    let _ = c.set(5);
                    let _ = c.make_available();
                })
            })
            .expect("registration should succeed")
            .set_name("a");
    }
    {
        let order = order.clone();
        graph
            .add_node(move |reg| {
                let b = reg.register_input_resource::<i32>("b")?;
                Ok(move || {
                    assert!(b.is_available());
                    order.lock().push("b");
                })
            })
            .expect("registration should succeed");
    }
    {
        let order = order.clone();
        graph
            .add_node(move |reg| {
                let c = reg.register_input_resource::<i32>("c")?;
                Ok(move || {
                    assert!(c.is_available());
                    order.lock().push("c");
                })
            })
            .expect("registration should succeed");
    }
    let d_ran = Arc::new(AtomicUsize::new(0));
    {
        let d_ran = d_ran.clone();
        let order = order.clone();
        graph
            .add_node(move |reg| {
                let b = reg.register_input_resource::<i32>("b")?;
                let c = reg.register_input_resource::<i32>("c")?;
                let d_ran = d_ran.clone();
                Ok(move || {
                    let sum = *b.get().expect("b available") + *c.get().expect("c available");
                    assert_eq!(sum, 7);
                    order.lock().push("d");
                    d_ran.fetch_add(1, Ordering::SeqCst);
                })
            })
            .expect("registration should succeed");
    }

    let executor = SerialExecutor::new(graph);
    executor.execute().expect("graph should run cleanly");

    assert_eq!(d_ran.load(Ordering::SeqCst), 1);
    let order = order.lock();
    assert_eq!(order[0], "a");
    assert_eq!(order[3], "d");
    assert!(order.contains(&"b"));
    assert!(order.contains(&"c"));
}

/// S2: a oneshot node producing a permanent resource is removed from the
/// active set after its first run, but consumers of that resource keep
/// seeing its value on every later run.
#[test]
fn oneshot_node_runs_once_permanent_resource_persists() {
    let graph = Graph::new();
    let seed_runs = Arc::new(AtomicUsize::new(0));
    let consumer_runs = Arc::new(AtomicUsize::new(0));

    {
        let seed_runs = seed_runs.clone();
        graph
            .add_oneshot_node(move |reg| {
                let out = reg
                    .register_output_resource_with_flags::<i32>("config", ResourceFlags::Permanent)?;
                let seed_runs = seed_runs.clone();
                Ok(move || {
                    seed_runs.fetch_add(1, Ordering::SeqCst);
                    let _ = out.set(42);
                    let _ = out.make_available();
                })
            })
            .expect("oneshot registration should succeed")
            .set_name("seed");
    }
    {
        let consumer_runs = consumer_runs.clone();
        graph
            .add_node(move |reg| {
                let config = reg
                    .register_input_resource_with_flags::<i32>("config", ResourceFlags::Permanent)?;
                let consumer_runs = consumer_runs.clone();
                Ok(move || {
                    assert_eq!(*config.get().expect("config available"), 42);
                    consumer_runs.fetch_add(1, Ordering::SeqCst);
                })
            })
            .expect("registration should succeed");
    }

    let executor = SerialExecutor::new(graph);
    assert_eq!(executor.graph().node_count(), 2);

    for expected_run in 1..=3 {
        executor.execute().expect("graph should run cleanly");
        assert_eq!(seed_runs.load(Ordering::SeqCst), 1);
        assert_eq!(consumer_runs.load(Ordering::SeqCst), expected_run);
        executor.graph().reset(false);
    }
    assert_eq!(executor.graph().node_count(), 1);
}

/// S3: calling `make_available` a second time within the same run is a
/// no-op; consumers are not re-triggered and do not re-run.
#[test]
fn make_available_is_idempotent_within_a_run() {
    let graph = Graph::new();
    let consumer_runs = Arc::new(AtomicUsize::new(0));

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("value")?;
            Ok(move || {
                let _ = out.set(1);
                let _ = out.make_available();
                let _ = out.make_available();
                let _ = out.make_available();
            })
        })
        .expect("registration should succeed");

    {
        let consumer_runs = consumer_runs.clone();
        graph
            .add_node(move |reg| {
                let value = reg.register_input_resource::<i32>("value")?;
                let consumer_runs = consumer_runs.clone();
                Ok(move || {
                    assert_eq!(*value.get().expect("available"), 1);
                    consumer_runs.fetch_add(1, Ordering::SeqCst);
                })
            })
            .expect("registration should succeed");
    }

    let executor = SerialExecutor::new(graph);
    executor.execute().expect("graph should run cleanly");
    assert_eq!(consumer_runs.load(Ordering::SeqCst), 1);
}

/// S4: after `reset(false)`, a resetable resource goes back to
/// unavailable and its consumer does not run until the producer runs
/// again; `reset(true)` additionally clears permanent resources.
#[test]
fn reset_clears_resetable_resources_destroy_clears_permanent_too() {
    let graph = Graph::new();

    graph
        .add_node(|reg| {
            let out =
                reg.register_output_resource_with_flags::<i32>("perm", ResourceFlags::Permanent)?;
            Ok(move || {
                let _ = out.set(9);
                let _ = out.make_available();
            })
        })
        .expect("registration should succeed");

    let executor = SerialExecutor::new(graph);
    executor.execute().expect("graph should run cleanly");

    let resource = executor
        .graph()
        .get_resource("perm")
        .expect("resource registered");
    assert!(resource.is_available());

    executor.graph().reset(false);
    assert!(resource.is_available(), "permanent resource survives reset(false)");

    executor.graph().reset(true);
    assert!(
        executor.graph().get_resource("perm").is_none(),
        "reset(true) drops the resource map entirely"
    );
}

/// S5: with a multi-threaded pool, independent consumers of the same
/// resource can run concurrently; `wait()` only returns once every node
/// has finished.
#[test]
fn pool_executor_runs_independent_consumers_concurrently() {
    let graph = Graph::new();
    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_concurrent = Arc::new(AtomicUsize::new(0));

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("seed")?;
            Ok(move || {
                let _ = out.set(1);
                let _ = out.make_available();
            })
        })
        .expect("registration should succeed");

    for _ in 0..4 {
        let concurrent = concurrent.clone();
        let max_concurrent = max_concurrent.clone();
        graph
            .add_node(move |reg| {
                let seed = reg.register_input_resource::<i32>("seed")?;
                let concurrent = concurrent.clone();
                let max_concurrent = max_concurrent.clone();
                Ok(move || {
                    let _ = seed.get();
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_concurrent.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .expect("registration should succeed");
    }

    let pool = RayonPool::new(4).expect("pool should build");
    let executor = PoolExecutor::new(graph, pool);
    executor.execute();
    executor.wait().expect("graph should run cleanly");

    assert!(
        max_concurrent.load(Ordering::SeqCst) > 1,
        "expected at least two consumers to overlap, got {}",
        max_concurrent.load(Ordering::SeqCst)
    );
}

/// S6: a node whose body never makes one of its declared outputs
/// available surfaces `MissingProducer` once it finishes running.
#[test]
fn missing_producer_is_reported_after_the_node_runs() {
    let graph = Graph::new();

    graph
        .add_node(|reg| {
            let _out = reg.register_output_resource::<i32>("never_set")?;
            Ok(move || {
                // deliberately never calls set()/make_available()
            })
        })
        .expect("registration should succeed");

    let executor = SerialExecutor::new(graph);
    let err = executor.execute().expect_err("missing producer should surface");
    assert!(matches!(err, EngineError::MissingProducer { .. }));
}

/// S7: a second node registering as producer of a resource another node
/// already produces is rejected at registration time.
#[test]
fn producer_conflict_is_rejected_at_registration() {
    let graph = Graph::new();

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("shared")?;
            Ok(move || {
                let _ = out.set(1);
                let _ = out.make_available();
            })
        })
        .expect("first producer should register");

    let err = graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("shared")?;
            Ok(move || {
                let _ = out.set(2);
                let _ = out.make_available();
            })
        })
        .expect_err("second producer should be rejected");

    assert!(matches!(err, EngineError::ProducerConflict { .. }));
}

/// S8: re-registering a resource under a different type or different
/// lifecycle flags is rejected.
#[test]
fn type_and_flag_mismatches_are_rejected() {
    let graph = Graph::new();

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("typed")?;
            Ok(move || {
                let _ = out.set(1);
                let _ = out.make_available();
            })
        })
        .expect("first registration should succeed");

    let type_err = graph
        .add_node(|reg| {
            let _input: dataflow_engine::InputHandle<String> =
                reg.register_input_resource::<String>("typed")?;
            Ok(move || {})
        })
        .expect_err("mismatched type should be rejected");
    assert!(matches!(type_err, EngineError::TypeMismatch { .. }));

    let flag_err = graph
        .add_node(|reg| {
            let _input = reg.register_input_resource_with_flags::<i32>(
                "typed",
                ResourceFlags::Permanent,
            )?;
            Ok(move || {})
        })
        .expect_err("mismatched flags should be rejected");
    assert!(matches!(flag_err, EngineError::FlagMismatch { .. }));
}

/// Boundary: a graph with no nodes runs (and waits) trivially.
#[test]
fn empty_graph_runs_trivially() {
    let graph = Graph::new();
    let executor = SerialExecutor::new(graph);
    executor.execute().expect("empty graph runs cleanly");
}

/// Boundary: a node with no required resources is scheduled by the
/// initial sweep without anything needing to trigger it.
#[test]
fn node_with_no_requirements_runs_on_initial_sweep() {
    let graph = Graph::new();
    let ran = Arc::new(AtomicUsize::new(0));
    {
        let ran = ran.clone();
        graph
            .add_node(move |_reg| {
                let ran = ran.clone();
                Ok(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            })
            .expect("registration should succeed");
    }
    let executor = SerialExecutor::new(graph);
    executor.execute().expect("graph should run cleanly");
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

/// Boundary: a oneshot node that produces a non-permanent resource is
/// rejected at registration time.
#[test]
fn oneshot_node_with_resetable_output_is_rejected() {
    let graph = Graph::new();
    let err = graph
        .add_oneshot_node(|reg| {
            let out = reg.register_output_resource::<i32>("resetable_from_oneshot")?;
            Ok(move || {
                let _ = out.set(1);
                let _ = out.make_available();
            })
        })
        .expect_err("oneshot producing a resetable resource should be rejected");
    assert!(matches!(err, EngineError::OneshotWithResetable { .. }));
}
