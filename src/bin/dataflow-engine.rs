//! CLI for running the engine's bundled demo graphs.
//!
//! A convenience wrapper around the library, not part of its API surface.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dataflow_engine::executor::{PoolExecutor, RayonPool, SerialExecutor};
use dataflow_engine::{EngineConfig, EngineResult, Graph, ResourceFlags};

#[derive(Parser)]
#[command(name = "dataflow-engine")]
#[command(about = "In-process dataflow execution engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run one of the bundled demo graphs.
    Run {
        #[arg(long, value_enum)]
        demo: Demo,
        /// Use the pool executor with this many worker threads instead of
        /// the serial executor.
        #[arg(long)]
        threads: Option<usize>,
        /// Print the graph as a DOT digraph instead of running it.
        #[arg(long)]
        dot: bool,
    },
    /// List the bundled demo graphs.
    DemoList,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    /// A -> {B, C} -> D: D requires both B's and C's outputs.
    Diamond,
    /// One producer, several independent consumers of the same resource.
    Fanout,
    /// A oneshot node seeding a permanent resource read by every run.
    Idempotent,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::DemoList => {
            println!("diamond    A -> {{B, C}} -> D");
            println!("fanout     one producer, several independent consumers");
            println!("idempotent a oneshot seed feeding a permanent resource");
        }
        Commands::Run { demo, threads, dot } => {
            let graph = match demo {
                Demo::Diamond => build_diamond(),
                Demo::Fanout => build_fanout(),
                Demo::Idempotent => build_idempotent(),
            }
            .with_context(|| format!("building the {demo:?} demo graph"))?;

            if dot {
                graph.print();
                return Ok(());
            }

            match threads {
                Some(n) => {
                    let pool =
                        RayonPool::new(n).with_context(|| format!("building a {n}-worker pool"))?;
                    run_pooled(graph, pool).context("running the graph on the pool executor")?;
                }
                None => {
                    let executor = SerialExecutor::new(graph);
                    executor
                        .execute()
                        .context("running the graph on the serial executor")?;
                    println!("ran to completion on the calling thread");
                }
            }
        }
    }
    Ok(())
}

fn run_pooled(graph: Graph, pool: RayonPool) -> EngineResult<()> {
    let executor = PoolExecutor::new(graph, pool);
    executor.execute();
    executor.wait()?;
    println!("ran to completion on the rayon pool");
    Ok(())
}

fn build_diamond() -> EngineResult<Graph> {
    let graph = Graph::with_config(EngineConfig::default());

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("a")?;
            Ok(move || {
                println!("A");
                let _ = out.set(1);
                let _ = out.make_available();
            })
        })?
        .set_name("A");

    graph
        .add_node(|reg| {
            let a = reg.register_input_resource::<i32>("a")?;
            let out = reg.register_output_resource::<i32>("b")?;
            Ok(move || {
                let a = a.get().map(|v| *v).unwrap_or(0);
                println!("B (a = {a})");
                let _ = out.set(a * 2);
                let _ = out.make_available();
            })
        })?
        .set_name("B");

    graph
        .add_node(|reg| {
            let a = reg.register_input_resource::<i32>("a")?;
            let out = reg.register_output_resource::<i32>("c")?;
            Ok(move || {
                let a = a.get().map(|v| *v).unwrap_or(0);
                println!("C (a = {a})");
                let _ = out.set(a * 3);
                let _ = out.make_available();
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
                println!("D (b = {b}, c = {c}, sum = {})", b + c);
            })
        })?
        .set_name("D");

    Ok(graph)
}

fn build_fanout() -> EngineResult<Graph> {
    let graph = Graph::new();
    let total = Arc::new(AtomicI64::new(0));

    graph
        .add_node(|reg| {
            let out = reg.register_output_resource::<i32>("seed")?;
            Ok(move || {
                let _ = out.set(7);
                let _ = out.make_available();
            })
        })?
        .set_name("producer");

    for id in 0i64..3 {
        let total = total.clone();
        graph
            .add_node(move |reg| {
                let seed = reg.register_input_resource::<i32>("seed")?;
                Ok(move || {
                    if let Ok(v) = seed.get() {
                        total.fetch_add(*v as i64 * (id + 1), Ordering::AcqRel);
                    }
                })
            })?
            .set_name(format!("consumer-{id}"));
    }

    Ok(graph)
}

fn build_idempotent() -> EngineResult<Graph> {
    let graph = Graph::new();

    graph
        .add_oneshot_node(|reg| {
            let out = reg.register_output_resource_with_flags::<i32>(
                "config",
                ResourceFlags::Permanent,
            )?;
            Ok(move || {
                println!("seeding config (runs at most once)");
                let _ = out.set(100);
                let _ = out.make_available();
            })
        })?
        .set_name("seed");

    graph
        .add_node(|reg| {
            let config = reg.register_input_resource_with_flags::<i32>(
                "config",
                ResourceFlags::Permanent,
            )?;
            Ok(move || {
                let v = config.get().map(|v| *v).unwrap_or(0);
                println!("using config = {v}");
            })
        })?
        .set_name("consumer");

    Ok(graph)
}
