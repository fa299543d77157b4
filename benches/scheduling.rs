// Criterion benchmarks for graph construction and readiness propagation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dataflow_engine::executor::SerialExecutor;
use dataflow_engine::Graph;

/// A single producer feeding `width` independent consumers: the readiness
/// propagation cost of one `make_available` call fanning out over N
/// `trigger`s.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let graph = Graph::new();
                graph
                    .add_node(|reg| {
                        let out = reg.register_output_resource::<i32>("seed")?;
                        Ok(move || {
                            let _ = out.set(1);
                            let _ = out.make_available();
                        })
                    })
                    .expect("producer registers");
                for _ in 0..width {
                    graph
                        .add_node(|reg| {
                            let seed = reg.register_input_resource::<i32>("seed")?;
                            Ok(move || {
                                let _ = seed.get();
                            })
                        })
                        .expect("consumer registers");
                }
                let executor = SerialExecutor::new(graph);
                black_box(executor.execute().expect("graph runs cleanly"));
            });
        });
    }
    group.finish();
}

/// A `depth`-long chain A1 -> A2 -> ... -> An, each node requiring the
/// previous one's single output: the cost of serial readiness propagation
/// down a long dependency chain.
fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");

    for depth in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let graph = Graph::new();
                graph
                    .add_node(|reg| {
                        let out = reg.register_output_resource::<i32>("r0")?;
                        Ok(move || {
                            let _ = out.set(0);
                            let _ = out.make_available();
                        })
                    })
                    .expect("seed registers");
                for i in 0..depth {
                    let input_name = format!("r{i}");
                    let output_name = format!("r{}", i + 1);
                    graph
                        .add_node(move |reg| {
                            let input = reg.register_input_resource::<i32>(&input_name)?;
                            let output = reg.register_output_resource::<i32>(&output_name)?;
                            Ok(move || {
                                let next = input.get().map(|v| *v).unwrap_or(0) + 1;
                                let _ = output.set(next);
                                let _ = output.make_available();
                            })
                        })
                        .expect("link registers");
                }
                let executor = SerialExecutor::new(graph);
                black_box(executor.execute().expect("graph runs cleanly"));
            });
        });
    }
    group.finish();
}

/// `reset` cost for a graph whose resources are already populated: the
/// loop over every non-permanent resource record and every exec record's
/// latches.
fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset");

    for width in [64usize, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let graph = Graph::new();
            graph
                .add_node(|reg| {
                    let out = reg.register_output_resource::<i32>("seed")?;
                    Ok(move || {
                        let _ = out.set(1);
                        let _ = out.make_available();
                    })
                })
                .expect("producer registers");
            for _ in 0..width {
                graph
                    .add_node(|reg| {
                        let seed = reg.register_input_resource::<i32>("seed")?;
                        Ok(move || {
                            let _ = seed.get();
                        })
                    })
                    .expect("consumer registers");
            }
            let executor = SerialExecutor::new(graph);
            b.iter(|| {
                executor.execute().expect("graph runs cleanly");
                executor.graph().reset(false);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_chain, bench_reset);
criterion_main!(benches);
