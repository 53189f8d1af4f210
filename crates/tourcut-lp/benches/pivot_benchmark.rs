// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tourcut_lp::relaxation::{NewEdge, Relaxation};
use tourcut_model::heuristics::{candidate_edges, initial_tour};
use tourcut_model::instance::{EuclideanInstance, Instance};

/// Degree LP over the 8-nearest candidate graph with the starting tour
/// instated.
fn build_relaxation(instance: &EuclideanInstance) -> Relaxation {
    let tour = initial_tour(instance, 2, 7).expect("starting tour");
    let mut edges = candidate_edges(instance, 8, &tour);
    let n = instance.node_count();
    let chord = tourcut_model::graph::EndPts::new(tour.node_at(0), tour.node_at(n - 2));
    if n % 2 == 0 && edges.binary_search(&chord).is_err() {
        edges.push(chord);
    }

    let mut lp = Relaxation::new(n).expect("empty relaxation");
    let new_edges: Vec<NewEdge> = edges
        .iter()
        .map(|&e| NewEdge::new(e, instance.distance(e.u(), e.v())))
        .collect();
    lp.add_edges(&new_edges).expect("candidate columns");
    lp.instate_tour(tour).expect("tour basis");
    lp
}

fn bench_pivot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot_benchmark");
    group.sample_size(20);

    for &n in &[20usize, 40, 80] {
        let instance = EuclideanInstance::random(n, 1000.0, n as u64);
        let base = build_relaxation(&instance);
        group.throughput(Throughput::Elements(base.edge_count() as u64));

        group.bench_with_input(BenchmarkId::new("pivot", n), &base, |b, base| {
            b.iter_batched(
                || base.clone(),
                |mut lp| {
                    let piv = lp.pivot().expect("pivot");
                    black_box(piv)
                },
                criterion::BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("primal_opt", n), &base, |b, base| {
            b.iter_batched(
                || base.clone(),
                |mut lp| {
                    let status = lp.primal_pivot().expect("primal");
                    black_box((status, lp.objective_value()))
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pivot);
criterion_main!(benches);
