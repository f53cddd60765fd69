//! Criterion benchmarks for u-symreg.
//!
//! Uses a synthetic two-variable target so the numbers reflect tree
//! evaluation and operator overhead rather than any particular dataset.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_symreg::dataset::Dataset;
use u_symreg::evolution::{GapAlgorithm, GpAlgorithm, Parameters};
use u_symreg::expr::tree::evaluate;
use u_symreg::expr::{Expression, GapExpression, Literal};
use u_symreg::metrics::mse;
use u_symreg::random::create_rng;

// ===========================================================================
// Synthetic data: y = x0 * x1 + x0 / 2
// ===========================================================================

fn synthetic(rows: usize) -> Dataset {
    let features: Vec<Vec<f64>> = (0..rows)
        .map(|i| {
            let t = i as f64 / rows as f64;
            vec![t * 4.0 - 2.0, 1.0 + t]
        })
        .collect();
    let labels = features.iter().map(|r| r[0] * r[1] + r[0] / 2.0).collect();
    Dataset::new(features, labels).unwrap()
}

fn bench_tree_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_evaluation");
    let data = synthetic(500);
    let mut rng = create_rng(42);

    for &len in &[15, 63, 255] {
        let expr = Expression::random(len, 0.5, 2, len, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(len), &expr, |b, e| {
            b.iter(|| {
                let sum: f64 = data
                    .features
                    .iter()
                    .map(|row| evaluate(black_box(e.tree()), row, &Literal))
                    .sum();
                black_box(sum)
            })
        });
    }
    group.finish();
}

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");
    let mut rng = create_rng(7);

    for &len in &[31, 127] {
        let a = GapExpression::random(len, 0.5, 2, len, &mut rng);
        let b = GapExpression::random(len, 0.5, 2, len, &mut rng);

        group.bench_with_input(BenchmarkId::new("tree_crossover", len), &(a.clone(), b.clone()), |bench, (x, y)| {
            bench.iter(|| black_box(x.tree_crossover(y, &mut rng)))
        });
        group.bench_with_input(BenchmarkId::new("blx_alpha", len), &(a.clone(), b), |bench, (x, y)| {
            bench.iter(|| black_box(x.blx_alpha_crossover(y, 0.3, &mut rng)))
        });
        group.bench_with_input(BenchmarkId::new("mutate_gp", len), &a, |bench, x| {
            bench.iter(|| {
                let mut child = x.clone();
                child.mutate_gp(2, &mut rng);
                black_box(child)
            })
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);
    let data = synthetic(100);

    for &pop in &[50, 100] {
        let params = Parameters::new(pop * 20, mse);
        group.bench_with_input(BenchmarkId::new("gp", pop), &params, |b, p| {
            b.iter(|| {
                let mut gp = GpAlgorithm::from_dataset(data.clone(), 42, pop, 31, 0.5)
                    .unwrap();
                black_box(gp.fit(black_box(p)).map(|r| r.best_fitness))
            })
        });
        group.bench_with_input(BenchmarkId::new("gap", pop), &params, |b, p| {
            b.iter(|| {
                let mut gap = GapAlgorithm::from_dataset(data.clone(), 42, pop, 31, 0.5)
                    .unwrap();
                black_box(gap.fit(black_box(p)).map(|r| r.best_fitness))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tree_evaluation, bench_operators, bench_fit);
criterion_main!(benches);
