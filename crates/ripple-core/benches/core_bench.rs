//! Criterion benchmarks for ripple-core.
//!
//! ## Benchmark groups
//!
//! 1. **graph_build** — Index + assemble synthetic source trees.
//! 2. **traversal** — Bounded dependents queries at several depths.
//! 3. **impact** — Full impact analysis over a chained module graph.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/ripple-core/Cargo.toml
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ripple_core::config::AnalysisConfig;
use ripple_core::graph::{build_graph, DependencyGraph};
use ripple_core::models::{ActionType, ImprovementAction};
use ripple_core::query::coverage::StaticCoverage;
use ripple_core::query::impact::ImpactAnalyzer;

/// Write `n` modules where module i imports module i+1, giving a long
/// dependency chain with one function per module.
fn synthetic_tree(n: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..n {
        let mut source = String::new();
        if i + 1 < n {
            source.push_str(&format!("import mod_{}\n\n", i + 1));
        }
        source.push_str(&format!("def work_{i}():\n    return {i}\n"));
        std::fs::write(dir.path().join(format!("mod_{i}.py")), source).unwrap();
    }
    dir
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for n in [10usize, 100] {
        let dir = synthetic_tree(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| build_graph(black_box(dir.path()), "bench").unwrap());
        });
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let dir = synthetic_tree(200);
    let graph = build_graph(dir.path(), "bench").unwrap();
    let leaf = "mod_199";

    let mut group = c.benchmark_group("traversal");
    for depth in [1i64, 3, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| graph.get_dependents(black_box(leaf), depth));
        });
    }
    group.finish();
}

fn bench_impact(c: &mut Criterion) {
    let dir = synthetic_tree(200);
    let graph: DependencyGraph = build_graph(dir.path(), "bench").unwrap();
    let config = AnalysisConfig {
        traversal_depth: 3,
        critical_nodes: vec!["mod_0".to_string()],
        ..AnalysisConfig::default()
    };
    let coverage = StaticCoverage::uniform(true);
    let analyzer = ImpactAnalyzer::new(&graph, &config, &coverage);
    let actions: Vec<ImprovementAction> = (190..200)
        .map(|i| ImprovementAction {
            action_type: ActionType::AdjustParameter,
            target: format!("mod_{i}"),
            old_value: String::new(),
            new_value: String::new(),
            rationale: "bench".to_string(),
            confidence_score: 0.9,
        })
        .collect();

    c.bench_function("impact_analysis", |b| {
        b.iter(|| analyzer.analyze(black_box(&actions)));
    });
}

criterion_group!(benches, bench_graph_build, bench_traversal, bench_impact);
criterion_main!(benches);
