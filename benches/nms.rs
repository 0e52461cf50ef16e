use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nms_optimized::examples::SceneGen;
use nms_optimized::prelude::*;

fn bench_drifting(c: &mut Criterion) {
    let mut group = c.benchmark_group("nms_drifting");
    for objects in [10, 100, 300, 500, 1000] {
        let set = SceneGen::seeded(3).drifting(objects, 50.0, 10.0, 1.0, 3);
        group.bench_with_input(BenchmarkId::from_parameter(objects), &set, |b, set| {
            b.iter(|| nms(black_box(set), 0.8).expect("valid threshold"));
        });
    }
    group.finish();
}

fn bench_pruners(c: &mut Criterion) {
    let mut group = c.benchmark_group("nms_sparse_pruners");
    for objects in [1000, 5000, 20000] {
        let set = SceneGen::seeded(42).uniform(objects, 20000.0, 60.0);
        for pruning in [
            Pruning::None,
            Pruning::SortedInterval,
            Pruning::Grid { cell_size: None },
        ] {
            if pruning == Pruning::None && objects > 5000 {
                continue;
            }
            let opts = NmsOptions::default().pruning(pruning);
            group.bench_with_input(
                BenchmarkId::new(pruning.name(), objects),
                &set,
                |b, set| b.iter(|| suppress(black_box(set), &opts).expect("valid options")),
            );
        }
    }
    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("nms_dense_parallel");
    let set = SceneGen::seeded(7).clustered(10, 2000, 1000.0, 80.0, 40.0);
    for parallel in [false, true] {
        let opts = NmsOptions::default()
            .iou_threshold(0.7)
            .pruning(Pruning::None)
            .parallel(parallel);
        group.bench_with_input(
            BenchmarkId::from_parameter(parallel),
            &set,
            |b, set| b.iter(|| suppress(black_box(set), &opts).expect("valid options")),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_drifting, bench_pruners, bench_parallel);
criterion_main!(benches);
