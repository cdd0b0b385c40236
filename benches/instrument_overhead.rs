/// Instrumentation throughput benchmarks
///
/// Measures parse + probe injection + emission for generated modules of
/// increasing size, and the cost of each probe placement.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use timeprobe::instrument::{Instrumenter, ProbePlacement};
use timeprobe::syntax::SourceUnit;

/// Module with `count` functions, every fourth one a class with two methods
fn generate_module(count: usize) -> String {
    let mut src = String::from("\"\"\"Generated module.\"\"\"\nimport hmac\n\n");
    for i in 0..count {
        if i % 4 == 3 {
            src.push_str(&format!(
                "class Box{i}:\n    def get(self):\n        return {i}\n\n    def put(self, v):\n        self.v = v\n\n"
            ));
        } else {
            src.push_str(&format!(
                "def check_{i}(a, b):\n    \"\"\"Compare.\"\"\"\n    for x, y in zip(a, b):\n        if x != y:\n            return False\n    return True\n\n"
            ));
        }
    }
    src
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.measurement_time(Duration::from_secs(5));

    for size in [10, 100, 1000] {
        let src = generate_module(size);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &src, |b, src| {
            b.iter(|| SourceUnit::parse(black_box(src)))
        });
    }

    group.finish();
}

fn bench_instrument(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrument");
    group.measurement_time(Duration::from_secs(5));

    for size in [10, 100, 1000] {
        let src = generate_module(size);
        group.throughput(Throughput::Bytes(src.len() as u64));
        for placement in [ProbePlacement::Prologue, ProbePlacement::Enclosing] {
            let instrumenter = Instrumenter::new(placement);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", placement), size),
                &src,
                |b, src| b.iter(|| instrumenter.instrument_source(black_box(src))),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_instrument);
criterion_main!(benches);
