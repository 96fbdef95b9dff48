// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dice_core::{Simulator, SimulatorState};
use std::hint::black_box;

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_codec");
    for &n in &[2usize, 8, 32] {
        let mut sim = Simulator::new(n, None);
        for _ in 0..5 {
            sim.update();
        }
        let state = sim.current_state();
        let text = serde_json::to_string(&state).expect("encode");
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("export_encode", n), &sim, |b, sim| {
            b.iter(|| black_box(serde_json::to_string(&sim.current_state()).expect("encode")));
        });
        group.bench_with_input(BenchmarkId::new("decode_import", n), &text, |b, text| {
            let mut replica = sim.clone();
            b.iter(|| {
                let decoded: SimulatorState = serde_json::from_str(text).expect("decode");
                replica.replace_state(&decoded).expect("import");
                black_box(&replica);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snapshot);
criterion_main!(benches);
