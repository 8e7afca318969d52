//! Benchmarks for the ADSR state machine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use timbre_dsp::dsp::envelope::Adsr;

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Adsr::adsr(SAMPLE_RATE, 10.0, 0.1, 0.7, 0.3);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(true));
            })
        });

        // Sustain phase (holding steady)
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.001, 0.001, 0.7, 0.3);
        for _ in 0..200 {
            env.process(true);
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(true));
            })
        });

        // Debounced release into Off, then idle
        let mut env = Adsr::adsr(SAMPLE_RATE, 0.001, 0.001, 0.7, 0.1);
        for _ in 0..200 {
            env.process(true);
        }
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(false));
            })
        });
    }

    group.finish();
}
