//! Benchmarks for the biquad, including the per-sample retune the
//! articulation sweep does.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use timbre_dsp::dsp::filter::{Biquad, FilterType};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| ((i % 64) as f32 / 32.0) - 1.0).collect();
        let mut buffer = input.clone();

        let mut lp = Biquad::lowpass(SAMPLE_RATE, 1_000.0, 0.707);
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                lp.render(black_box(&mut buffer));
            })
        });

        let mut sweep = Biquad::new(SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("retune_per_sample", size), &size, |b, _| {
            b.iter(|| {
                let mut cutoff = 500.0;
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    cutoff *= 1.001;
                    sweep.set_params(cutoff, 1.0, FilterType::LowPass);
                    *out = sweep.process(x);
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
