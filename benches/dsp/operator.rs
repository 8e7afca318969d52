//! Benchmarks for wavetable operators and the four-operator network.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use timbre_dsp::dsp::{
    fm::{FmAlgorithm, FmPatch, OperatorNetwork},
    operator::Operator,
    wavetable::{WavetableBank, Waveshape},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_operator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/operator");
    let bank = WavetableBank::new();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let mut op = Operator::new(bank.clone(), SAMPLE_RATE);
        op.set_parameters(1.0, 440.0, Waveshape::Saw);
        group.bench_with_input(BenchmarkId::new("saw", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = op.process(black_box(0.0));
                }
            })
        });
    }

    group.finish();
}

pub fn bench_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/fm");
    let bank = WavetableBank::new();

    for algorithm in [FmAlgorithm::Additive, FmAlgorithm::FourStack, FmAlgorithm::MergedStack] {
        let mut network = OperatorNetwork::new(bank.clone(), SAMPLE_RATE, 220.0);
        network.apply_patch(&FmPatch {
            algorithm,
            amplitudes: [1.0, 0.8, 0.6, 0.4],
            ratios: [1.0, 2.0, 3.0, 0.5],
            ..FmPatch::default()
        });

        for &size in BLOCK_SIZES {
            let mut buffer = vec![0.0f32; size];
            group.bench_with_input(BenchmarkId::new(algorithm.name(), size), &size, |b, _| {
                b.iter(|| {
                    network.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
