//! Full voice chain benchmarks across dimension settings.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use timbre_dsp::Voice;

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

/// (name, spectrum, brightness, articulation, envelope)
const SETTINGS: &[(&str, i32, i32, i32, i32)] = &[
    ("neutral", 128, 128, 128, 128),
    ("dark_pluck", 20, 40, 60, 30),
    ("bright_swell", 230, 200, 220, 240),
];

pub fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voice");

    for &(name, spectrum, brightness, articulation, envelope) in SETTINGS {
        for &size in BLOCK_SIZES {
            let mut voice = Voice::new(SAMPLE_RATE, 220.0);
            voice.set_spectrum(spectrum);
            voice.set_brightness(brightness);
            voice.set_articulation(articulation);
            voice.set_envelope(envelope);

            let mut buffer = vec![0.0f32; size];
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    voice.render(black_box(&mut buffer), black_box(true));
                })
            });
        }
    }

    // Control changes landing every block
    for &size in BLOCK_SIZES {
        let mut voice = Voice::new(SAMPLE_RATE, 220.0);
        let controls = voice.controls();
        let mut buffer = vec![0.0f32; size];
        let mut value = 0;
        group.bench_with_input(BenchmarkId::new("moving_controls", size), &size, |b, _| {
            b.iter(|| {
                value = (value + 7) % 256;
                controls.set_dimension(timbre_dsp::timbre::Dimension::Brightness, value);
                voice.render(black_box(&mut buffer), true);
            })
        });
    }

    group.finish();
}
