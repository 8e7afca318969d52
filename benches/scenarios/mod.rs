//! Benchmarks for the complete voice.

mod voice;

pub use voice::bench_voice;
