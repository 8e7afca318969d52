//! Benchmarks for low-level DSP primitives.

mod envelope;
mod filter;
mod operator;

pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use operator::{bench_network, bench_operator};
