//! Model front ends.
//!
//! - [`wavegrad`] — WaveGrad vocoder: noise schedule, training pairs, sampling

pub mod wavegrad;

pub use wavegrad::Wavegrad;
