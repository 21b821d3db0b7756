//! WaveGrad diffusion vocoder math in pure Rust.
//!
//! A candle-based implementation of the WaveGrad noise schedule, forward
//! corruption and reverse sampler. The noise-predicting network is supplied
//! by the caller through the [`scheduler::Denoiser`] trait.
//!
//! ## Architecture
//!
//! ```text
//! (num_steps, β_min, β_max) → NoiseSchedule ──┬→ compute_y_n  (clean audio → training pair)
//!                                             └→ inference    (mel + denoiser → audio)
//! ```
//!
//! ## Modules
//!
//! - [`config`] — vocoder and noise schedule configuration
//! - [`scheduler`] — noise schedule, forward corruption, reverse sampler
//! - [`model`] — `Wavegrad` front end holding config, schedule and RNG

pub mod config;
pub mod model;
pub mod scheduler;

mod error;

pub use error::{Error, Result};
