//! Forward diffusion: clean audio → (noise, noisy audio, noise scale).
//!
//! Each batch element gets its own continuous noise scale, sampled uniformly
//! between two adjacent schedule levels `l[s-1]` and `l[s]` for a random
//! step `s ∈ [1, T]`. The denoiser thus sees a continuum of noise levels
//! instead of only the `T` discrete ones.

use candle_core::Tensor;
use rand::Rng;

use super::{NoiseSchedule, randn};
use crate::{Error, Result};

/// One batch of training inputs and targets.
#[derive(Debug, Clone)]
pub struct TrainingPair {
    /// Target noise `[B, 1, T]`.
    pub noise: Tensor,
    /// Model input `[B, 1, T]`.
    pub noisy_signal: Tensor,
    /// Noise level per batch element `[B]`.
    pub noise_scale: Tensor,
}

/// Corrupt `y0` (`[B, 1, T]` or `[B, T]`) with schedule-sampled noise.
///
/// `noisy = l * y0 + sqrt(1 - l²) * ε`
pub fn compute_y_n<R: Rng>(
    schedule: &NoiseSchedule,
    y0: &Tensor,
    rng: &mut R,
) -> Result<TrainingPair> {
    let y0 = match y0.dims() {
        [_, 1, _] => y0.squeeze(1)?,
        [_, _] => y0.clone(),
        dims => {
            return Err(Error::ShapeMismatch(format!(
                "clean signal must be [B, 1, T] or [B, T], got {dims:?}"
            )));
        }
    };
    let (batch, len) = y0.dims2()?;
    let device = y0.device();
    let dtype = y0.dtype();

    let levels = schedule.noise_level();
    let num_steps = schedule.num_steps();
    let scales: Vec<f32> = (0..batch)
        .map(|_| {
            let s = rng.random_range(1..=num_steps);
            let (l_a, l_b) = (levels[s - 1], levels[s]);
            (l_a + rng.random::<f64>() * (l_b - l_a)) as f32
        })
        .collect();
    let noise_scale = Tensor::from_vec(scales, batch, device)?.to_dtype(dtype)?;

    let noise = randn(rng, (batch, len), device)?.to_dtype(dtype)?;

    // [B] → [B, 1] so the scales broadcast over time.
    let scale = noise_scale.unsqueeze(1)?;
    let noise_weight = scale.sqr()?.affine(-1.0, 1.0)?.sqrt()?;
    let noisy_signal = (y0.broadcast_mul(&scale)? + noise.broadcast_mul(&noise_weight)?)?;

    Ok(TrainingPair {
        noise: noise.unsqueeze(1)?,
        noisy_signal: noisy_signal.unsqueeze(1)?,
        noise_scale,
    })
}
