//! WaveGrad diffusion schedule and samplers.
//!
//! - [`noise_level`] — linear beta schedule and the derived sampler coefficients
//! - [`corruption`] — forward process used to build training pairs
//! - [`sampler`] — reverse (ancestral) sampler for inference
//!
//! ## Formulation
//!
//! The forward process mixes clean audio with Gaussian noise while keeping
//! unit variance: `y_n = l * y_0 + sqrt(1 - l²) * ε`, where `l = sqrt(ᾱ)` is the
//! noise level.
//!
//! The model predicts `ε` given `y_n`, the mel conditioning and `l`. One reverse
//! step is:
//! ```text
//! y = (y - (1 - α_t) / sqrt(1 - ᾱ_t) * ε̂) / sqrt(α_t)
//! y = y + σ_t * z        (t > 0 only)
//! y = clamp(y, -1, 1)
//! ```

pub mod corruption;
pub mod noise_level;
pub mod sampler;

use candle_core::{Device, Shape, Tensor};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

pub use corruption::{TrainingPair, compute_y_n};
pub use noise_level::{NoiseSchedule, ScheduleSummary};
pub use sampler::inference;

/// Noise-predicting network driven by the sampler.
pub trait Denoiser {
    /// Predict the noise component of `noisy_signal`.
    ///
    /// - `noisy_signal`: `[B, 1, T_audio]`
    /// - `conditioning`: `[B, C, T_cond]` mel spectrogram
    /// - `noise_scale`: `[B]` noise level per batch element
    ///
    /// Must return a tensor shaped like `noisy_signal`.
    fn predict_noise(
        &self,
        noisy_signal: &Tensor,
        conditioning: &Tensor,
        noise_scale: &Tensor,
    ) -> candle_core::Result<Tensor>;
}

impl<F> Denoiser for F
where
    F: Fn(&Tensor, &Tensor, &Tensor) -> candle_core::Result<Tensor>,
{
    fn predict_noise(
        &self,
        noisy_signal: &Tensor,
        conditioning: &Tensor,
        noise_scale: &Tensor,
    ) -> candle_core::Result<Tensor> {
        self(noisy_signal, conditioning, noise_scale)
    }
}

/// Draw an f32 standard-normal tensor from `rng`.
///
/// Candle's own `randn` can't be seeded per call, so noise is generated on
/// the host and moved to `device`.
pub(crate) fn randn<R: Rng>(
    rng: &mut R,
    shape: impl Into<Shape>,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let shape = shape.into();
    let data: Vec<f32> = (0..shape.elem_count())
        .map(|_| StandardNormal.sample(rng))
        .collect();
    Tensor::from_vec(data, shape, device)
}
