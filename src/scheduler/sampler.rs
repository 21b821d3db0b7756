//! Reverse diffusion sampler (WaveGrad inference).
//!
//! Starts from `N(0, I)` audio of length `hop_length × T_cond` and walks the
//! schedule from step `T - 1` down to 0, calling the denoiser once per step.
//! Fresh noise is injected after every step except the last, and the running
//! estimate is clamped to `[-1, 1]` after each one.

use candle_core::Tensor;
use rand::Rng;

use super::{Denoiser, NoiseSchedule, randn};
use crate::{Error, Result};

/// Generate audio `[B, 1, hop_length × T_cond]` from mel conditioning `[B, C, T_cond]`.
///
/// The denoiser is queried with noise scale `sqrt(ᾱ_t)` at step `t`. Any
/// error it returns aborts sampling.
pub fn inference<D, R>(
    schedule: &NoiseSchedule,
    denoiser: &D,
    conditioning: &Tensor,
    hop_length: usize,
    rng: &mut R,
) -> Result<Tensor>
where
    D: Denoiser + ?Sized,
    R: Rng,
{
    if hop_length == 0 {
        return Err(Error::InvalidConfiguration(
            "hop_length must be at least 1".to_string(),
        ));
    }
    let (batch, frames) = match conditioning.dims() {
        &[b, _, t] if t > 0 => (b, t),
        dims => {
            return Err(Error::ShapeMismatch(format!(
                "conditioning must be [B, C, T] with T >= 1, got {dims:?}"
            )));
        }
    };
    let audio_len = hop_length
        .checked_mul(frames)
        .filter(|len| len.checked_mul(batch).is_some())
        .ok_or_else(|| {
            Error::ShapeMismatch(format!(
                "{batch} x {frames} frames at hop length {hop_length} overflow the audio length"
            ))
        })?;
    let device = conditioning.device();

    tracing::debug!(
        "WaveGrad inference: batch={batch}, frames={frames}, samples={audio_len}, steps={}",
        schedule.num_steps()
    );

    let mut y = randn(rng, (batch, 1, audio_len), device)?;

    for t in schedule.reverse_steps() {
        let level = schedule.alpha_hat()[t].sqrt();
        let noise_scale = Tensor::full(level as f32, batch, device)?;

        let eps = denoiser.predict_noise(&y, conditioning, &noise_scale)?;
        if eps.dims() != y.dims() {
            return Err(Error::ShapeMismatch(format!(
                "denoiser returned {:?} at step {t}, expected {:?}",
                eps.dims(),
                y.dims()
            )));
        }
        let eps = eps.to_dtype(y.dtype())?;

        // y = c1 * (y - c2 * ε̂)
        let scaled_eps = (eps * schedule.c2()[t])?;
        y = ((&y - scaled_eps)? * schedule.c1()[t])?;

        if t > 0 {
            let z = randn(rng, (batch, 1, audio_len), device)?;
            y = (y + (z * schedule.posterior_std(t)?)?)?;
        }

        y = y.clamp(-1f32, 1f32)?;
        tracing::trace!("reverse step {t}: noise level {level:.6}");
    }

    Ok(y)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use candle_core::{DType, Device};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn zero_denoiser(
        y: &Tensor,
        _conditioning: &Tensor,
        _noise_scale: &Tensor,
    ) -> candle_core::Result<Tensor> {
        y.zeros_like()
    }

    fn max_abs(t: &Tensor) -> f32 {
        t.abs()
            .unwrap()
            .flatten_all()
            .unwrap()
            .max(0)
            .unwrap()
            .to_scalar()
            .unwrap()
    }

    #[test]
    fn output_length_is_hop_times_frames() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(50, 1e-6, 0.01).unwrap();
        let cond = Tensor::zeros((1, 80, 100), DType::F32, &device).unwrap();
        let seen = RefCell::new(Vec::new());
        let denoiser = |y: &Tensor, _c: &Tensor, _s: &Tensor| -> candle_core::Result<Tensor> {
            seen.borrow_mut().push(max_abs(y));
            y.zeros_like()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let audio = inference(&s, &denoiser, &cond, 256, &mut rng).unwrap();

        assert_eq!(audio.dims(), &[1, 1, 25600]);
        assert!(max_abs(&audio) <= 1.0);

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 50);
        // Every step after the first sees the clamped previous estimate.
        for (i, m) in seen.iter().enumerate().skip(1) {
            assert!(*m <= 1.0, "call {i} saw max |y| = {m}");
        }
    }

    #[test]
    fn output_length_for_various_frames() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(3, 1e-4, 0.05).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for &(b, frames, hop) in &[(1, 1, 300), (2, 7, 300), (3, 4, 1)] {
            let cond = Tensor::zeros((b, 80, frames), DType::F32, &device).unwrap();
            let audio = inference(&s, &zero_denoiser, &cond, hop, &mut rng).unwrap();
            assert_eq!(audio.dims(), &[b, 1, hop * frames]);
        }
    }

    #[test]
    fn noise_scale_queries_descend() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(8, 1e-4, 0.05).unwrap();
        let cond = Tensor::zeros((2, 4, 3), DType::F32, &device).unwrap();
        let scales = RefCell::new(Vec::new());
        let denoiser = |y: &Tensor, _c: &Tensor, ns: &Tensor| -> candle_core::Result<Tensor> {
            let values = ns.to_vec1::<f32>()?;
            assert_eq!(values.len(), 2);
            scales.borrow_mut().push(values[0]);
            y.zeros_like()
        };

        inference(&s, &denoiser, &cond, 10, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();

        let scales = scales.into_inner();
        let expected: Vec<f32> = (0..8)
            .rev()
            .map(|t| s.alpha_hat()[t].sqrt() as f32)
            .collect();
        assert_eq!(scales, expected);
    }

    #[test]
    fn final_step_adds_no_noise() {
        let device = Device::Cpu;
        // One step: y = clamp(c1[0] * y_init), no fresh noise.
        let s = NoiseSchedule::compute_noise_level(1, 1e-2, 0.5).unwrap();
        let cond = Tensor::zeros((2, 4, 5), DType::F32, &device).unwrap();
        let audio = inference(
            &s,
            &zero_denoiser,
            &cond,
            16,
            &mut ChaCha8Rng::seed_from_u64(9),
        )
        .unwrap();

        let init = randn(&mut ChaCha8Rng::seed_from_u64(9), (2, 1, 80), &device).unwrap();
        let expected = (init * s.c1()[0]).unwrap().clamp(-1f32, 1f32).unwrap();
        let diff = max_abs(&(audio - expected).unwrap());
        assert!(diff < 1e-6, "diff = {diff}");
    }

    #[test]
    fn oracle_denoiser_recovers_signal() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(6, 1e-2, 0.5).unwrap();
        let cond = Tensor::zeros((1, 4, 8), DType::F32, &device).unwrap();
        let target = 0.5;
        // Exact noise given the current estimate and a known clean signal.
        let oracle = |y: &Tensor, _c: &Tensor, ns: &Tensor| -> candle_core::Result<Tensor> {
            let l = ns.to_vec1::<f32>()?[0] as f64;
            y.affine(1.0, -l * target)? / (1.0 - l * l).sqrt()
        };

        let audio = inference(&s, &oracle, &cond, 32, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
        let err = max_abs(&audio.affine(1.0, -target).unwrap());
        assert!(err < 1e-3, "max error = {err}");
    }

    #[test]
    fn denoiser_error_propagates() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(10, 1e-6, 0.01).unwrap();
        let cond = Tensor::zeros((1, 4, 2), DType::F32, &device).unwrap();
        let calls = RefCell::new(0);
        let failing = |_y: &Tensor, _c: &Tensor, _s: &Tensor| -> candle_core::Result<Tensor> {
            *calls.borrow_mut() += 1;
            Err(candle_core::Error::Msg("denoiser failed".to_string()))
        };

        let result = inference(&s, &failing, &cond, 4, &mut ChaCha8Rng::seed_from_u64(0));
        assert!(matches!(result, Err(Error::Candle(_))));
        assert_eq!(calls.into_inner(), 1);
    }

    #[test]
    fn wrong_prediction_shape_rejected() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(4, 1e-6, 0.01).unwrap();
        let cond = Tensor::zeros((1, 4, 2), DType::F32, &device).unwrap();
        let squeezed = |y: &Tensor, _c: &Tensor, _s: &Tensor| -> candle_core::Result<Tensor> {
            y.squeeze(1)?.zeros_like()
        };

        let result = inference(&s, &squeezed, &cond, 4, &mut ChaCha8Rng::seed_from_u64(0));
        assert!(matches!(result, Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn overflowing_audio_length_rejected() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(2, 1e-6, 0.01).unwrap();
        let cond = Tensor::zeros((1, 4, 4), DType::F32, &device).unwrap();
        let result = inference(
            &s,
            &zero_denoiser,
            &cond,
            usize::MAX / 2,
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn bad_conditioning_rejected() {
        let device = Device::Cpu;
        let s = NoiseSchedule::compute_noise_level(4, 1e-6, 0.01).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for cond in [
            Tensor::zeros((4, 2), DType::F32, &device).unwrap(),
            Tensor::zeros((1, 4, 0), DType::F32, &device).unwrap(),
            Tensor::zeros((1, 1, 4, 2), DType::F32, &device).unwrap(),
        ] {
            assert!(matches!(
                inference(&s, &zero_denoiser, &cond, 4, &mut rng),
                Err(Error::ShapeMismatch(_))
            ));
        }

        let cond = Tensor::zeros((1, 4, 2), DType::F32, &device).unwrap();
        assert!(matches!(
            inference(&s, &zero_denoiser, &cond, 0, &mut rng),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
