//! WaveGrad vocoder front end.
//!
//! Owns the vocoder config, the active noise schedule and the random state
//! used for noise draws. The neural denoiser is supplied per call through
//! [`Denoiser`], so the same instance can drive training-pair generation and
//! inference for any network.

use candle_core::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{NoiseScheduleConfig, WavegradConfig};
use crate::scheduler::{self, Denoiser, NoiseSchedule, TrainingPair};
use crate::{Error, Result};

/// WaveGrad model state: config, cached schedule and RNG.
///
/// Not `Clone`: a copy would share the RNG state and repeat its noise.
#[derive(Debug)]
pub struct Wavegrad {
    config: WavegradConfig,
    schedule: NoiseSchedule,
    rng: ChaCha8Rng,
}

impl Wavegrad {
    /// Build from `config`, starting with its inference schedule.
    ///
    /// `seed = None` seeds the RNG from OS entropy.
    pub fn new(config: WavegradConfig, seed: Option<u64>) -> Result<Self> {
        config.verify()?;
        let schedule = NoiseSchedule::from_config(&config.test_noise_schedule)?;
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        tracing::debug!(
            "WaveGrad: hop_length={}, schedule={:?}",
            config.hop_length(),
            schedule.summary()
        );
        Ok(Self {
            config,
            schedule,
            rng,
        })
    }

    /// Vocoder configuration.
    pub fn config(&self) -> &WavegradConfig {
        &self.config
    }

    /// Audio samples per conditioning frame.
    pub fn hop_length(&self) -> usize {
        self.config.hop_length()
    }

    /// Active noise schedule.
    pub fn schedule(&self) -> &NoiseSchedule {
        &self.schedule
    }

    /// Switch to a new linear schedule. Rebuilds only if the parameters changed.
    pub fn compute_noise_level(
        &mut self,
        num_steps: usize,
        min_val: f64,
        max_val: f64,
    ) -> Result<&NoiseSchedule> {
        self.set_noise_schedule(&NoiseScheduleConfig::new(num_steps, min_val, max_val))
    }

    /// Switch to the schedule described by `config`, if different.
    pub fn set_noise_schedule(&mut self, config: &NoiseScheduleConfig) -> Result<&NoiseSchedule> {
        if self.schedule.config() != config {
            self.schedule = NoiseSchedule::from_config(config)?;
            tracing::info!("noise schedule updated: {:?}", self.schedule.summary());
        }
        Ok(&self.schedule)
    }

    /// Switch to the configured training schedule.
    pub fn use_train_schedule(&mut self) -> Result<&NoiseSchedule> {
        let config = self.config.train_noise_schedule;
        self.set_noise_schedule(&config)
    }

    /// Switch to the configured inference schedule.
    pub fn use_test_schedule(&mut self) -> Result<&NoiseSchedule> {
        let config = self.config.test_noise_schedule;
        self.set_noise_schedule(&config)
    }

    /// Build a training pair from clean audio `[B, 1, T]` or `[B, T]`.
    pub fn compute_y_n(&mut self, y0: &Tensor) -> Result<TrainingPair> {
        scheduler::compute_y_n(&self.schedule, y0, &mut self.rng)
    }

    /// Sample audio `[B, 1, hop_length × T_cond]` from mel conditioning `[B, in_channels, T_cond]`.
    pub fn inference<D: Denoiser + ?Sized>(
        &mut self,
        denoiser: &D,
        conditioning: &Tensor,
    ) -> Result<Tensor> {
        if let &[_, channels, _] = conditioning.dims()
            && channels != self.config.in_channels
        {
            return Err(Error::ShapeMismatch(format!(
                "conditioning has {channels} channels, expected {}",
                self.config.in_channels
            )));
        }
        let hop_length = self.hop_length();
        scheduler::inference(
            &self.schedule,
            denoiser,
            conditioning,
            hop_length,
            &mut self.rng,
        )
    }
}
