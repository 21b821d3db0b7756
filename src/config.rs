//! Configuration for the WaveGrad vocoder.
//!
//! Defaults follow the reference WaveGrad setup: five upsampling stages
//! with a total hop of 300 samples, a 1000-step training schedule and a
//! 50-step inference schedule, both with linear betas over `[1e-6, 0.01]`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Linear beta schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseScheduleConfig {
    /// Number of diffusion steps.
    pub num_steps: usize,
    /// First beta value.
    pub min_val: f64,
    /// Last beta value.
    pub max_val: f64,
}

impl NoiseScheduleConfig {
    pub fn new(num_steps: usize, min_val: f64, max_val: f64) -> Self {
        Self {
            num_steps,
            min_val,
            max_val,
        }
    }

    /// Check `num_steps >= 1` and `0 < min_val < max_val < 1`.
    pub fn verify(&self) -> Result<()> {
        if self.num_steps == 0 {
            return Err(Error::InvalidConfiguration(
                "num_steps must be at least 1".to_string(),
            ));
        }
        if !self.min_val.is_finite() || !self.max_val.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "beta range must be finite, got [{}, {}]",
                self.min_val, self.max_val
            )));
        }
        if !(0.0 < self.min_val && self.min_val < self.max_val && self.max_val < 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "expected 0 < min_val < max_val < 1, got min_val={} max_val={}",
                self.min_val, self.max_val
            )));
        }
        // Below f64 resolution near 1.0, alpha_hat[0] rounds to 1 and c2[0] is 0/0.
        if 1.0 - self.min_val == 1.0 {
            return Err(Error::InvalidConfiguration(format!(
                "min_val={:e} is too small to change 1 - beta in f64",
                self.min_val
            )));
        }
        Ok(())
    }
}

/// Top-level vocoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavegradConfig {
    /// Mel channels of the conditioning spectrogram.
    #[serde(default = "default_in_channels")]
    pub in_channels: usize,

    /// Upsampling factor of each UBlock; their product is the hop length.
    #[serde(default = "default_upsample_factors")]
    pub upsample_factors: Vec<usize>,

    /// Schedule used to build training pairs.
    #[serde(default = "default_train_noise_schedule")]
    pub train_noise_schedule: NoiseScheduleConfig,

    /// Schedule used for inference.
    #[serde(default = "default_test_noise_schedule")]
    pub test_noise_schedule: NoiseScheduleConfig,
}

impl Default for WavegradConfig {
    fn default() -> Self {
        Self {
            in_channels: default_in_channels(),
            upsample_factors: default_upsample_factors(),
            train_noise_schedule: default_train_noise_schedule(),
            test_noise_schedule: default_test_noise_schedule(),
        }
    }
}

impl WavegradConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.verify()?;
        Ok(config)
    }

    /// Audio samples produced per conditioning frame.
    ///
    /// Saturates at `usize::MAX`; [`verify`](Self::verify) rejects factors
    /// whose product overflows.
    pub fn hop_length(&self) -> usize {
        self.checked_hop_length().unwrap_or(usize::MAX)
    }

    /// Product of `upsample_factors`, or `None` on overflow.
    pub fn checked_hop_length(&self) -> Option<usize> {
        self.upsample_factors
            .iter()
            .try_fold(1usize, |acc, &f| acc.checked_mul(f))
    }

    pub fn verify(&self) -> Result<()> {
        if self.upsample_factors.is_empty() {
            return Err(Error::InvalidConfiguration(
                "upsample_factors must not be empty".to_string(),
            ));
        }
        if self.upsample_factors.contains(&0) {
            return Err(Error::InvalidConfiguration(format!(
                "upsample_factors must be positive, got {:?}",
                self.upsample_factors
            )));
        }
        if self.checked_hop_length().is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "upsample_factors {:?} overflow the hop length",
                self.upsample_factors
            )));
        }
        self.train_noise_schedule.verify()?;
        self.test_noise_schedule.verify()?;
        Ok(())
    }
}

fn default_in_channels() -> usize {
    80
}

fn default_upsample_factors() -> Vec<usize> {
    vec![5, 5, 3, 2, 2]
}

fn default_train_noise_schedule() -> NoiseScheduleConfig {
    NoiseScheduleConfig::new(1000, 1e-6, 0.01)
}

fn default_test_noise_schedule() -> NoiseScheduleConfig {
    NoiseScheduleConfig::new(50, 1e-6, 0.01)
}
