//! Linear beta noise schedule.
//!
//! ```text
//! β_t   = linspace(min_val, max_val, T)
//! α_t   = 1 - β_t
//! ᾱ_t   = α_0 · α_1 · … · α_t
//! l     = [1, sqrt(ᾱ_0), …, sqrt(ᾱ_{T-1})]          (T + 1 values)
//! c1_t  = 1 / sqrt(α_t)
//! c2_t  = (1 - α_t) / sqrt(1 - ᾱ_t)
//! σ_k   = sqrt((1 - ᾱ_k) / (1 - ᾱ_{k+1}) · β_{k+1})  (T - 1 values)
//! ```
//!
//! `σ_k` is the posterior standard deviation of step `k + 1`; read it through
//! [`NoiseSchedule::posterior_std`] rather than indexing by hand.

use serde::Serialize;

use crate::config::NoiseScheduleConfig;
use crate::{Error, Result};

/// Precomputed schedule for one `(num_steps, min_val, max_val)` triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseSchedule {
    config: NoiseScheduleConfig,
    beta: Vec<f64>,
    alpha: Vec<f64>,
    alpha_hat: Vec<f64>,
    noise_level: Vec<f64>,
    c1: Vec<f64>,
    c2: Vec<f64>,
    sigma: Vec<f64>,
}

/// Compact description of a schedule, for logs and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSummary {
    pub num_steps: usize,
    pub min_beta: f64,
    pub max_beta: f64,
    pub final_alpha_hat: f64,
    pub final_noise_level: f64,
}

impl NoiseSchedule {
    /// Build the schedule for `num_steps` linearly spaced betas in `[min_val, max_val]`.
    pub fn compute_noise_level(num_steps: usize, min_val: f64, max_val: f64) -> Result<Self> {
        Self::from_config(&NoiseScheduleConfig::new(num_steps, min_val, max_val))
    }

    pub fn from_config(config: &NoiseScheduleConfig) -> Result<Self> {
        config.verify()?;
        let n = config.num_steps;

        let beta = linspace(config.min_val, config.max_val, n);
        let alpha: Vec<f64> = beta.iter().map(|b| 1.0 - b).collect();
        let alpha_hat: Vec<f64> = alpha
            .iter()
            .scan(1.0, |acc, a| {
                *acc *= a;
                Some(*acc)
            })
            .collect();

        let mut noise_level = Vec::with_capacity(n + 1);
        noise_level.push(1.0);
        noise_level.extend(alpha_hat.iter().map(|a| a.sqrt()));

        let c1: Vec<f64> = alpha.iter().map(|a| 1.0 / a.sqrt()).collect();
        let c2: Vec<f64> = alpha
            .iter()
            .zip(&alpha_hat)
            .map(|(a, ah)| (1.0 - a) / (1.0 - ah).sqrt())
            .collect();
        let sigma: Vec<f64> = (0..n.saturating_sub(1))
            .map(|k| ((1.0 - alpha_hat[k]) / (1.0 - alpha_hat[k + 1]) * beta[k + 1]).sqrt())
            .collect();

        tracing::debug!(
            "noise schedule: {} steps, beta [{:e}, {:e}], final alpha_hat {:.6}",
            n,
            config.min_val,
            config.max_val,
            alpha_hat[n - 1]
        );

        Ok(Self {
            config: *config,
            beta,
            alpha,
            alpha_hat,
            noise_level,
            c1,
            c2,
            sigma,
        })
    }

    /// Parameters this schedule was built from.
    pub fn config(&self) -> &NoiseScheduleConfig {
        &self.config
    }

    /// Number of diffusion steps `T`.
    pub fn num_steps(&self) -> usize {
        self.config.num_steps
    }

    /// Per-step noise variances, `num_steps` values.
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// `1 - beta`.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Cumulative product of `alpha`.
    pub fn alpha_hat(&self) -> &[f64] {
        &self.alpha_hat
    }

    /// Noise levels, `num_steps + 1` values starting at exactly 1.0.
    pub fn noise_level(&self) -> &[f64] {
        &self.noise_level
    }

    /// Reverse-step scale `1 / sqrt(alpha)`.
    pub fn c1(&self) -> &[f64] {
        &self.c1
    }

    /// Reverse-step noise weight `(1 - alpha) / sqrt(1 - alpha_hat)`.
    pub fn c2(&self) -> &[f64] {
        &self.c2
    }

    /// Posterior standard deviations, `num_steps - 1` values.
    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    /// Standard deviation of the noise added after reverse step `t`.
    ///
    /// Defined for `1 <= t < num_steps`; step 0 adds no noise.
    pub fn posterior_std(&self, t: usize) -> Result<f64> {
        if t == 0 || t >= self.num_steps() {
            return Err(Error::InvalidConfiguration(format!(
                "posterior std requested for step {t}, valid steps are 1..{}",
                self.num_steps()
            )));
        }
        Ok(self.sigma[t - 1])
    }

    /// Reverse-process step indices, `num_steps - 1` down to 0.
    pub fn reverse_steps(&self) -> impl Iterator<Item = usize> {
        (0..self.num_steps()).rev()
    }

    /// Step count, beta range and final levels.
    pub fn summary(&self) -> ScheduleSummary {
        let last = self.num_steps() - 1;
        ScheduleSummary {
            num_steps: self.num_steps(),
            min_beta: self.beta[0],
            max_beta: self.beta[last],
            final_alpha_hat: self.alpha_hat[last],
            final_noise_level: self.noise_level[last + 1],
        }
    }
}

/// `n` evenly spaced values from `start` to `stop`, both inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    values[n - 1] = stop;
    values
}
