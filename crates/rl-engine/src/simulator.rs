//! Simulated ground truth the allocator is trying to learn.
//!
//! Each round draws a fresh latent conversion rate per variant from a clipped
//! Normal and realizes the allocated traffic into success/failure counts.
//! Rates are not carried between rounds, so the target drifts round to round.

use crate::allocator::TrafficSplit;
use bandit_core::config::EnvironmentConfig;
use bandit_core::{BanditError, BanditResult, TrialRecord};
use rand::Rng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, Copy)]
pub struct LatentEnvironment {
    rate: Normal<f64>,
}

impl LatentEnvironment {
    pub fn new(mean: f64, sd: f64) -> BanditResult<Self> {
        let rate = Normal::new(mean, sd).map_err(|e| {
            BanditError::InvalidConfiguration(format!(
                "latent rate model Normal({mean}, {sd}) is invalid: {e}"
            ))
        })?;
        Ok(Self { rate })
    }

    pub fn from_config(config: &EnvironmentConfig) -> BanditResult<Self> {
        config.validate()?;
        Self::new(config.latent_mean, config.latent_sd)
    }

    pub fn draw_rate<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.rate.sample(rng).clamp(0.0, 1.0)
    }

    /// Realize `traffic` units at conversion probability `rate`.
    ///
    /// Returns `(success, failure)` with `success = round(traffic * rate)`
    /// capped at `traffic`, so the pair always sums to `traffic`.
    pub fn realize(traffic: u64, rate: f64) -> (u64, u64) {
        let expected = (traffic as f64 * rate.clamp(0.0, 1.0)).round();
        let success = (expected as u64).min(traffic);
        (success, traffic - success)
    }

    pub fn run_round<R: Rng + ?Sized>(
        &self,
        day: u64,
        segment: &str,
        split: &TrafficSplit,
        rng: &mut R,
    ) -> Vec<TrialRecord> {
        split
            .iter()
            .map(|(variant, traffic)| {
                let rate = self.draw_rate(rng);
                let (success, failure) = Self::realize(traffic, rate);
                tracing::trace!(%variant, day, traffic, rate, success, "latent outcome");
                TrialRecord {
                    day,
                    segment: segment.to_string(),
                    variant: variant.clone(),
                    success,
                    failure,
                }
            })
            .collect()
    }
}
