//! Beta-Bernoulli posterior over a variant's conversion rate.
//!
//! Prior: Beta(1, 1), uniform.
//! Posterior: Beta(1 + successes, 1 + failures).
//!
//! Draws come from `rand_distr::Beta`, an exact rejection sampler, so sample
//! mean and variance match the posterior.

use crate::aggregator::{CumulativeTotals, VariantTotals};
use bandit_core::{BanditError, BanditResult, VariantId};
use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;

#[derive(Debug, Clone, Copy)]
pub struct BetaPosterior {
    alpha: f64,
    beta: f64,
    dist: rand_distr::Beta<f64>,
}

impl BetaPosterior {
    pub fn from_counts(success: u64, failure: u64) -> BanditResult<Self> {
        let alpha = success as f64 + 1.0;
        let beta = failure as f64 + 1.0;
        let dist = rand_distr::Beta::new(alpha, beta).map_err(|e| {
            BanditError::Internal(anyhow::anyhow!(
                "invalid posterior Beta({alpha}, {beta}): {e}"
            ))
        })?;
        Ok(Self { alpha, beta, dist })
    }

    pub fn from_totals(totals: &VariantTotals) -> BanditResult<Self> {
        Self::from_counts(totals.success, totals.failure)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let sum = self.alpha + self.beta;
        (self.alpha * self.beta) / (sum * sum * (sum + 1.0))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.dist.sample(rng)
    }

    /// Probability density at `x`, zero outside [0, 1].
    ///
    /// Evaluated in log space with `ln_1p` for the `1 - x` term, so large
    /// posteriors and points close to the boundaries neither overflow nor
    /// produce NaN.
    pub fn density(&self, x: f64) -> f64 {
        if !(0.0..=1.0).contains(&x) {
            return 0.0;
        }
        let ln_x_term = log_power_term(self.alpha - 1.0, x, x.ln());
        let ln_1mx_term = log_power_term(self.beta - 1.0, 1.0 - x, (-x).ln_1p());
        let ln_pdf = ln_x_term + ln_1mx_term - statrs::function::beta::ln_beta(self.alpha, self.beta);
        let pdf = ln_pdf.exp();
        if pdf.is_finite() {
            pdf
        } else {
            0.0
        }
    }

    pub fn density_curve(&self, points: usize) -> Vec<(f64, f64)> {
        match points {
            0 => Vec::new(),
            1 => vec![(0.5, self.density(0.5))],
            n => {
                let step = 1.0 / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        let x = if i == n - 1 { 1.0 } else { i as f64 * step };
                        (x, self.density(x))
                    })
                    .collect()
            }
        }
    }

    /// Equal-tailed credible interval holding `level` of the posterior mass.
    pub fn credible_interval(&self, level: f64) -> BanditResult<(f64, f64)> {
        if !(level > 0.0 && level < 1.0) {
            return Err(BanditError::InvalidConfiguration(format!(
                "credible level must lie in (0, 1), got {level}"
            )));
        }
        let dist = statrs::distribution::Beta::new(self.alpha, self.beta).map_err(|e| {
            BanditError::Internal(anyhow::anyhow!(
                "invalid posterior Beta({}, {}): {e}",
                self.alpha,
                self.beta
            ))
        })?;
        let tail = (1.0 - level) / 2.0;
        let low = dist.inverse_cdf(tail);
        let high = dist.inverse_cdf(1.0 - tail);
        Ok((low.clamp(0.0, 1.0), high.clamp(0.0, 1.0)))
    }
}

/// `exponent * ln(base)` with the `0 * ln(0)` case defined as zero.
fn log_power_term(exponent: f64, base: f64, ln_base: f64) -> f64 {
    if exponent == 0.0 {
        0.0
    } else if base <= 0.0 {
        f64::NEG_INFINITY
    } else {
        exponent * ln_base
    }
}

#[derive(Debug, Clone)]
pub struct VariantPosterior {
    pub variant: VariantId,
    pub posterior: BetaPosterior,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorParams {
    pub alpha: f64,
    pub beta: f64,
}

impl From<&BetaPosterior> for PosteriorParams {
    fn from(value: &BetaPosterior) -> Self {
        Self {
            alpha: value.alpha,
            beta: value.beta,
        }
    }
}

pub fn posteriors(totals: &CumulativeTotals) -> BanditResult<Vec<VariantPosterior>> {
    totals
        .iter()
        .map(|(variant, totals)| {
            Ok(VariantPosterior {
                variant: variant.clone(),
                posterior: BetaPosterior::from_totals(totals)?,
            })
        })
        .collect()
}
