//! Leverage distribution sampling.
//!
//! Draws leverage values from a normal distribution chosen by risk profile,
//! clips them to the exchange bounds and weights each draw by its density so
//! common leverages carry more notional.

use liqmap_core::config::{LeverageConfig, NormalParams};
use liqmap_core::{Error, LeverageProfile, LeverageSample, Result};
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::{Continuous, Normal};
use tracing::debug;

/// Leverage model for a configured profile table.
pub struct LeverageModel {
    config: LeverageConfig,
}

impl LeverageModel {
    /// Create a new leverage model.
    pub fn new(config: LeverageConfig) -> Self {
        Self { config }
    }

    /// Mean and std for a profile.
    ///
    /// `Dynamic` moves with funding: aggressiveness = min(|funding| * scale, cap),
    /// the mean rises and the spread tightens linearly with it.
    pub fn distribution_params(&self, profile: LeverageProfile, funding_rate: f64) -> NormalParams {
        let c = &self.config;
        match profile {
            LeverageProfile::Conservative => c.conservative,
            LeverageProfile::Neutral => c.neutral,
            LeverageProfile::Aggressive => c.aggressive,
            LeverageProfile::Dynamic => {
                let aggressiveness = (funding_rate.abs() * c.funding_scale).min(c.max_aggressiveness);
                NormalParams {
                    mean: c.dynamic_base_mean + aggressiveness * c.dynamic_mean_slope,
                    std: c.dynamic_base_std - aggressiveness * c.dynamic_std_slope,
                }
            }
        }
    }

    /// Draw a weighted leverage set. Weights sum to 1.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        profile: LeverageProfile,
        funding_rate: f64,
        rng: &mut R,
    ) -> Result<Vec<LeverageSample>> {
        if !funding_rate.is_finite() {
            return Err(Error::data(format!("funding rate is not finite: {funding_rate}")));
        }

        let params = self.distribution_params(profile, funding_rate);
        let normal = Normal::new(params.mean, params.std)
            .map_err(|e| Error::leverage(format!("{profile} ({}, {}): {e}", params.mean, params.std)))?;

        let leverages: Vec<f64> = (0..self.config.num_samples)
            .map(|_| {
                normal
                    .sample(rng)
                    .clamp(self.config.min_leverage, self.config.max_leverage)
            })
            .collect();

        let densities: Vec<f64> = leverages.iter().map(|&l| normal.pdf(l)).collect();
        let total: f64 = densities.iter().sum();

        debug!(
            %profile,
            mean = params.mean,
            std = params.std,
            samples = leverages.len(),
            "sampled leverage distribution"
        );

        let samples = if total > 0.0 && total.is_finite() {
            leverages
                .into_iter()
                .zip(densities)
                .map(|(leverage, density)| LeverageSample {
                    leverage,
                    weight: density / total,
                })
                .collect()
        } else {
            let equal = 1.0 / leverages.len() as f64;
            leverages
                .into_iter()
                .map(|leverage| LeverageSample {
                    leverage,
                    weight: equal,
                })
                .collect()
        };

        Ok(samples)
    }
}
