use crate::error::{BanditError, BanditResult};
use crate::types::{RetentionWindow, VariantSet};
use serde::{Deserialize, Serialize};

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `BANDIT_OPTIMISER__`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_variants")]
    pub variants: Vec<String>,
    #[serde(default = "default_segment")]
    pub segment: String,
    #[serde(default)]
    pub retention: RetentionWindow,
    #[serde(default = "default_round_size_min")]
    pub round_size_min: usize,
    #[serde(default = "default_round_size_max")]
    pub round_size_max: usize,
    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Generative model of the simulated latent conversion rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_latent_mean")]
    pub latent_mean: f64,
    #[serde(default = "default_latent_sd")]
    pub latent_sd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_density_points")]
    pub density_points: usize,
    #[serde(default = "default_credible_level")]
    pub credible_level: f64,
}

// Default functions
fn default_variants() -> Vec<String> {
    vec!["Video".to_string(), "Text".to_string(), "Image".to_string()]
}
fn default_segment() -> String {
    "segment1".to_string()
}
fn default_round_size_min() -> usize {
    100
}
fn default_round_size_max() -> usize {
    200
}
fn default_latent_mean() -> f64 {
    0.4
}
fn default_latent_sd() -> f64 {
    0.05
}
fn default_density_points() -> usize {
    1000
}
fn default_credible_level() -> f64 {
    0.95
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            variants: default_variants(),
            segment: default_segment(),
            retention: RetentionWindow::default(),
            round_size_min: default_round_size_min(),
            round_size_max: default_round_size_max(),
            seed: None,
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            latent_mean: default_latent_mean(),
            latent_sd: default_latent_sd(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            density_points: default_density_points(),
            credible_level: default_credible_level(),
        }
    }
}

impl ExperimentConfig {
    /// Validated variant set in declaration order.
    pub fn variant_set(&self) -> BanditResult<VariantSet> {
        VariantSet::new(&self.variants)
    }

    pub fn validate(&self) -> BanditResult<()> {
        self.variant_set()?;
        if self.segment.trim().is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "segment must not be empty".to_string(),
            ));
        }
        if self.round_size_min == 0 {
            return Err(BanditError::InvalidConfiguration(
                "round_size_min must be greater than zero".to_string(),
            ));
        }
        if self.round_size_min > self.round_size_max {
            return Err(BanditError::InvalidConfiguration(format!(
                "round_size_min ({}) exceeds round_size_max ({})",
                self.round_size_min, self.round_size_max
            )));
        }
        Ok(())
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> BanditResult<()> {
        if !(0.0..=1.0).contains(&self.latent_mean) {
            return Err(BanditError::InvalidConfiguration(format!(
                "latent_mean must lie in [0, 1], got {}",
                self.latent_mean
            )));
        }
        if !self.latent_sd.is_finite() || self.latent_sd < 0.0 {
            return Err(BanditError::InvalidConfiguration(format!(
                "latent_sd must be finite and non-negative, got {}",
                self.latent_sd
            )));
        }
        Ok(())
    }
}

impl ReportConfig {
    pub fn validate(&self) -> BanditResult<()> {
        if self.density_points < 2 {
            return Err(BanditError::InvalidConfiguration(
                "density_points must be at least 2".to_string(),
            ));
        }
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(BanditError::InvalidConfiguration(format!(
                "credible_level must lie in (0, 1), got {}",
                self.credible_level
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment variables.
    ///
    /// Variables override file values, e.g.
    /// `BANDIT_OPTIMISER__EXPERIMENT__VARIANTS=Video,Text,Image`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("BANDIT_OPTIMISER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("experiment.variants"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject settings that would make a round impossible to run.
    pub fn validate(&self) -> BanditResult<()> {
        self.experiment.validate()?;
        self.environment.validate()?;
        self.report.validate()?;
        tracing::debug!(
            variants = self.experiment.variants.len(),
            retention = %self.experiment.retention,
            "configuration validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_settings() {
        let config = AppConfig::default();
        assert_eq!(config.experiment.variants, vec!["Video", "Text", "Image"]);
        assert_eq!(config.experiment.segment, "segment1");
        assert_eq!(config.experiment.retention, RetentionWindow::None);
        assert_eq!(config.experiment.round_size_min, 100);
        assert_eq!(config.experiment.round_size_max, 200);
        assert!((config.environment.latent_mean - 0.4).abs() < f64::EPSILON);
        assert!((config.environment.latent_sd - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.report.density_points, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"experiment": {"variants": ["A", "B"], "retention": "trailing_30_days"}}"#,
        )
        .unwrap();
        assert_eq!(config.experiment.variants, vec!["A", "B"]);
        assert_eq!(config.experiment.retention, RetentionWindow::Trailing30Days);
        assert_eq!(config.experiment.round_size_max, 200);
        assert_eq!(config.report.density_points, 1000);
    }

    #[test]
    fn test_load_fails_on_missing_named_file() {
        assert!(AppConfig::load(Some("/nonexistent/bandit-optimiser.toml")).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_variants() {
        let mut config = AppConfig::default();
        config.experiment.variants = vec![];
        assert!(matches!(
            config.validate(),
            Err(BanditError::InvalidConfiguration(_))
        ));

        config.experiment.variants = vec!["A".to_string(), "A".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_round_sizes() {
        let mut config = AppConfig::default();
        config.experiment.round_size_min = 0;
        assert!(config.validate().is_err());

        config.experiment.round_size_min = 300;
        config.experiment.round_size_max = 200;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds round_size_max"));
    }

    #[test]
    fn test_validate_rejects_bad_environment_and_report() {
        let mut config = AppConfig::default();
        config.environment.latent_sd = -0.1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.environment.latent_mean = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.report.density_points = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.report.credible_level = 1.0;
        assert!(config.validate().is_err());
    }
}
