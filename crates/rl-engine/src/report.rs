//! Read-side summaries for external rendering: posterior curves, traffic to
//! date and conversion rate to date per variant.

use crate::aggregator::{aggregate, VariantTotals};
use crate::posterior::{BetaPosterior, PosteriorParams};
use bandit_core::config::ReportConfig;
use bandit_core::{
    BanditError, BanditResult, RetentionWindow, TrialRecord, VariantId, VariantSet,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observed conversion rate, explicitly undefined while traffic is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionRate {
    Defined(f64),
    Undefined,
}

impl ConversionRate {
    pub fn from_totals(totals: &VariantTotals) -> Self {
        totals
            .conversion_rate()
            .map_or(Self::Undefined, Self::Defined)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(rate) => Some(*rate),
            Self::Undefined => None,
        }
    }

    /// The rate, or `UndefinedRate` naming the variant.
    pub fn require(&self, variant: &VariantId) -> BanditResult<f64> {
        self.value().ok_or_else(|| BanditError::UndefinedRate {
            variant: variant.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub day: u64,
    pub traffic_to_date: u64,
    pub conversion_rate_to_date: ConversionRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub x: f64,
    pub density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant: VariantId,
    pub totals: VariantTotals,
    pub posterior: PosteriorParams,
    pub posterior_mean: f64,
    pub credible_interval: (f64, f64),
    pub conversion_rate: ConversionRate,
    pub timeline: Vec<TimelinePoint>,
    pub density: Vec<DensityPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub day: u64,
    pub retention: RetentionWindow,
    pub records: Vec<TrialRecord>,
    pub variants: Vec<VariantReport>,
}

/// Cumulative traffic and conversion rate per recorded day for one variant.
pub fn timeline(records: &[TrialRecord], variant: &VariantId) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = Vec::new();
    let mut running = VariantTotals::default();

    for record in records.iter().filter(|r| &r.variant == variant) {
        running.success += record.success;
        running.failure += record.failure;
        let point = TimelinePoint {
            day: record.day,
            traffic_to_date: running.traffic(),
            conversion_rate_to_date: ConversionRate::from_totals(&running),
        };
        match points.last_mut() {
            Some(last) if last.day == record.day => *last = point,
            _ => points.push(point),
        }
    }

    points
}

pub fn variant_reports(
    records: &[TrialRecord],
    variants: &VariantSet,
    config: &ReportConfig,
) -> BanditResult<Vec<VariantReport>> {
    config.validate()?;
    let totals = aggregate(records, variants);

    totals
        .iter()
        .map(|(variant, totals)| {
            let posterior = BetaPosterior::from_totals(totals)?;
            Ok(VariantReport {
                variant: variant.clone(),
                totals: *totals,
                posterior: PosteriorParams::from(&posterior),
                posterior_mean: posterior.mean(),
                credible_interval: posterior.credible_interval(config.credible_level)?,
                conversion_rate: ConversionRate::from_totals(totals),
                timeline: timeline(records, variant),
                density: posterior
                    .density_curve(config.density_points)
                    .into_iter()
                    .map(|(x, density)| DensityPoint { x, density })
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u64, variant: &str, success: u64, failure: u64) -> TrialRecord {
        TrialRecord {
            day,
            segment: "segment1".to_string(),
            variant: VariantId::from(variant),
            success,
            failure,
        }
    }

    #[test]
    fn test_conversion_rate_undefined_is_explicit() {
        let rate = ConversionRate::from_totals(&VariantTotals::default());
        assert_eq!(rate, ConversionRate::Undefined);
        assert_eq!(rate.value(), None);

        let err = rate.require(&VariantId::from("Video")).unwrap_err();
        assert!(matches!(err, BanditError::UndefinedRate { ref variant } if variant == "Video"));

        let json = serde_json::to_string(&rate).unwrap();
        assert_eq!(json, "\"undefined\"");
    }

    #[test]
    fn test_timeline_accumulates_per_day() {
        let records = vec![
            record(0, "A", 10, 40),
            record(0, "B", 5, 5),
            record(1, "A", 0, 0),
            record(2, "A", 30, 20),
        ];
        let points = timeline(&records, &VariantId::from("A"));

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].traffic_to_date, 50);
        assert_eq!(points[0].conversion_rate_to_date, ConversionRate::Defined(0.2));
        assert_eq!(points[1].traffic_to_date, 50);
        assert_eq!(points[2].traffic_to_date, 100);
        assert_eq!(points[2].conversion_rate_to_date, ConversionRate::Defined(0.4));
    }

    #[test]
    fn test_timeline_zero_traffic_start_is_undefined() {
        let records = vec![record(0, "A", 0, 0), record(1, "A", 1, 1)];
        let points = timeline(&records, &VariantId::from("A"));
        assert_eq!(points[0].conversion_rate_to_date, ConversionRate::Undefined);
        assert_eq!(points[1].conversion_rate_to_date, ConversionRate::Defined(0.5));
    }

    #[test]
    fn test_timeline_merges_segments_on_same_day() {
        let mut second_segment = record(0, "A", 2, 2);
        second_segment.segment = "segment2".to_string();
        let records = vec![record(0, "A", 1, 1), second_segment];
        let points = timeline(&records, &VariantId::from("A"));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].traffic_to_date, 6);
    }

    #[test]
    fn test_variant_reports_cover_every_variant() {
        let variants = VariantSet::new(["A", "B"]).unwrap();
        let records = vec![record(0, "A", 40, 10)];
        let config = ReportConfig {
            density_points: 11,
            credible_level: 0.9,
        };
        let reports = variant_reports(&records, &variants, &config).unwrap();

        assert_eq!(reports.len(), 2);
        let a = &reports[0];
        assert_eq!(a.posterior, PosteriorParams { alpha: 41.0, beta: 11.0 });
        assert_eq!(a.density.len(), 11);
        assert!(a.credible_interval.0 < a.posterior_mean);

        let b = &reports[1];
        assert_eq!(b.totals, VariantTotals::default());
        assert_eq!(b.conversion_rate, ConversionRate::Undefined);
        assert!(b.timeline.is_empty());
        assert!((b.posterior_mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_variant_reports_reject_bad_config() {
        let variants = VariantSet::new(["A"]).unwrap();
        let config = ReportConfig {
            density_points: 0,
            credible_level: 0.95,
        };
        assert!(variant_reports(&[], &variants, &config).is_err());
    }
}
