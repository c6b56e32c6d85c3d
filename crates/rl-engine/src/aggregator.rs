//! Posterior aggregation: reduces the record log to per-variant totals.

use bandit_core::{TrialRecord, VariantId, VariantSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTotals {
    pub success: u64,
    pub failure: u64,
}

impl VariantTotals {
    pub fn traffic(&self) -> u64 {
        self.success + self.failure
    }

    /// Observed conversion rate; `None` while no traffic has been recorded.
    pub fn conversion_rate(&self) -> Option<f64> {
        match self.traffic() {
            0 => None,
            traffic => Some(self.success as f64 / traffic as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeTotals {
    entries: Vec<(VariantId, VariantTotals)>,
}

impl CumulativeTotals {
    pub fn get(&self, variant: &str) -> Option<VariantTotals> {
        self.entries
            .iter()
            .find(|(id, _)| id == variant)
            .map(|(_, totals)| *totals)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariantId, &VariantTotals)> {
        self.entries.iter().map(|(id, totals)| (id, totals))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sum success and failure counts per declared variant.
///
/// Every declared variant appears, with `(0, 0)` when it has no records.
/// Records for variants outside the set are ignored. Segments are summed together.
pub fn aggregate(records: &[TrialRecord], variants: &VariantSet) -> CumulativeTotals {
    let mut sums = vec![VariantTotals::default(); variants.len()];
    for record in records {
        if let Some(idx) = variants.position(record.variant.as_str()) {
            sums[idx].success += record.success;
            sums[idx].failure += record.failure;
        }
    }

    CumulativeTotals {
        entries: variants.iter().cloned().zip(sums).collect(),
    }
}
