//! Thompson sampling traffic allocation.
//!
//! Every unit of a round gets a fresh posterior draw per variant and goes to
//! the variant with the highest draw. Ties go to the variant declared first.

use crate::posterior::VariantPosterior;
use bandit_core::{BanditError, BanditResult, VariantId, VariantSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSplit {
    allocations: Vec<(VariantId, u64)>,
}

impl TrafficSplit {
    pub fn get(&self, variant: &str) -> Option<u64> {
        self.allocations
            .iter()
            .find(|(id, _)| id == variant)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariantId, u64)> {
        self.allocations.iter().map(|(id, count)| (id, *count))
    }

    pub fn total(&self) -> u64 {
        self.allocations.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

/// Stateless Thompson sampling allocator.
///
/// Posteriors are recomputed from the log by the caller each round, so the
/// allocator holds no learned state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThompsonAllocator;

impl ThompsonAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate `round_size` units across the given posteriors.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        posteriors: &[VariantPosterior],
        round_size: usize,
        rng: &mut R,
    ) -> BanditResult<TrafficSplit> {
        if round_size == 0 {
            return Err(BanditError::InvalidRoundSize(round_size));
        }
        if posteriors.is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "cannot allocate traffic without variants".to_string(),
            ));
        }

        let mut counts = vec![0u64; posteriors.len()];
        for _ in 0..round_size {
            let winner = Self::select_unit(posteriors, rng);
            counts[winner] += 1;
        }

        let split = TrafficSplit {
            allocations: posteriors
                .iter()
                .map(|p| p.variant.clone())
                .zip(counts)
                .collect(),
        };

        for (variant, count) in split.iter() {
            metrics::counter!("bandit.units_allocated", "variant" => variant.to_string())
                .increment(count);
        }
        tracing::debug!(round_size, allocations = ?split.allocations, "thompson allocation");

        Ok(split)
    }

    fn select_unit<R: Rng + ?Sized>(posteriors: &[VariantPosterior], rng: &mut R) -> usize {
        first_max_index(posteriors.iter().map(|p| p.posterior.sample(rng)))
    }
}

/// Position of the largest sample. Strict `>` keeps the earliest position
/// on an exact tie.
fn first_max_index(samples: impl IntoIterator<Item = f64>) -> usize {
    let mut best_sample = f64::NEG_INFINITY;
    let mut best_idx = 0;

    for (idx, sample) in samples.into_iter().enumerate() {
        if sample > best_sample {
            best_sample = sample;
            best_idx = idx;
        }
    }

    best_idx
}

/// Split `round_size` as evenly as possible. The remainder goes one unit each
/// to the earliest declared variants, so the split always sums to `round_size`.
pub fn even_split(variants: &VariantSet, round_size: usize) -> BanditResult<TrafficSplit> {
    if round_size == 0 {
        return Err(BanditError::InvalidRoundSize(round_size));
    }
    let n = variants.len();
    let base = (round_size / n) as u64;
    let remainder = round_size % n;

    Ok(TrafficSplit {
        allocations: variants
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), base + u64::from(idx < remainder)))
            .collect(),
    })
}
