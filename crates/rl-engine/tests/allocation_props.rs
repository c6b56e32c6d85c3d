//! Property tests for allocation, aggregation and posterior invariants.

use bandit_core::{AppConfig, TrialRecord, VariantId, VariantSet};
use bandit_rl_engine::posterior::posteriors;
use bandit_rl_engine::{aggregate, even_split, BetaPosterior, ExperimentSession, ThompsonAllocator};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn variant_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("variant{i}")).collect()
}

proptest! {
    /// Every unit of a round is allocated to exactly one variant.
    #[test]
    fn allocation_sums_to_round_size(
        counts in prop::collection::vec((0u64..500, 0u64..500), 1..6),
        round_size in 1usize..300,
        seed in any::<u64>(),
    ) {
        let names = variant_names(counts.len());
        let variants = VariantSet::new(&names).unwrap();
        let records: Vec<TrialRecord> = names
            .iter()
            .zip(&counts)
            .map(|(name, &(success, failure))| TrialRecord {
                day: 0,
                segment: "segment1".to_string(),
                variant: VariantId::from(name.as_str()),
                success,
                failure,
            })
            .collect();

        let ps = posteriors(&aggregate(&records, &variants)).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let split = ThompsonAllocator::new().allocate(&ps, round_size, &mut rng).unwrap();

        prop_assert_eq!(split.total(), round_size as u64);
        prop_assert_eq!(split.len(), variants.len());
    }

    /// Posterior parameters never drop below the uniform prior.
    #[test]
    fn posterior_parameters_at_least_one(success in 0u64..1_000_000, failure in 0u64..1_000_000) {
        let p = BetaPosterior::from_counts(success, failure).unwrap();
        prop_assert!(p.alpha() >= 1.0);
        prop_assert!(p.beta() >= 1.0);
        prop_assert!(p.mean() > 0.0 && p.mean() < 1.0);
    }

    /// Even splits sum to the round size and differ by at most one unit.
    #[test]
    fn even_split_is_balanced(n_variants in 1usize..8, round_size in 1usize..500) {
        let variants = VariantSet::new(variant_names(n_variants)).unwrap();
        let split = even_split(&variants, round_size).unwrap();
        let counts: Vec<u64> = split.iter().map(|(_, c)| c).collect();

        prop_assert_eq!(split.total(), round_size as u64);
        let max = counts.iter().max().copied().unwrap_or(0);
        let min = counts.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }

    /// Cumulative totals track exactly the traffic allocated across rounds.
    #[test]
    fn totals_conserve_allocated_traffic(
        n_variants in 1usize..5,
        sizes in prop::collection::vec(1usize..250, 1..12),
        seed in any::<u64>(),
    ) {
        let mut config = AppConfig::default();
        config.experiment.variants = variant_names(n_variants);
        let mut session = ExperimentSession::with_seed(&config, seed).unwrap();

        let mut allocated = vec![0u64; n_variants];
        for (round, &size) in sizes.iter().enumerate() {
            let summary = if round == 0 {
                session.initialize_with_round_size(size).unwrap()
            } else {
                session.simulate_with_round_size(size).unwrap()
            };
            for (idx, (_, count)) in summary.split.iter().enumerate() {
                allocated[idx] += count;
            }
            for record in &summary.records {
                prop_assert_eq!(Some(record.traffic()), summary.split.get(record.variant.as_str()));
            }
        }

        for (idx, (_, totals)) in session.totals().iter().enumerate() {
            prop_assert_eq!(totals.traffic(), allocated[idx]);
        }
        prop_assert_eq!(session.day(), sizes.len() as u64);
        prop_assert_eq!(session.log().len(), sizes.len() * n_variants);
    }

    /// Same seed and round sizes give the same allocations.
    #[test]
    fn seeded_runs_are_deterministic(
        sizes in prop::collection::vec(1usize..200, 1..6),
        seed in any::<u64>(),
    ) {
        let run = || {
            let mut config = AppConfig::default();
            config.experiment.variants = variant_names(3);
            let mut session = ExperimentSession::with_seed(&config, seed).unwrap();
            session.initialize_with_round_size(120).unwrap();
            sizes
                .iter()
                .map(|&size| session.simulate_with_round_size(size).unwrap().split)
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    }
}
