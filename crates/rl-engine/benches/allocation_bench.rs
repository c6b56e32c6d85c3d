//! Benchmarks for Thompson sampling allocation.
//! Run with: cargo bench -p bandit-rl-engine

use bandit_core::{TrialRecord, VariantId, VariantSet};
use bandit_rl_engine::posterior::posteriors;
use bandit_rl_engine::{aggregate, ThompsonAllocator};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn create_history(variants: &VariantSet, days: u64) -> Vec<TrialRecord> {
    let mut records = Vec::new();
    for day in 0..days {
        for (idx, variant) in variants.iter().enumerate() {
            records.push(TrialRecord {
                day,
                segment: "segment1".to_string(),
                variant: VariantId::from(variant.as_str()),
                success: 20 + idx as u64,
                failure: 30,
            });
        }
    }
    records
}

fn main() {
    let variants = VariantSet::parse_list("Video, Text, Image, Banner, Carousel")
        .expect("valid variant list");
    let history = create_history(&variants, 90);
    let ps = posteriors(&aggregate(&history, &variants)).expect("valid posteriors");
    let allocator = ThompsonAllocator::new();
    let mut rng = StdRng::seed_from_u64(42);
    let round_size = 200;

    // Warmup
    for _ in 0..10 {
        allocator.allocate(&ps, round_size, &mut rng).unwrap();
    }

    // Benchmark
    let iterations = 10_000u32;
    let start = std::time::Instant::now();

    for _ in 0..iterations {
        let _ = allocator.allocate(&ps, round_size, &mut rng).unwrap();
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== Allocation Benchmark ===");
    println!("Iterations:  {}", iterations);
    println!("Total time:  {:?}", elapsed);
    println!("Per round:   {:?}", per_iter);
    println!(
        "Throughput:  {:.0} units/sec",
        (iterations as usize * round_size) as f64 / elapsed.as_secs_f64()
    );
    println!("Variants:    {}", variants.len());
}
